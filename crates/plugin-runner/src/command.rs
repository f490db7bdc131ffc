//! PackageRunner backed by an npm-compatible command-line package manager

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use futures::future::join_all;
use plugin_meta::policy::is_newer;
use plugin_meta::{ManagerConfig, PluginSource, RunnerSettings, VersionConstraint};
use serde_json::Value;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::manifest::{self, PluginManifest};
use crate::runner::{InstallInfo, InstallResult, PackageRunner};
use crate::scan;

/// Drives the package-manager executable inside the framework root.
///
/// Every invocation is bounded by [`RunnerSettings::timeout`]; an expired
/// process is killed and reported as [`Error::Timeout`].
#[derive(Debug, Clone)]
pub struct CommandRunner {
    settings: RunnerSettings,
    working_dir: PathBuf,
    plugins_dir: PathBuf,
    framework_version: String,
}

impl CommandRunner {
    pub fn new(
        settings: RunnerSettings,
        working_dir: impl Into<PathBuf>,
        plugins_dir: impl Into<PathBuf>,
        framework_version: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            working_dir: working_dir.into(),
            plugins_dir: plugins_dir.into(),
            framework_version: framework_version.into(),
        }
    }

    pub fn from_config(config: &ManagerConfig, framework_version: impl Into<String>) -> Self {
        Self::new(
            config.runner.clone(),
            &config.framework_root,
            config.plugins_path(),
            framework_version,
        )
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Run the package manager and return its stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let command = format!("{} {}", self.settings.program, args.join(" "));
        tracing::debug!(command = %command, cwd = %self.working_dir.display(), "Running package manager");

        let mut cmd = Command::new(&self.settings.program);
        cmd.args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.settings.timeout(), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CommandNotFound {
                    command: self.settings.program.clone(),
                });
            }
            Ok(Err(e)) => return Err(Error::Spawn { command, source: e }),
            Err(_) => {
                tracing::warn!(command = %command, seconds = self.settings.timeout_secs, "Package manager timed out");
                return Err(Error::Timeout {
                    command,
                    seconds: self.settings.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `view <spec> --json`, reduced to a single package document.
    async fn view(&self, spec: &str, fields: &[&str]) -> Result<Value> {
        let mut args = vec!["view", spec];
        args.extend_from_slice(fields);
        args.push("--json");
        let stdout = self.run(&args).await?;

        let value: Value = serde_json::from_str(stdout.trim())
            .map_err(|e| Error::invalid_source(spec, format!("unreadable registry response: {e}")))?;
        // A range matching several versions yields one document per version,
        // oldest first.
        match value {
            Value::Array(mut docs) => docs
                .pop()
                .ok_or_else(|| Error::invalid_source(spec, "no version matches")),
            other => Ok(other),
        }
    }

    fn installed_dir(&self, name: &str) -> PathBuf {
        self.plugins_dir.join(name)
    }

    fn read_installed(&self, name: &str, is_local: bool) -> Result<InstallResult> {
        let dir = self.installed_dir(name);
        if manifest::manifest_path(&dir).is_none() {
            return Err(Error::NotInstalled {
                name: name.to_string(),
            });
        }
        manifest::read_plugin_dir(&dir, is_local)
    }

    /// Latest registry version and whether it is an applicable update.
    async fn update_status(&self, name: &str, installed: &str) -> (Option<String>, bool) {
        let doc = match self.view(name, &["version", "framework"]).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!(plugin = %name, error = %e, "Could not query latest version");
                return (None, false);
            }
        };

        let Some(latest) = doc.get("version").and_then(Value::as_str) else {
            return (None, false);
        };
        let framework = doc.get("framework").and_then(Value::as_str).unwrap_or("*");
        let compatible = VersionConstraint::parse(framework)
            .map(|c| c.satisfies(&self.framework_version))
            .unwrap_or(false);

        (Some(latest.to_string()), compatible && is_newer(latest, installed))
    }
}

#[async_trait]
impl PackageRunner for CommandRunner {
    fn id(&self) -> &str {
        &self.settings.program
    }

    async fn inspect(&self, source: &PluginSource) -> Result<InstallResult> {
        match source {
            PluginSource::Local { path } => {
                if !path.is_dir() {
                    return Err(Error::invalid_source(
                        path.display().to_string(),
                        "not a directory",
                    ));
                }
                manifest::read_plugin_dir(path, true)
            }
            PluginSource::Registry { .. } => {
                let spec = source.to_spec();
                let doc = self.view(&spec, &[]).await?;
                let manifest = PluginManifest::from_json(&doc.to_string(), &spec)?;
                manifest.into_result(false, Vec::new())
            }
        }
    }

    async fn install(&self, source: &PluginSource) -> Result<InstallResult> {
        let name = match source {
            PluginSource::Registry { name, .. } => name.clone(),
            PluginSource::Local { path } => PluginManifest::load_dir(path)?.name,
        };

        self.run(&["install", &source.to_spec()]).await?;
        let result = self.read_installed(&name, source.is_local())?;
        tracing::info!(plugin = %result.name, version = %result.version, "Installed");
        Ok(result)
    }

    async fn update(&self, name: &str) -> Result<InstallResult> {
        // Fails fast for plugins that were never installed
        self.read_installed(name, false)?;

        self.run(&["update", name]).await?;
        let result = self.read_installed(name, false)?;
        tracing::info!(plugin = %name, version = %result.version, "Updated");
        Ok(result)
    }

    async fn uninstall(&self, name: &str) -> Result<()> {
        self.run(&["uninstall", name]).await?;
        tracing::info!(plugin = %name, "Uninstalled");
        Ok(())
    }

    async fn query_infos(&self, names: Option<&[String]>) -> Result<Vec<InstallInfo>> {
        let scanned: Vec<_> = scan::scan_plugins(&self.plugins_dir)
            .into_iter()
            .filter(|p| names.is_none_or(|names| names.contains(&p.manifest.name)))
            .collect();

        let statuses = join_all(
            scanned
                .iter()
                .map(|p| self.update_status(&p.manifest.name, &p.manifest.version)),
        )
        .await;

        scanned
            .into_iter()
            .zip(statuses)
            .map(|(plugin, (latest_version, can_be_updated))| {
                Ok(InstallInfo {
                    plugin_type: plugin.manifest.plugin_type()?,
                    schema_paths: scan::schema_paths(&plugin.dir),
                    name: plugin.manifest.name,
                    version: plugin.manifest.version,
                    path: plugin.dir,
                    latest_version,
                    can_be_updated,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_resolves_plugins_dir() {
        let config = ManagerConfig::new("/srv/framework");
        let runner = CommandRunner::from_config(&config, "5.0.0");
        assert_eq!(runner.plugins_dir(), Path::new("/srv/framework/node_modules"));
        assert_eq!(runner.id(), "npm");
    }

    #[tokio::test]
    async fn test_missing_program_is_command_not_found() {
        let settings = RunnerSettings {
            program: "definitely-not-a-package-manager-xyz".to_string(),
            timeout_secs: 5,
        };
        let temp = tempfile::TempDir::new().unwrap();
        let runner = CommandRunner::new(settings, temp.path(), temp.path().join("node_modules"), "5.0.0");

        let err = runner.uninstall("adapt-contrib-text").await.unwrap_err();
        assert!(matches!(err, Error::CommandNotFound { .. }));
    }

    #[tokio::test]
    async fn test_inspect_local_missing_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = CommandRunner::new(
            RunnerSettings::default(),
            temp.path(),
            temp.path().join("node_modules"),
            "5.0.0",
        );
        let err = runner
            .inspect(&PluginSource::local(temp.path().join("missing")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSource { .. }));
    }
}
