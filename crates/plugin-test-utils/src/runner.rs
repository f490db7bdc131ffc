//! [`FakeRunner`]: an in-process package manager with scripted failures.
//!
//! Installed plugins are written to a real plugins directory so the on-disk
//! scan, schema loading, and drift detection all run against files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use plugin_meta::policy::is_newer;
use plugin_meta::{PluginSource, VersionConstraint};
use plugin_runner::{Error, InstallInfo, InstallResult, PackageRunner, Result, manifest, scan};

use crate::package::PluginPackage;

/// One recorded runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Inspect(String),
    Install(String),
    Update(String),
    Uninstall(String),
    QueryInfos,
}

#[derive(Default)]
struct State {
    registry: BTreeMap<String, Vec<PluginPackage>>,
    install_failures: BTreeMap<String, String>,
    uninstall_failures: BTreeMap<String, String>,
    /// Install or update to this version instead of the one resolved at
    /// inspect time.
    install_overrides: BTreeMap<String, String>,
    calls: Vec<Call>,
}

pub struct FakeRunner {
    plugins_dir: PathBuf,
    framework_version: String,
    state: Mutex<State>,
}

impl FakeRunner {
    pub fn new(plugins_dir: impl Into<PathBuf>, framework_version: &str) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            framework_version: framework_version.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Make `package` available from the registry.
    pub fn publish(&self, package: PluginPackage) {
        let mut state = self.state.lock().unwrap();
        state
            .registry
            .entry(package.name.clone())
            .or_default()
            .push(package);
    }

    /// Every install of `name` fails with `message` on stderr.
    pub fn fail_install(&self, name: &str, message: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .install_failures
            .insert(name.to_string(), message.to_string());
    }

    pub fn fail_uninstall(&self, name: &str, message: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .uninstall_failures
            .insert(name.to_string(), message.to_string());
    }

    /// Installs and updates of `name` land on `version` regardless of what
    /// was requested.
    pub fn override_install(&self, name: &str, version: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .install_overrides
            .insert(name.to_string(), version.to_string());
    }

    /// Place a plugin in the plugins directory without recording a call.
    pub fn preinstall(&self, package: &PluginPackage) -> PathBuf {
        package.write_to(&self.plugins_dir.join(&package.name))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn install_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Install(_)))
    }

    pub fn uninstall_calls(&self, name: &str) -> usize {
        self.count(|c| matches!(c, Call::Uninstall(n) if n == name))
    }

    pub fn update_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Update(_)))
    }

    /// Calls that change the plugins directory.
    pub fn mutating_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Install(_) | Call::Update(_) | Call::Uninstall(_)))
    }

    pub fn is_installed(&self, name: &str) -> bool {
        manifest::manifest_path(&self.plugins_dir.join(name)).is_some()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    /// Newest published version of `name` satisfying `range`.
    fn resolve(&self, name: &str, range: Option<&str>) -> Result<PluginPackage> {
        let state = self.state.lock().unwrap();
        let constraint = range
            .map(VersionConstraint::parse)
            .transpose()
            .map_err(|e| Error::invalid_source(name, e.to_string()))?;

        state
            .registry
            .get(name)
            .into_iter()
            .flatten()
            .filter(|p| constraint.as_ref().is_none_or(|c| c.satisfies(&p.version)))
            .fold(None::<&PluginPackage>, |best, p| match best {
                Some(b) if !is_newer(&p.version, &b.version) => Some(b),
                _ => Some(p),
            })
            .cloned()
            .ok_or_else(|| not_found("view", name))
    }

    fn scripted_failure(&self, failures: impl Fn(&State) -> Option<String>, command: String) -> Result<()> {
        let state = self.state.lock().unwrap();
        match failures(&*state) {
            Some(stderr) => Err(Error::CommandFailed {
                command,
                code: Some(1),
                stderr,
            }),
            None => Ok(()),
        }
    }

    fn write_installed(&self, package: &PluginPackage) -> Result<InstallResult> {
        let dir = package.write_to(&self.plugins_dir.join(&package.name));
        manifest::read_plugin_dir(&dir, false)
    }
}

fn not_found(command: &str, name: &str) -> Error {
    Error::CommandFailed {
        command: format!("fake {command} {name}"),
        code: Some(1),
        stderr: format!("E404 {name} is not in the registry"),
    }
}

#[async_trait]
impl PackageRunner for FakeRunner {
    fn id(&self) -> &str {
        "fake"
    }

    async fn inspect(&self, source: &PluginSource) -> Result<InstallResult> {
        self.record(Call::Inspect(source.to_spec()));
        match source {
            PluginSource::Registry { name, version } => {
                let package = self.resolve(name, version.as_deref())?;
                let parsed = manifest::PluginManifest::from_json(&package.manifest().to_string(), name)?;
                parsed.into_result(false, Vec::new())
            }
            PluginSource::Local { path } => manifest::read_plugin_dir(path, true),
        }
    }

    async fn install(&self, source: &PluginSource) -> Result<InstallResult> {
        self.record(Call::Install(source.to_spec()));
        match source {
            PluginSource::Registry { name, version } => {
                self.scripted_failure(
                    |s| s.install_failures.get(name).cloned(),
                    format!("fake install {source}"),
                )?;
                let overridden = self.state.lock().unwrap().install_overrides.get(name).cloned();
                let package = self.resolve(name, overridden.as_deref().or(version.as_deref()))?;
                self.write_installed(&package)
            }
            PluginSource::Local { path } => {
                let name = manifest::PluginManifest::load_dir(path)?.name;
                self.scripted_failure(
                    |s| s.install_failures.get(&name).cloned(),
                    format!("fake install {source}"),
                )?;
                let dest = self.plugins_dir.join(&name);
                plugin_fs::copy_dir(path, &dest)?;
                manifest::read_plugin_dir(&dest, true)
            }
        }
    }

    async fn update(&self, name: &str) -> Result<InstallResult> {
        self.record(Call::Update(name.to_string()));
        if !self.is_installed(name) {
            return Err(Error::NotInstalled {
                name: name.to_string(),
            });
        }
        let overridden = self.state.lock().unwrap().install_overrides.get(name).cloned();
        let package = self.resolve(name, overridden.as_deref())?;
        self.write_installed(&package)
    }

    async fn uninstall(&self, name: &str) -> Result<()> {
        self.record(Call::Uninstall(name.to_string()));
        self.scripted_failure(
            |s| s.uninstall_failures.get(name).cloned(),
            format!("fake uninstall {name}"),
        )?;
        plugin_fs::remove_dir(&self.plugins_dir.join(name))?;
        Ok(())
    }

    async fn query_infos(&self, names: Option<&[String]>) -> Result<Vec<InstallInfo>> {
        self.record(Call::QueryInfos);
        scan::scan_plugins(&self.plugins_dir)
            .into_iter()
            .filter(|p| names.is_none_or(|names| names.contains(&p.manifest.name)))
            .map(|plugin| {
                let latest = self.resolve(&plugin.manifest.name, None).ok();
                let can_be_updated = latest.as_ref().is_some_and(|l| {
                    is_newer(&l.version, &plugin.manifest.version)
                        && VersionConstraint::parse(&l.framework)
                            .is_ok_and(|c| c.satisfies(&self.framework_version))
                });
                Ok(InstallInfo {
                    plugin_type: plugin.manifest.plugin_type()?,
                    schema_paths: scan::schema_paths(&plugin.dir),
                    name: plugin.manifest.name,
                    version: plugin.manifest.version,
                    path: plugin.dir,
                    latest_version: latest.map(|l| l.version),
                    can_be_updated,
                })
            })
            .collect()
    }
}
