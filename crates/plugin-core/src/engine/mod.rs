//! ReconciliationEngine implementation
//!
//! The engine is the only writer of the plugin catalog and the only caller of
//! the [`PackageRunner`]. Every mutating operation follows the same shape:
//!
//! 1. resolve the candidate and run the install policy (no mutation yet)
//! 2. drive the package manager
//! 3. update schema contributions for that plugin only
//! 4. write the catalog
//!
//! A failure after step 2 is reported, never rolled back on disk; the next
//! [`reconcile`](ReconciliationEngine::reconcile) pass repairs the drift.

mod bulk;
mod reconcile;
mod report;

pub use bulk::InstallOptions;
pub use report::{PluginOutcome, PluginState, PluginStatus, ReconcileReport};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use plugin_meta::policy::check_install;
use plugin_meta::{DesiredDependency, ManagerConfig, PluginRecord, PluginSource};
use plugin_runner::{InstallResult, PackageRunner};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::schema::{SchemaContributions, SchemaRegistry, SchemaTracker};
use crate::store::PluginStore;
use crate::usage::{UsageEntry, UsageIndex};

/// Inputs read once when the engine is built.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Running framework version every compatibility check is made against.
    pub framework_version: String,
    /// Durable copies of locally-installed plugins live in `<cache_dir>/<name>`.
    pub cache_dir: PathBuf,
    pub desired: Vec<DesiredDependency>,
}

impl EngineSettings {
    pub fn from_config(config: &ManagerConfig) -> Result<Self> {
        Ok(Self {
            framework_version: config.framework_version()?,
            cache_dir: config.cache_path()?,
            desired: config.desired_dependencies(),
        })
    }
}

pub struct ReconciliationEngine {
    settings: EngineSettings,
    runner: Arc<dyn PackageRunner>,
    plugins: PluginStore,
    schemas: SchemaTracker,
    usage: Arc<dyn UsageIndex>,
    /// Serializes the final policy check with the catalog write.
    catalog_write: Mutex<()>,
}

impl ReconciliationEngine {
    pub fn new(
        settings: EngineSettings,
        runner: Arc<dyn PackageRunner>,
        plugins: PluginStore,
        registry: Arc<dyn SchemaRegistry>,
        usage: Arc<dyn UsageIndex>,
    ) -> Self {
        Self {
            settings,
            runner,
            plugins,
            schemas: SchemaTracker::new(registry),
            usage,
            catalog_write: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn plugins(&self) -> &PluginStore {
        &self.plugins
    }

    /// Current schema contribution table.
    pub async fn contributions(&self) -> SchemaContributions {
        self.schemas.snapshot().await
    }

    /// Rebuild the schema contribution table from the plugins on disk.
    ///
    /// Returns the number of registered fragments and the per-plugin
    /// registration failures.
    pub async fn rebuild_schemas(&self) -> Result<(usize, Vec<(String, Error)>)> {
        let infos = self.runner.query_infos(None).await?;
        Ok(self.schemas.rebuild(&infos).await)
    }

    /// Install one plugin.
    ///
    /// All policy checks run against the inspected candidate before the
    /// package manager is asked to install anything. With `force`, any
    /// candidate version may replace the installed one.
    pub async fn install(&self, source: &PluginSource, force: bool) -> Result<PluginRecord> {
        let candidate = self.runner.inspect(source).await?;
        tracing::debug!(plugin = %candidate.name, version = %candidate.version, state = ?PluginState::Checking, "State transition");

        let records = self.plugins.all().await?;
        check_install(
            &candidate.as_candidate(),
            &records,
            &self.settings.framework_version,
            force,
        )?;

        match source {
            PluginSource::Local { path } => {
                let cached = self.cache_local(&candidate.name, path)?;
                let outcome = self
                    .install_checked(
                        &candidate,
                        &PluginSource::local(&cached.path),
                        Some(cached.path.clone()),
                        force,
                    )
                    .await;
                match &outcome {
                    Ok(_) => self.commit_cache(&candidate.name, cached),
                    Err(_) => self.restore_cache(&candidate.name, cached),
                }
                outcome
            }
            PluginSource::Registry { .. } => {
                self.install_checked(&candidate, source, None, force).await
            }
        }
    }

    async fn install_checked(
        &self,
        candidate: &InstallResult,
        source: &PluginSource,
        source_path: Option<PathBuf>,
        force: bool,
    ) -> Result<PluginRecord> {
        tracing::debug!(plugin = %candidate.name, state = ?PluginState::Installing, "State transition");
        let installed = self.runner.install(source).await?;

        if installed.version != candidate.version {
            tracing::warn!(
                plugin = %installed.name,
                expected = %candidate.version,
                actual = %installed.version,
                "Installed version differs from inspected candidate"
            );
        }

        let saved = self.commit(&installed, source_path, force).await?;
        tracing::info!(plugin = %saved.name, version = %saved.version, local = saved.is_local_install, "Plugin installed");
        Ok(saved)
    }

    /// Re-check what the package manager actually produced against the
    /// current catalog, then register its schemas and write the record.
    ///
    /// Holds the catalog write lock throughout, so concurrent installs of
    /// different plugins cannot both claim one target attribute.
    async fn commit(
        &self,
        installed: &InstallResult,
        source_path: Option<PathBuf>,
        force: bool,
    ) -> Result<PluginRecord> {
        let _guard = self.catalog_write.lock().await;

        let records = self.plugins.all().await?;
        check_install(
            &installed.as_candidate(),
            &records,
            &self.settings.framework_version,
            force,
        )?;

        self.schemas
            .apply(&installed.name, &installed.schema_paths)
            .await?;

        let existing = records.iter().find(|r| r.name == installed.name);
        let record = to_record(installed, existing, source_path);
        self.plugins.upsert_by_name(&record).await
    }

    /// Update a registry-installed plugin to its newest compatible version.
    pub async fn update(&self, id: &str) -> Result<PluginRecord> {
        let record = self.plugins.get(id).await?;
        if record.is_local() {
            return Err(Error::invalid_source(
                &record.name,
                "locally-installed plugins are updated by installing a new local copy",
            ));
        }

        let candidate = self
            .runner
            .inspect(&PluginSource::registry(&record.name, None))
            .await?;
        let records = self.plugins.all().await?;
        check_install(
            &candidate.as_candidate(),
            &records,
            &self.settings.framework_version,
            true,
        )?;

        let updated = self.runner.update(&record.name).await?;
        if updated.version != candidate.version {
            tracing::warn!(
                plugin = %updated.name,
                expected = %candidate.version,
                actual = %updated.version,
                "Updated version differs from inspected candidate"
            );
        }
        if updated.version == record.version {
            tracing::info!(plugin = %record.name, version = %record.version, "Already up to date");
        }

        let saved = self.commit(&updated, None, true).await?;
        tracing::info!(plugin = %saved.name, from = %record.version, to = %saved.version, "Plugin updated");
        Ok(saved)
    }

    /// Remove a plugin that no content document uses.
    ///
    /// After the schema contributions are withdrawn, the package-manager
    /// uninstall and the catalog delete are both attempted even if one of
    /// them fails; any failure is reported as [`Error::PartialUninstall`].
    pub async fn uninstall(&self, id: &str) -> Result<()> {
        let record = self.plugins.get(id).await?;

        let usage = self.usage.find_usage(&record.name).await?;
        if !usage.is_empty() {
            return Err(Error::InUse {
                name: record.name,
                usage,
            });
        }

        self.schemas.withdraw(&record.name).await?;

        let (removed, deleted) = futures::join!(
            self.runner.uninstall(&record.name),
            self.plugins.delete_by_id(id)
        );

        let mut failures = Vec::new();
        if let Err(e) = removed {
            tracing::error!(plugin = %record.name, error = %e, "Package manager uninstall failed");
            failures.push(format!("package manager: {e}"));
        }
        match deleted {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(plugin = %record.name, "Catalog record already removed");
            }
            Err(e) => {
                tracing::error!(plugin = %record.name, error = %e, "Catalog delete failed");
                failures.push(format!("catalog: {e}"));
            }
        }

        if let Some(path) = record.source_path.as_deref().filter(|_| record.is_local()) {
            self.drop_cached(&record.name, path);
        }

        if !failures.is_empty() {
            return Err(Error::PartialUninstall {
                name: record.name,
                failures,
            });
        }

        tracing::info!(plugin = %record.name, "Plugin uninstalled");
        Ok(())
    }

    /// Content documents that reference the plugin with this id.
    pub async fn usage(&self, id: &str) -> Result<Vec<UsageEntry>> {
        let record = self.plugins.get(id).await?;
        self.usage.find_usage(&record.name).await
    }

    /// Catalog records joined with on-disk versions and update availability.
    pub async fn list(&self) -> Result<Vec<PluginStatus>> {
        let records = self.plugins.all().await?;
        let names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
        let infos = self.runner.query_infos(Some(&names)).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let info = infos.iter().find(|i| i.name == record.name);
                PluginStatus {
                    installed_version: info.map(|i| i.version.clone()),
                    latest_version: info.and_then(|i| i.latest_version.clone()),
                    can_be_updated: info.is_some_and(|i| i.can_be_updated),
                    record,
                }
            })
            .collect())
    }

    fn cache_path_for(&self, name: &str) -> PathBuf {
        self.settings.cache_dir.join(name)
    }

    /// Copy a local plugin into the cache. A cached copy that was already
    /// there is set aside until the install outcome is known.
    fn cache_local(&self, name: &str, source: &Path) -> Result<CachedSource> {
        let target = self.cache_path_for(name);
        if same_dir(source, &target) {
            return Ok(CachedSource {
                path: target,
                previous: None,
                copied: false,
            });
        }

        let previous = if target.exists() {
            let aside = self
                .settings
                .cache_dir
                .join(format!(".{}.previous", name.replace('/', "__")));
            plugin_fs::remove_dir(&aside)?;
            plugin_fs::move_dir(&target, &aside)?;
            Some(aside)
        } else {
            None
        };

        match plugin_fs::copy_dir(source, &target) {
            Ok(files) => {
                tracing::debug!(plugin = %name, files, cache = %target.display(), "Cached local plugin source");
                Ok(CachedSource {
                    path: target,
                    previous,
                    copied: true,
                })
            }
            Err(e) => {
                if let Some(Err(restore)) = previous.as_ref().map(|aside| plugin_fs::move_dir(aside, &target)) {
                    tracing::error!(plugin = %name, error = %restore, "Failed to restore cached source");
                }
                Err(e.into())
            }
        }
    }

    /// The install went through; the set-aside copy is no longer needed.
    fn commit_cache(&self, name: &str, cached: CachedSource) {
        if let Some(Err(e)) = cached.previous.map(|aside| plugin_fs::remove_dir(&aside)) {
            tracing::warn!(plugin = %name, error = %e, "Failed to remove previous cached source");
        }
    }

    /// The install failed; put the cache back the way it was.
    fn restore_cache(&self, name: &str, cached: CachedSource) {
        if !cached.copied {
            return;
        }
        let restored = plugin_fs::remove_dir(&cached.path).and_then(|()| match &cached.previous {
            Some(aside) => plugin_fs::move_dir(aside, &cached.path),
            None => Ok(()),
        });
        match restored {
            Ok(()) => tracing::debug!(plugin = %name, "Restored cached source after failed install"),
            Err(e) => tracing::error!(plugin = %name, error = %e, "Failed to restore cached source"),
        }
    }

    /// Best-effort removal of a cached local source.
    fn drop_cached(&self, name: &str, path: &Path) {
        if !path.starts_with(&self.settings.cache_dir) {
            tracing::warn!(plugin = %name, path = %path.display(), "Source path outside cache, leaving it in place");
            return;
        }
        if let Err(e) = plugin_fs::remove_dir(path) {
            tracing::warn!(plugin = %name, error = %e, "Failed to remove cached source");
        }
    }
}

/// A local source copied into the cache for one install attempt.
struct CachedSource {
    path: PathBuf,
    /// Earlier cached copy, moved aside while the install runs.
    previous: Option<PathBuf>,
    /// `false` when installing straight from the cache itself.
    copied: bool,
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn to_record(
    result: &InstallResult,
    existing: Option<&PluginRecord>,
    source_path: Option<PathBuf>,
) -> PluginRecord {
    let now = Utc::now();
    PluginRecord {
        id: existing.and_then(|r| r.id.clone()),
        name: result.name.clone(),
        display_name: result.display_name.clone(),
        version: result.version.clone(),
        plugin_type: result.plugin_type,
        target_attribute: result.target_attribute.clone().unwrap_or_default(),
        framework_constraint: result.framework_constraint.clone(),
        is_local_install: result.is_local,
        source_path,
        description: result.description.clone(),
        homepage: result.homepage.clone(),
        installed_at: existing.map(|r| r.installed_at).unwrap_or(now),
        updated_at: now,
    }
}
