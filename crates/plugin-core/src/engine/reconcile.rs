//! Startup reconciliation of catalog, declared dependencies and disk

use plugin_meta::{PluginRecord, PluginSource};
use plugin_runner::InstallInfo;

use super::{PluginState, ReconcileReport, ReconciliationEngine};
use crate::error::{Error, Result};

/// One queued (re)install.
struct Pending {
    name: String,
    source: PluginSource,
    force: bool,
}

impl ReconciliationEngine {
    /// Bring disk and catalog back into agreement.
    ///
    /// An empty catalog is seeded from the declared dependencies. Otherwise
    /// each record is checked against the live plugin directory and missing
    /// or mismatched plugins are reinstalled at the recorded version;
    /// declared dependencies with no record are installed. Finally the
    /// schema contribution table is rebuilt from what is on disk.
    ///
    /// Per-plugin failures end up in the report; only failures to read the
    /// catalog or query the package manager abort the pass.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let records = self.plugins.all().await?;

        let pending = if records.is_empty() {
            tracing::info!(declared = self.settings.desired.len(), "Catalog empty, installing declared plugins");
            self.seed(&mut report)
        } else {
            let infos = self.runner.query_infos(None).await?;
            let mut pending = self.check_records(&records, &infos, &mut report);
            pending.extend(self.undeclared(&records, &mut report));
            pending
        };

        // Each name is queued at most once
        let outcomes =
            futures::future::join_all(pending.iter().map(|p| self.install(&p.source, p.force))).await;

        for (p, outcome) in pending.iter().zip(outcomes) {
            match outcome {
                Ok(record) => report.installed(&record),
                Err(e) => {
                    tracing::error!(plugin = %p.name, error = %e, "Reconciliation install failed");
                    report.failed_with(&p.name, &e);
                }
            }
        }

        let (registered, failures) = self.rebuild_schemas().await?;
        report.schemas_registered = registered;
        report.schema_errors = failures
            .into_iter()
            .map(|(plugin, e)| format!("{plugin}: {e}"))
            .collect();

        tracing::info!(
            plugins = report.plugins.len(),
            failed = report.failed().count(),
            schemas = registered,
            "Reconciliation finished"
        );
        Ok(report)
    }

    fn seed(&self, report: &mut ReconcileReport) -> Vec<Pending> {
        self.settings
            .desired
            .iter()
            .map(|dep| {
                report.transition(&dep.name, PluginState::Declared);
                report.transition(&dep.name, PluginState::NeedsInstall);
                Pending {
                    name: dep.name.clone(),
                    source: dep.source.clone(),
                    force: false,
                }
            })
            .collect()
    }

    fn check_records(
        &self,
        records: &[PluginRecord],
        infos: &[InstallInfo],
        report: &mut ReconcileReport,
    ) -> Vec<Pending> {
        let mut pending = Vec::new();
        for record in records {
            report.transition(&record.name, PluginState::Checking);
            let on_disk = infos.iter().find(|i| i.name == record.name);

            if on_disk.is_some_and(|i| i.version == record.version) {
                report.up_to_date(record);
                continue;
            }

            match on_disk {
                Some(info) => tracing::warn!(plugin = %record.name, catalog = %record.version, disk = %info.version, "Version drift"),
                None => tracing::warn!(plugin = %record.name, "Plugin missing on disk"),
            }
            report.transition(&record.name, PluginState::NeedsReinstall);

            match self.reinstall_source(record) {
                Ok(source) => pending.push(Pending {
                    name: record.name.clone(),
                    source,
                    force: true,
                }),
                Err(e) => {
                    tracing::error!(plugin = %record.name, error = %e, "Manual intervention required");
                    report.failed_with(&record.name, &e);
                }
            }
        }
        pending
    }

    /// Declared dependencies with no catalog record.
    fn undeclared(&self, records: &[PluginRecord], report: &mut ReconcileReport) -> Vec<Pending> {
        self.settings
            .desired
            .iter()
            .filter(|dep| !records.iter().any(|r| r.name == dep.name))
            .map(|dep| {
                report.transition(&dep.name, PluginState::Declared);
                report.transition(&dep.name, PluginState::NeedsInstall);
                Pending {
                    name: dep.name.clone(),
                    source: dep.source.clone(),
                    force: false,
                }
            })
            .collect()
    }

    /// Where to reinstall a record from: its cached copy for local installs,
    /// the registry at the recorded version otherwise.
    ///
    /// A local install whose cache is gone is never replaced from the
    /// registry.
    fn reinstall_source(&self, record: &PluginRecord) -> Result<PluginSource> {
        if !record.is_local() {
            return Ok(PluginSource::registry(&record.name, Some(&record.version)));
        }

        let path = record
            .source_path
            .clone()
            .unwrap_or_else(|| self.cache_path_for(&record.name));
        if path.is_dir() {
            Ok(PluginSource::local(path))
        } else {
            Err(Error::MissingCache {
                name: record.name.clone(),
                path,
            })
        }
    }
}
