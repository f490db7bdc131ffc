//! Installing many plugins at once

use std::collections::BTreeMap;

use futures::future::join_all;
use plugin_meta::{PluginRecord, PluginSource};
use plugin_runner::manifest::PluginManifest;

use super::ReconciliationEngine;
use crate::error::{Error, Result};

/// Options for [`ReconciliationEngine::install_many`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Let any candidate version replace an installed one.
    pub force: bool,
    /// Raise [`Error::AggregateInstallFailure`] when any install fails,
    /// instead of logging failures and returning the successes.
    pub strict: bool,
}

impl ReconciliationEngine {
    /// Install several plugins concurrently.
    ///
    /// Requests for the same plugin name run one after another; different
    /// names run concurrently. Every request is attempted regardless of the
    /// others' outcome. Successes are returned in request order.
    pub async fn install_many(
        &self,
        sources: &[PluginSource],
        options: InstallOptions,
    ) -> Result<Vec<PluginRecord>> {
        let outcomes = self.install_outcomes(sources, options.force).await;

        let mut installed = Vec::new();
        let mut failures = Vec::new();
        for (source, outcome) in sources.iter().zip(outcomes) {
            match outcome {
                Ok(record) => installed.push(record),
                Err(e) => failures.push((source.to_spec(), e)),
            }
        }

        if failures.is_empty() {
            return Ok(installed);
        }
        if options.strict {
            return Err(Error::AggregateInstallFailure { failures });
        }
        for (spec, e) in &failures {
            tracing::error!(plugin = %spec, error = %e, "Install failed");
        }
        Ok(installed)
    }

    /// Run installs grouped by plugin name; outcomes line up with `sources`.
    pub(crate) async fn install_outcomes(
        &self,
        sources: &[PluginSource],
        force: bool,
    ) -> Vec<Result<PluginRecord>> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, source) in sources.iter().enumerate() {
            groups.entry(group_key(source)).or_default().push(idx);
        }

        let grouped = join_all(groups.into_values().map(|indices| async move {
            let mut done = Vec::with_capacity(indices.len());
            for idx in indices {
                done.push((idx, self.install(&sources[idx], force).await));
            }
            done
        }))
        .await;

        let mut outcomes: Vec<(usize, Result<PluginRecord>)> = grouped.into_iter().flatten().collect();
        outcomes.sort_by_key(|(idx, _)| *idx);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Requests group by plugin name. A local directory is keyed by its
/// manifest name, or by its path when the manifest cannot be read.
fn group_key(source: &PluginSource) -> String {
    match source {
        PluginSource::Registry { name, .. } => name.clone(),
        PluginSource::Local { path } => PluginManifest::load_dir(path)
            .map(|manifest| manifest.name)
            .unwrap_or_else(|_| path.display().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_ignores_version() {
        assert_eq!(
            group_key(&PluginSource::parse_spec("adapt-contrib-text@5.0.0")),
            group_key(&PluginSource::parse_spec("adapt-contrib-text@5.1.0"))
        );
    }

    #[test]
    fn test_group_key_unreadable_local_uses_path() {
        assert_eq!(
            group_key(&PluginSource::local("/nonexistent/menu")),
            "/nonexistent/menu"
        );
    }

    #[test]
    fn test_group_key_local_uses_manifest_name() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"name": "adapt-contrib-text", "version": "5.0.0", "pluginType": "component"}"#,
        )
        .unwrap();

        assert_eq!(
            group_key(&PluginSource::local(temp.path())),
            group_key(&PluginSource::parse_spec("adapt-contrib-text@5.0.0"))
        );
    }
}
