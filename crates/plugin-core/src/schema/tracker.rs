//! Keeps the schema registry in step with installed plugin versions

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use plugin_runner::InstallInfo;
use tokio::sync::Mutex;

use super::{RegisterOptions, SchemaContributions, SchemaFragment, SchemaRegistry};
use crate::error::{Error, Result};

/// Owns the contribution table and is the only code that talks to the
/// [`SchemaRegistry`].
///
/// The table lock is held across registry calls so the table always
/// describes what the registry actually holds.
pub struct SchemaTracker {
    registry: Arc<dyn SchemaRegistry>,
    table: Mutex<SchemaContributions>,
}

impl SchemaTracker {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            registry,
            table: Mutex::new(SchemaContributions::new()),
        }
    }

    pub async fn snapshot(&self) -> SchemaContributions {
        self.table.lock().await.clone()
    }

    /// Register `paths` as the complete schema set of `plugin`.
    ///
    /// Fragments the plugin contributed before but no longer ships are
    /// deregistered. Returns the number of registered fragments.
    pub async fn apply(&self, plugin: &str, paths: &[PathBuf]) -> Result<usize> {
        let mut table = self.table.lock().await;
        self.apply_locked(&mut table, plugin, paths).await
    }

    /// Deregister every fragment of `plugin`.
    pub async fn withdraw(&self, plugin: &str) -> Result<usize> {
        let mut table = self.table.lock().await;
        self.withdraw_locked(&mut table, plugin).await
    }

    /// Rebuild the whole table from what is on disk.
    ///
    /// Per-plugin failures are collected rather than aborting the rebuild.
    pub async fn rebuild(&self, infos: &[InstallInfo]) -> (usize, Vec<(String, Error)>) {
        let mut table = self.table.lock().await;
        let mut failures = Vec::new();

        let present: BTreeSet<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        let gone: Vec<String> = table
            .plugins()
            .filter(|p| !present.contains(p))
            .map(str::to_string)
            .collect();
        for plugin in gone {
            if let Err(e) = self.withdraw_locked(&mut table, &plugin).await {
                failures.push((plugin, e));
            }
        }

        for info in infos {
            if let Err(e) = self.apply_locked(&mut table, &info.name, &info.schema_paths).await {
                tracing::warn!(plugin = %info.name, error = %e, "Schema registration failed");
                failures.push((info.name.clone(), e));
            }
        }

        (table.len(), failures)
    }

    async fn apply_locked(
        &self,
        table: &mut SchemaContributions,
        plugin: &str,
        paths: &[PathBuf],
    ) -> Result<usize> {
        let fragments = paths
            .iter()
            .map(|p| SchemaFragment::load(p))
            .collect::<Result<Vec<_>>>()?;
        table.check_claim(plugin, &fragments)?;

        let previous = table.fragments(plugin).to_vec();
        let stale: Vec<&SchemaFragment> = previous
            .iter()
            .filter(|old| !fragments.iter().any(|f| f.id == old.id))
            .collect();
        for (done, old) in stale.iter().enumerate() {
            if let Err(e) = self.registry.deregister(&old.id).await {
                // Keep the ones still registered
                let left: Vec<SchemaFragment> = previous
                    .iter()
                    .filter(|f| !stale[..done].iter().any(|s| s.id == f.id))
                    .cloned()
                    .collect();
                table.replace(plugin, left);
                return Err(e);
            }
        }

        let mut registered: Vec<SchemaFragment> = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            match self
                .registry
                .register(&fragment.path, RegisterOptions::replace())
                .await
            {
                Ok(id) => registered.push(SchemaFragment { id, ..fragment }),
                Err(e) => {
                    // Earlier registrations of the same ids are still live
                    let kept = previous.iter().filter(|old| {
                        !stale.iter().any(|s| s.id == old.id)
                            && !registered.iter().any(|r| r.id == old.id)
                    });
                    let mut live = registered.clone();
                    live.extend(kept.cloned());
                    table.replace(plugin, live);
                    return Err(e);
                }
            }
        }

        let count = registered.len();
        tracing::debug!(plugin = %plugin, schemas = count, "Applied schema contributions");
        table.replace(plugin, registered);
        Ok(count)
    }

    async fn withdraw_locked(&self, table: &mut SchemaContributions, plugin: &str) -> Result<usize> {
        let fragments = table.remove(plugin);
        for (idx, fragment) in fragments.iter().enumerate() {
            if let Err(e) = self.registry.deregister(&fragment.id).await {
                table.replace(plugin, fragments[idx..].to_vec());
                return Err(e);
            }
        }
        if !fragments.is_empty() {
            tracing::debug!(plugin = %plugin, schemas = fragments.len(), "Withdrew schema contributions");
        }
        Ok(fragments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MemorySchemaRegistry;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_schema(dir: &Path, id: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(format!("{id}.schema.json"));
        std::fs::write(&path, format!(r#"{{"$anchor": "{id}"}}"#)).unwrap();
        path
    }

    fn tracker() -> (SchemaTracker, Arc<MemorySchemaRegistry>) {
        let registry = Arc::new(MemorySchemaRegistry::new());
        (SchemaTracker::new(registry.clone()), registry)
    }

    #[tokio::test]
    async fn test_apply_supersedes_old_fragments() {
        let temp = TempDir::new().unwrap();
        let (tracker, registry) = tracker();
        let v1 = vec![write_schema(temp.path(), "text"), write_schema(temp.path(), "text-old")];
        let v2 = vec![write_schema(temp.path(), "text"), write_schema(temp.path(), "text-new")];

        tracker.apply("adapt-contrib-text", &v1).await.unwrap();
        let count = tracker.apply("adapt-contrib-text", &v2).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(registry.ids().await, vec!["text".to_string(), "text-new".to_string()]);
    }

    #[tokio::test]
    async fn test_apply_conflict_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let (tracker, registry) = tracker();
        let shared = write_schema(temp.path(), "course-extra");
        tracker.apply("a", std::slice::from_ref(&shared)).await.unwrap();

        let err = tracker.apply("b", &[shared]).await.unwrap_err();

        assert!(matches!(err, Error::SchemaConflict { .. }));
        assert_eq!(tracker.snapshot().await.owner_of("course-extra"), Some("a"));
        assert_eq!(registry.ids().await.len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_only_touches_own_fragments() {
        let temp = TempDir::new().unwrap();
        let (tracker, registry) = tracker();
        tracker.apply("a", &[write_schema(temp.path(), "a")]).await.unwrap();
        tracker.apply("b", &[write_schema(temp.path(), "b")]).await.unwrap();

        assert_eq!(tracker.withdraw("a").await.unwrap(), 1);
        assert_eq!(registry.ids().await, vec!["b".to_string()]);
        assert_eq!(tracker.withdraw("a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rebuild_drops_plugins_no_longer_on_disk() {
        let temp = TempDir::new().unwrap();
        let (tracker, registry) = tracker();
        tracker.apply("gone", &[write_schema(temp.path(), "gone")]).await.unwrap();

        let info = InstallInfo {
            name: "kept".to_string(),
            version: "1.0.0".to_string(),
            plugin_type: plugin_meta::PluginType::Extension,
            path: temp.path().to_path_buf(),
            latest_version: None,
            can_be_updated: false,
            schema_paths: vec![write_schema(temp.path(), "kept")],
        };
        let (count, failures) = tracker.rebuild(&[info]).await;

        assert_eq!(count, 1);
        assert!(failures.is_empty());
        assert_eq!(registry.ids().await, vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_schema_file_fails_before_registry() {
        let temp = TempDir::new().unwrap();
        let (tracker, registry) = tracker();
        let err = tracker
            .apply("a", &[temp.path().join("missing.schema.json")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fs(_)));
        assert!(registry.ids().await.is_empty());
    }
}
