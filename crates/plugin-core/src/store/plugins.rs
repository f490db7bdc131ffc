//! Typed catalog of installed plugins

use std::sync::Arc;

use plugin_meta::PluginRecord;
use serde_json::Value;

use super::{Document, DocumentStore, Filter, ID_FIELD};
use crate::error::{Error, Result};

/// Collection holding one document per installed plugin.
pub const PLUGIN_COLLECTION: &str = "contentplugins";

/// Fields with a unique index in [`PLUGIN_COLLECTION`].
const UNIQUE_FIELDS: &[&str] = &["name", "displayName"];

/// CRUD over [`PluginRecord`]s.
///
/// Records handed out are always copies; the store itself is the only
/// shared state.
#[derive(Clone)]
pub struct PluginStore {
    store: Arc<dyn DocumentStore>,
}

impl PluginStore {
    /// Wrap a document store, declaring the catalog's unique indexes.
    pub async fn open(store: Arc<dyn DocumentStore>) -> Result<Self> {
        for field in UNIQUE_FIELDS {
            store.declare_unique(PLUGIN_COLLECTION, field).await?;
        }
        Ok(Self { store })
    }

    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn all(&self) -> Result<Vec<PluginRecord>> {
        self.find(&Filter::all()).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.all().await?.is_empty())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<PluginRecord>> {
        Ok(self.find(&Filter::by_id(id)).await?.into_iter().next())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<PluginRecord>> {
        Ok(self.find(&Filter::eq("name", name)).await?.into_iter().next())
    }

    /// Like [`find_by_id`](Self::find_by_id) but a missing record is an error.
    pub async fn get(&self, id: &str) -> Result<PluginRecord> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    /// Replace the record with the same name, or insert it.
    ///
    /// Safe to repeat: a retry, or a concurrent insert of the same name that
    /// wins the race, ends in a single record holding this content.
    pub async fn upsert_by_name(&self, record: &PluginRecord) -> Result<PluginRecord> {
        let doc = to_document(record)?;
        let filter = Filter::eq("name", record.name.as_str());

        if self
            .store
            .update(PLUGIN_COLLECTION, &filter, doc.clone())
            .await?
            == 0
        {
            match self.store.insert(PLUGIN_COLLECTION, doc.clone()).await {
                Ok(saved) => return from_document(saved),
                Err(Error::DuplicateKey { field, .. }) if field == "name" => {
                    tracing::debug!(plugin = %record.name, "Insert lost to a concurrent writer, updating instead");
                    self.store.update(PLUGIN_COLLECTION, &filter, doc).await?;
                }
                Err(e) => return Err(e),
            }
        }

        self.find_by_name(&record.name)
            .await?
            .ok_or_else(|| Error::NotFound {
                id: record.name.clone(),
            })
    }

    /// Returns whether a record was deleted.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        Ok(self.store.delete(PLUGIN_COLLECTION, &Filter::by_id(id)).await? > 0)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<PluginRecord>> {
        self.store
            .find(PLUGIN_COLLECTION, filter)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }
}

fn to_document(record: &PluginRecord) -> Result<Document> {
    match serde_json::to_value(record)? {
        Value::Object(mut doc) => {
            doc.remove(ID_FIELD);
            Ok(doc)
        }
        other => Err(Error::store(format!(
            "plugin record serialized to non-object: {other}"
        ))),
    }
}

fn from_document(doc: Document) -> Result<PluginRecord> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use plugin_meta::PluginType;
    use pretty_assertions::assert_eq;

    fn record(name: &str, version: &str) -> PluginRecord {
        let now = Utc::now();
        PluginRecord {
            id: None,
            name: name.to_string(),
            display_name: name.to_uppercase(),
            version: version.to_string(),
            plugin_type: PluginType::Component,
            target_attribute: format!("_{name}"),
            framework_constraint: ">=5".to_string(),
            is_local_install: false,
            source_path: None,
            description: None,
            homepage: None,
            installed_at: now,
            updated_at: now,
        }
    }

    async fn open() -> PluginStore {
        PluginStore::open(Arc::new(MemoryStore::new())).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_replaces() {
        let store = open().await;

        let first = store.upsert_by_name(&record("text", "1.0.0")).await.unwrap();
        let second = store.upsert_by_name(&record("text", "1.1.0")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.version, "1.1.0");
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_display_name_unique() {
        let store = open().await;
        store.upsert_by_name(&record("text", "1.0.0")).await.unwrap();

        let mut other = record("other", "1.0.0");
        other.display_name = "TEXT".to_string();
        let err = store.upsert_by_name(&other).await.unwrap_err();

        assert!(matches!(err, Error::DuplicateKey { ref field, .. } if field == "displayName"));
    }

    #[tokio::test]
    async fn test_get_and_delete_by_id() {
        let store = open().await;
        let saved = store.upsert_by_name(&record("text", "1.0.0")).await.unwrap();
        let id = saved.id_str().to_string();

        assert_eq!(store.get(&id).await.unwrap().name, "text");
        assert!(store.delete_by_id(&id).await.unwrap());
        assert!(!store.delete_by_id(&id).await.unwrap());
        assert!(matches!(store.get(&id).await, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_leave_one_record() {
        let store = open().await;
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .upsert_by_name(&record("text", &format!("1.0.{i}")))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.all().await.unwrap().len(), 1);
    }
}
