//! File-backed document store
//!
//! Each collection lives in `<dir>/<collection>.json`. Every operation takes
//! the file's advisory lock (shared for reads, exclusive for writes) and
//! writes go through a temp file and rename, so a reader in another process
//! never observes a half-written collection.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use plugin_fs::io::{read_locked, update_locked};

use super::{Collection, Document, DocumentStore, Filter};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::store(format!("invalid collection name: {collection:?}")));
        }
        Ok(self.dir.join(format!("{collection}.json")))
    }

    async fn read(&self, collection: &str) -> Result<Collection> {
        let path = self.collection_path(collection)?;
        run_blocking(move || match read_locked(&path)? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Collection::default()),
        })
        .await
    }

    /// Load, modify and persist a collection under its exclusive lock.
    ///
    /// Nothing is written when `apply` fails.
    async fn write<T, F>(&self, collection: &str, apply: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Collection) -> Result<T> + Send + 'static,
    {
        let path = self.collection_path(collection)?;
        run_blocking(move || {
            update_locked(&path, |content| {
                let mut coll: Collection = match content {
                    Some(content) => serde_json::from_str(&content)?,
                    None => Collection::default(),
                };
                let output = apply(&mut coll)?;
                Ok((Some(serde_json::to_string_pretty(&coll)?), output))
            })
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::store(format!("store task failed: {e}")))?
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        Ok(self.read(collection).await?.find(filter))
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document> {
        let name = collection.to_string();
        self.write(collection, move |c| c.insert(&name, doc)).await
    }

    async fn update(&self, collection: &str, filter: &Filter, doc: Document) -> Result<usize> {
        let name = collection.to_string();
        let filter = filter.clone();
        self.write(collection, move |c| c.update(&name, &filter, &doc))
            .await
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<usize> {
        let filter = filter.clone();
        self.write(collection, move |c| Ok(c.delete(&filter))).await
    }

    async fn declare_unique(&self, collection: &str, field: &str) -> Result<()> {
        let name = collection.to_string();
        let field = field.to_string();
        self.write(collection, move |c| c.declare_unique(&name, &field))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = FileStore::new(temp.path());
            store.declare_unique("contentplugins", "name").await.unwrap();
            store
                .insert("contentplugins", doc(json!({"name": "adapt-contrib-text"})))
                .await
                .unwrap();
        }

        let reopened = FileStore::new(temp.path());
        let found = reopened
            .find("contentplugins", &Filter::all())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        // Unique index is persisted alongside the documents
        let err = reopened
            .insert("contentplugins", doc(json!({"name": "adapt-contrib-text"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        store.declare_unique("contentplugins", "name").await.unwrap();
        store
            .insert("contentplugins", doc(json!({"name": "a"})))
            .await
            .unwrap();
        let before = std::fs::read_to_string(temp.path().join("contentplugins.json")).unwrap();

        let _ = store
            .insert("contentplugins", doc(json!({"name": "a"})))
            .await;

        let after = std::fs::read_to_string(temp.path().join("contentplugins.json")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_rejects_path_like_collection_names() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());
        let err = store.find("../escape", &Filter::all()).await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
    }

    #[tokio::test]
    async fn test_missing_collection_reads_empty() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("not-yet-created"));
        assert!(store.find("configs", &Filter::all()).await.unwrap().is_empty());
    }
}
