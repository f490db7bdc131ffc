use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Collection, Document, DocumentStore, Filter};
use crate::Result;

/// Process-local document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.find(filter))
            .unwrap_or_default())
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(collection, doc)
    }

    async fn update(&self, collection: &str, filter: &Filter, doc: Document) -> Result<usize> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(collection) {
            Some(c) => c.update(collection, filter, &doc),
            None => Ok(0),
        }
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<usize> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map(|c| c.delete(filter))
            .unwrap_or(0))
    }

    async fn declare_unique(&self, collection: &str, field: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .declare_unique(collection, field)
    }
}
