//! Document store abstraction and the plugin catalog built on it.
//!
//! The engine only needs a handful of operations from a document database:
//! equality queries, insert, replace, delete, and unique indexes. Two
//! backends are provided: [`MemoryStore`] for tests and embedding, and
//! [`FileStore`] which keeps one JSON file per collection.

mod collection;
mod file;
mod memory;
mod plugins;

pub use collection::Collection;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use plugins::{PLUGIN_COLLECTION, PluginStore};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::Result;

/// A stored document.
pub type Document = Map<String, Value>;

/// Identifier field assigned on insert.
pub const ID_FIELD: &str = "_id";

/// Conjunction of field equality conditions.
///
/// A condition on an array field matches when the array contains the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn by_id(id: &str) -> Self {
        Self::eq(ID_FIELD, id)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| match doc.get(field) {
                Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
                Some(actual) => actual == expected,
                None => expected.is_null(),
            })
    }
}

/// Minimal document database interface.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// Insert a document and return it with its `_id`.
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document>;

    /// Replace matching documents, keeping their `_id`. Returns the match count.
    async fn update(&self, collection: &str, filter: &Filter, doc: Document) -> Result<usize>;

    /// Returns the number of deleted documents.
    async fn delete(&self, collection: &str, filter: &Filter) -> Result<usize>;

    async fn declare_unique(&self, collection: &str, field: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_all_matches_everything() {
        assert!(Filter::all().matches(&doc(json!({"a": 1}))));
        assert!(Filter::all().matches(&Document::new()));
    }

    #[test]
    fn test_filter_eq_and_conjunction() {
        let d = doc(json!({"name": "a", "type": "component"}));
        assert!(Filter::eq("name", "a").matches(&d));
        assert!(Filter::eq("name", "a").and("type", "component").matches(&d));
        assert!(!Filter::eq("name", "a").and("type", "theme").matches(&d));
        assert!(!Filter::eq("missing", "x").matches(&d));
    }

    #[test]
    fn test_filter_array_contains() {
        let d = doc(json!({"_enabledPlugins": ["adapt-contrib-text", "adapt-contrib-gmcq"]}));
        assert!(Filter::eq("_enabledPlugins", "adapt-contrib-gmcq").matches(&d));
        assert!(!Filter::eq("_enabledPlugins", "adapt-contrib-media").matches(&d));
    }

    #[test]
    fn test_filter_null_matches_missing() {
        let d = doc(json!({"name": "a"}));
        assert!(Filter::eq("sourcePath", Value::Null).matches(&d));
    }
}
