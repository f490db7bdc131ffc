//! In-memory collection shared by every document store backend.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Document, Filter, ID_FIELD};
use crate::error::{Error, Result};

/// Documents of one collection plus its unique-index declarations.
///
/// This is also the on-disk layout of [`super::FileStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    unique: BTreeSet<String>,
    #[serde(default)]
    documents: Vec<Document>,
}

impl Collection {
    pub fn find(&self, filter: &Filter) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect()
    }

    /// Insert `doc`, assigning an `_id` when it has none.
    pub fn insert(&mut self, name: &str, mut doc: Document) -> Result<Document> {
        if !doc.get(ID_FIELD).is_some_and(Value::is_string) {
            doc.insert(ID_FIELD.into(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        self.check_unique(name, &doc, None)?;
        self.documents.push(doc.clone());
        Ok(doc)
    }

    /// Replace every matching document with `doc`, keeping each one's `_id`.
    ///
    /// Fails without changing anything when the result would break a
    /// unique index.
    pub fn update(&mut self, name: &str, filter: &Filter, doc: &Document) -> Result<usize> {
        let matched: Vec<usize> = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, d)| filter.matches(d))
            .map(|(i, _)| i)
            .collect();

        let mut next = self.documents.clone();
        for &idx in &matched {
            let mut replacement = doc.clone();
            if let Some(id) = next[idx].get(ID_FIELD).cloned() {
                replacement.insert(ID_FIELD.into(), id);
            }
            next[idx] = replacement;
        }

        let staged = Collection {
            unique: self.unique.clone(),
            documents: next,
        };
        for &idx in &matched {
            staged.check_unique(name, &staged.documents[idx], Some(idx))?;
        }

        self.documents = staged.documents;
        Ok(matched.len())
    }

    pub fn delete(&mut self, filter: &Filter) -> usize {
        let before = self.documents.len();
        self.documents.retain(|d| !filter.matches(d));
        before - self.documents.len()
    }

    /// Declare `field` unique. Fails if existing documents already collide.
    pub fn declare_unique(&mut self, name: &str, field: &str) -> Result<()> {
        if self.unique.contains(field) {
            return Ok(());
        }

        let mut seen = BTreeSet::new();
        for doc in &self.documents {
            if let Some(value) = indexed_value(doc, field)
                && !seen.insert(value.clone())
            {
                return Err(duplicate(name, field, &value));
            }
        }

        self.unique.insert(field.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check_unique(&self, name: &str, doc: &Document, skip: Option<usize>) -> Result<()> {
        for field in &self.unique {
            let Some(value) = indexed_value(doc, field) else {
                continue;
            };
            let clash = self
                .documents
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .any(|(_, other)| indexed_value(other, field).as_ref() == Some(&value));
            if clash {
                return Err(duplicate(name, field, &value));
            }
        }
        Ok(())
    }
}

/// Null and missing values are not indexed.
fn indexed_value(doc: &Document, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn duplicate(collection: &str, field: &str, value: &str) -> Error {
    Error::DuplicateKey {
        collection: collection.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_insert_assigns_id() {
        let mut c = Collection::default();
        let saved = c.insert("plugins", doc(json!({"name": "a"}))).unwrap();
        assert!(saved.get(ID_FIELD).and_then(Value::as_str).is_some());
    }

    #[test]
    fn test_insert_keeps_given_id() {
        let mut c = Collection::default();
        let saved = c
            .insert("plugins", doc(json!({"_id": "fixed", "name": "a"})))
            .unwrap();
        assert_eq!(saved[ID_FIELD], json!("fixed"));
    }

    #[test]
    fn test_unique_rejects_duplicate_insert() {
        let mut c = Collection::default();
        c.declare_unique("plugins", "name").unwrap();
        c.insert("plugins", doc(json!({"name": "a"}))).unwrap();

        let err = c.insert("plugins", doc(json!({"name": "a"}))).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref field, .. } if field == "name"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_unique_ignores_missing_values() {
        let mut c = Collection::default();
        c.declare_unique("plugins", "displayName").unwrap();
        c.insert("plugins", doc(json!({"name": "a"}))).unwrap();
        c.insert("plugins", doc(json!({"name": "b", "displayName": null})))
            .unwrap();
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_update_preserves_id_and_allows_same_key() {
        let mut c = Collection::default();
        c.declare_unique("plugins", "name").unwrap();
        let saved = c
            .insert("plugins", doc(json!({"name": "a", "version": "1.0.0"})))
            .unwrap();

        let n = c
            .update(
                "plugins",
                &Filter::eq("name", "a"),
                &doc(json!({"name": "a", "version": "2.0.0"})),
            )
            .unwrap();

        assert_eq!(n, 1);
        let found = c.find(&Filter::eq("name", "a"));
        assert_eq!(found[0]["version"], json!("2.0.0"));
        assert_eq!(found[0][ID_FIELD], saved[ID_FIELD]);
    }

    #[test]
    fn test_update_into_clash_is_atomic() {
        let mut c = Collection::default();
        c.declare_unique("plugins", "displayName").unwrap();
        c.insert("plugins", doc(json!({"name": "a", "displayName": "A"})))
            .unwrap();
        c.insert("plugins", doc(json!({"name": "b", "displayName": "B"})))
            .unwrap();

        let err = c
            .update(
                "plugins",
                &Filter::eq("name", "b"),
                &doc(json!({"name": "b", "displayName": "A"})),
            )
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateKey { .. }));
        assert_eq!(c.find(&Filter::eq("name", "b"))[0]["displayName"], json!("B"));
    }

    #[test]
    fn test_declare_unique_over_existing_duplicates_fails() {
        let mut c = Collection::default();
        c.insert("plugins", doc(json!({"name": "a"}))).unwrap();
        c.insert("plugins", doc(json!({"name": "a"}))).unwrap();
        assert!(c.declare_unique("plugins", "name").is_err());
    }

    #[test]
    fn test_delete_returns_count() {
        let mut c = Collection::default();
        c.insert("plugins", doc(json!({"name": "a"}))).unwrap();
        c.insert("plugins", doc(json!({"name": "b"}))).unwrap();
        assert_eq!(c.delete(&Filter::eq("name", "a")), 1);
        assert_eq!(c.delete(&Filter::eq("name", "a")), 0);
        assert_eq!(c.len(), 1);
    }
}
