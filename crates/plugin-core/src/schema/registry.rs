//! SchemaRegistry trait and an in-process implementation

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SchemaFragment;
use crate::error::{Error, Result};

/// Options for [`SchemaRegistry::register`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOptions {
    /// Overwrite an existing registration with the same identifier.
    pub replace: bool,
}

impl RegisterOptions {
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

/// The content-schema service plugins extend.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Register the schema at `path`, returning its identifier.
    async fn register(&self, path: &Path, options: RegisterOptions) -> Result<String>;

    /// Remove a registration. Unknown identifiers are ignored.
    async fn deregister(&self, id: &str) -> Result<()>;
}

/// Keeps registered fragments in memory.
#[derive(Debug, Default)]
pub struct MemorySchemaRegistry {
    schemas: RwLock<BTreeMap<String, SchemaFragment>>,
}

impl MemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.schemas.read().await.keys().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<SchemaFragment> {
        self.schemas.read().await.get(id).cloned()
    }
}

#[async_trait]
impl SchemaRegistry for MemorySchemaRegistry {
    async fn register(&self, path: &Path, options: RegisterOptions) -> Result<String> {
        let fragment = SchemaFragment::load(path)?;
        let mut schemas = self.schemas.write().await;

        if !options.replace && schemas.contains_key(&fragment.id) {
            return Err(Error::Schema {
                path: path.to_path_buf(),
                reason: format!("schema {} is already registered", fragment.id),
            });
        }

        let id = fragment.id.clone();
        tracing::debug!(schema = %id, path = %path.display(), "Registered schema");
        schemas.insert(id.clone(), fragment);
        Ok(id)
    }

    async fn deregister(&self, id: &str) -> Result<()> {
        if self.schemas.write().await.remove(id).is_some() {
            tracing::debug!(schema = %id, "Deregistered schema");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_schema(dir: &Path, file: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_register_and_deregister() {
        let temp = TempDir::new().unwrap();
        let path = write_schema(temp.path(), "text.schema.json", r#"{"$anchor": "text"}"#);
        let registry = MemorySchemaRegistry::new();

        let id = registry.register(&path, RegisterOptions::default()).await.unwrap();
        assert_eq!(id, "text");
        assert_eq!(registry.ids().await, vec!["text".to_string()]);

        registry.deregister("text").await.unwrap();
        assert!(registry.ids().await.is_empty());
        // Idempotent
        registry.deregister("text").await.unwrap();
    }

    #[tokio::test]
    async fn test_register_without_replace_rejects_duplicate() {
        let temp = TempDir::new().unwrap();
        let path = write_schema(temp.path(), "text.schema.json", "{}");
        let registry = MemorySchemaRegistry::new();

        registry.register(&path, RegisterOptions::default()).await.unwrap();
        assert!(registry.register(&path, RegisterOptions::default()).await.is_err());
        assert!(registry.register(&path, RegisterOptions::replace()).await.is_ok());
    }
}
