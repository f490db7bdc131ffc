//! Which plugin contributed which schema fragments

use std::collections::BTreeMap;

use super::SchemaFragment;
use crate::error::{Error, Result};

/// Plugin name to the fragments it has registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaContributions {
    by_plugin: BTreeMap<String, Vec<SchemaFragment>>,
}

impl SchemaContributions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fragments(&self, plugin: &str) -> &[SchemaFragment] {
        self.by_plugin
            .get(plugin)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Name of the plugin that contributed schema `id`.
    pub fn owner_of(&self, id: &str) -> Option<&str> {
        self.by_plugin
            .iter()
            .find(|(_, fragments)| fragments.iter().any(|f| f.id == id))
            .map(|(plugin, _)| plugin.as_str())
    }

    /// Fail with `SchemaConflict` if another plugin owns one of `fragments`.
    pub fn check_claim(&self, plugin: &str, fragments: &[SchemaFragment]) -> Result<()> {
        for fragment in fragments {
            if let Some(owner) = self.owner_of(&fragment.id)
                && owner != plugin
            {
                return Err(Error::SchemaConflict {
                    id: fragment.id.clone(),
                    owner: owner.to_string(),
                    claimant: plugin.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Set the fragments of `plugin`, returning the ones it had before.
    pub fn replace(&mut self, plugin: &str, fragments: Vec<SchemaFragment>) -> Vec<SchemaFragment> {
        if fragments.is_empty() {
            return self.remove(plugin);
        }
        self.by_plugin
            .insert(plugin.to_string(), fragments)
            .unwrap_or_default()
    }

    pub fn remove(&mut self, plugin: &str) -> Vec<SchemaFragment> {
        self.by_plugin.remove(plugin).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.by_plugin.clear();
    }

    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.by_plugin.keys().map(String::as_str)
    }

    /// Total number of tracked fragments.
    pub fn len(&self) -> usize {
        self.by_plugin.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_plugin.is_empty()
    }
}
