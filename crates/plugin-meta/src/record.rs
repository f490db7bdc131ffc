//! Catalog record for an installed plugin.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The kind of content plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Component,
    Extension,
    Menu,
    Theme,
}

impl PluginType {
    pub const ALL: [PluginType; 4] = [
        PluginType::Component,
        PluginType::Extension,
        PluginType::Menu,
        PluginType::Theme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Extension => "extension",
            Self::Menu => "menu",
            Self::Theme => "theme",
        }
    }
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PluginType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownType(s.to_string()))
    }
}

/// A persisted plugin, one per `name`.
///
/// Field names follow the catalog's camelCase document layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRecord {
    /// Document identifier assigned by the store.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Package name, immutable once created.
    pub name: String,
    pub display_name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    /// Content-schema extension point this plugin owns.
    pub target_attribute: String,
    /// Framework range the plugin declares compatibility with.
    #[serde(rename = "framework")]
    pub framework_constraint: String,
    #[serde(default)]
    pub is_local_install: bool,
    /// Durable cached copy of the plugin source; set only for local installs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PluginRecord {
    /// Whether this record was installed from a local source.
    pub fn is_local(&self) -> bool {
        self.is_local_install
    }

    /// The store identifier, or the empty string for unsaved records.
    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}
