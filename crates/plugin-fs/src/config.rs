//! Format-agnostic configuration loading and saving

use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result, io};

/// Format-agnostic configuration store.
///
/// Detects the format from the file extension:
/// - `.toml` -> TOML
/// - `.json` -> JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a file.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = io::read_text(path)?;
        let extension = extension_of(path);

        match extension.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            }),
            "json" => serde_json::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                format: "JSON".into(),
                message: e.to_string(),
            }),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    /// Save configuration to a file atomically.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let extension = extension_of(path);

        let content = match extension.as_str() {
            "toml" => toml::to_string_pretty(value).map_err(|e| Error::ConfigSerialize {
                path: path.to_path_buf(),
                format: "TOML".into(),
                message: e.to_string(),
            })?,
            "json" => serde_json::to_string_pretty(value).map_err(|e| Error::ConfigSerialize {
                path: path.to_path_buf(),
                format: "JSON".into(),
                message: e.to_string(),
            })?,
            _ => return Err(Error::UnsupportedFormat { extension }),
        };

        io::write_atomic(path, content.as_bytes())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
