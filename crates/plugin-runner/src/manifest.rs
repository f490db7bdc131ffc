//! Plugin manifest parsing.
//!
//! Plugins describe themselves in `package.json` (or `bower.json` for older
//! packages):
//!
//! ```json
//! {
//!   "name": "adapt-contrib-text",
//!   "displayName": "Text",
//!   "version": "5.0.1",
//!   "framework": ">=5.0.0",
//!   "pluginType": "component",
//!   "targetAttribute": "_text"
//! }
//! ```
//!
//! `pluginType` is authoritative. Older manifests name their type through a
//! key of its own (`"component": "text"`); exactly one such key is accepted
//! and translated here, so nothing past this module ever guesses a type.

use std::path::{Path, PathBuf};

use plugin_meta::{PluginType, validate_plugin_name};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::runner::InstallResult;
use crate::scan;

/// Manifest filenames, in lookup order.
pub const MANIFEST_FILES: &[&str] = &["package.json", "bower.json"];

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Framework range; absent means "any".
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub target_attribute: Option<String>,
    #[serde(default)]
    pub plugin_type: Option<PluginType>,
    #[serde(default)]
    component: Option<serde_json::Value>,
    #[serde(default)]
    extension: Option<serde_json::Value>,
    #[serde(default)]
    menu: Option<serde_json::Value>,
    #[serde(default)]
    theme: Option<serde_json::Value>,
}

impl PluginManifest {
    /// Parse manifest JSON. `origin` names the source in error messages.
    pub fn from_json(content: &str, origin: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(content)
            .map_err(|e| Error::invalid_source(origin, format!("malformed manifest: {e}")))?;

        validate_plugin_name(&manifest.name)
            .map_err(|e| Error::invalid_source(origin, e.to_string()))?;

        Ok(manifest)
    }

    /// Find and parse the manifest in a plugin directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let path = manifest_path(dir).ok_or_else(|| Error::ManifestNotFound {
            path: dir.to_path_buf(),
        })?;
        let content = plugin_fs::io::read_text(&path)?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// The declared plugin type.
    pub fn plugin_type(&self) -> Result<PluginType> {
        if let Some(t) = self.plugin_type {
            return Ok(t);
        }

        let declared: Vec<PluginType> = [
            (PluginType::Component, &self.component),
            (PluginType::Extension, &self.extension),
            (PluginType::Menu, &self.menu),
            (PluginType::Theme, &self.theme),
        ]
        .into_iter()
        .filter(|(_, key)| key.is_some())
        .map(|(t, _)| t)
        .collect();

        match declared.as_slice() {
            [single] => Ok(*single),
            [] => Err(Error::invalid_source(
                &self.name,
                "manifest does not declare a plugin type",
            )),
            _ => Err(Error::invalid_source(
                &self.name,
                format!("manifest declares several plugin types: {declared:?}"),
            )),
        }
    }

    /// Convert into the runner's result vocabulary.
    pub fn into_result(self, is_local: bool, schema_paths: Vec<PathBuf>) -> Result<InstallResult> {
        let plugin_type = self.plugin_type()?;
        Ok(InstallResult {
            display_name: self.display_name.unwrap_or_else(|| self.name.clone()),
            framework_constraint: self.framework.unwrap_or_else(|| "*".to_string()),
            name: self.name,
            version: self.version,
            plugin_type,
            target_attribute: self.target_attribute,
            is_local,
            description: self.description,
            homepage: self.homepage,
            schema_paths,
        })
    }
}

/// Path of the first manifest file present in `dir`.
pub fn manifest_path(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILES
        .iter()
        .map(|f| dir.join(f))
        .find(|p| p.is_file())
}

/// Read an installed or local plugin directory into an [`InstallResult`].
pub fn read_plugin_dir(dir: &Path, is_local: bool) -> Result<InstallResult> {
    let manifest = PluginManifest::load_dir(dir)?;
    manifest.into_result(is_local, scan::schema_paths(dir))
}
