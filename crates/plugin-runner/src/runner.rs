//! PackageRunner trait and result types

use std::path::PathBuf;

use async_trait::async_trait;
use plugin_meta::policy::InstallCandidate;
use plugin_meta::{PluginSource, PluginType};

use crate::Result;

/// What the package manager resolved for a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub plugin_type: PluginType,
    pub target_attribute: Option<String>,
    pub framework_constraint: String,
    /// True when the source was a local directory rather than the registry.
    pub is_local: bool,
    pub description: Option<String>,
    pub homepage: Option<String>,
    /// Schema fragments shipped by the plugin. Empty for candidates that
    /// have only been inspected, not installed.
    pub schema_paths: Vec<PathBuf>,
}

impl InstallResult {
    /// View this result as the input of the install policy checks.
    pub fn as_candidate(&self) -> InstallCandidate<'_> {
        InstallCandidate {
            name: &self.name,
            version: &self.version,
            framework_constraint: &self.framework_constraint,
            target_attribute: self.target_attribute.as_deref(),
        }
    }
}

/// State of one plugin currently present in the live plugin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallInfo {
    pub name: String,
    /// Version found on disk.
    pub version: String,
    pub plugin_type: PluginType,
    /// Directory holding the installed plugin.
    pub path: PathBuf,
    /// Newest version known to the registry, when it could be queried.
    pub latest_version: Option<String>,
    /// A newer version exists and the running framework satisfies its range.
    pub can_be_updated: bool,
    pub schema_paths: Vec<PathBuf>,
}

/// Core trait for package-manager backends.
///
/// Every mutating call leaves the live plugin directory no worse than it
/// found it; the backend owns that guarantee.
#[async_trait]
pub trait PackageRunner: Send + Sync {
    fn id(&self) -> &str;

    /// Resolve a candidate's metadata without touching the live plugin directory.
    async fn inspect(&self, source: &PluginSource) -> Result<InstallResult>;

    /// Install a plugin from the registry or a local directory.
    async fn install(&self, source: &PluginSource) -> Result<InstallResult>;

    /// Update an installed registry plugin to its newest compatible version.
    async fn update(&self, name: &str) -> Result<InstallResult>;

    async fn uninstall(&self, name: &str) -> Result<()>;

    /// Report installed plugins, optionally restricted to `names`.
    async fn query_infos(&self, names: Option<&[String]>) -> Result<Vec<InstallInfo>>;
}
