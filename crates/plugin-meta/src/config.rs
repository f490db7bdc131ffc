//! Manager configuration loaded from `plugins.toml`.
//!
//! ```toml
//! framework_root = "/srv/framework"
//! framework_version = "5.31.0"
//! plugins_dir = "node_modules"
//! cache_dir = "/var/cache/plugins"
//!
//! [runner]
//! program = "npm"
//! timeout_secs = 300
//!
//! [dependencies]
//! "adapt-contrib-text" = "^5.0.0"
//! "my-local-thing" = "file:./local/my-local-thing"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dependency::DesiredDependency;
use crate::error::{Error, Result};

/// Application directory name under the platform data dir.
const APP_DIR: &str = "plugin-manager";

/// Package-manager process settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Package-manager executable.
    #[serde(default = "default_program")]
    pub program: String,
    /// Hard limit for a single package-manager invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RunnerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_program() -> String {
    "npm".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_plugins_dir() -> PathBuf {
    PathBuf::from("node_modules")
}

/// Everything the engine reads once at reconciliation start.
///
/// Relative directories are resolved against `framework_root`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ManagerConfig {
    pub framework_root: PathBuf,
    /// Running framework version; read from the framework's `package.json`
    /// when unset.
    #[serde(default)]
    pub framework_version: Option<String>,
    /// Live plugin directory the package manager writes into.
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: PathBuf,
    /// Durable cache for locally-installed plugin sources.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Directory of the file-backed catalog.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    #[serde(default)]
    pub runner: RunnerSettings,
    /// Declared plugin set: name -> version range or local path.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl ManagerConfig {
    /// A configuration with defaults for everything but the framework root.
    pub fn new(framework_root: impl Into<PathBuf>) -> Self {
        Self {
            framework_root: framework_root.into(),
            framework_version: None,
            plugins_dir: default_plugins_dir(),
            cache_dir: None,
            store_dir: None,
            runner: RunnerSettings::default(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Load from a TOML or JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = plugin_fs::ConfigStore::new().load(path)?;
        tracing::debug!(path = %path.display(), "Loaded manager config");
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.framework_root.join(path)
        }
    }

    /// Absolute path of the live plugin directory.
    pub fn plugins_path(&self) -> PathBuf {
        self.resolve(&self.plugins_dir)
    }

    /// Absolute path of the local-install cache.
    pub fn cache_path(&self) -> Result<PathBuf> {
        self.dir_or_default(self.cache_dir.as_deref(), "cache")
    }

    /// Absolute path of the catalog store directory.
    pub fn store_path(&self) -> Result<PathBuf> {
        self.dir_or_default(self.store_dir.as_deref(), "store")
    }

    fn dir_or_default(&self, configured: Option<&Path>, leaf: &str) -> Result<PathBuf> {
        if let Some(dir) = configured {
            return Ok(self.resolve(dir));
        }
        dirs::data_dir()
            .map(|d| d.join(APP_DIR).join(leaf))
            .ok_or_else(|| Error::UnresolvedPath {
                what: format!("default {leaf} directory"),
                path: PathBuf::from(leaf),
            })
    }

    /// The running framework version.
    ///
    /// Uses `framework_version` when set, else the `version` field of
    /// `<framework_root>/package.json`.
    pub fn framework_version(&self) -> Result<String> {
        if let Some(version) = &self.framework_version {
            return Ok(version.clone());
        }

        let manifest = self.framework_root.join("package.json");
        let content = plugin_fs::io::read_text(&manifest)?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| Error::FrameworkVersion {
                reason: format!("{}: {e}", manifest.display()),
            })?;

        value
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::FrameworkVersion {
                reason: format!("{} has no \"version\" field", manifest.display()),
            })
    }

    /// The declared plugin set.
    pub fn desired_dependencies(&self) -> Vec<DesiredDependency> {
        DesiredDependency::from_table(&self.dependencies, &self.framework_root)
    }
}
