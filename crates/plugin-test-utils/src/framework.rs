//! [`TestFramework`]: a throwaway framework installation.

use std::path::{Path, PathBuf};

use plugin_meta::ManagerConfig;
use tempfile::TempDir;

use crate::package::PluginPackage;
use crate::runner::FakeRunner;

/// Framework version every fixture runs at unless told otherwise.
pub const FRAMEWORK_VERSION: &str = "5.2.0";

/// A temporary directory laid out as:
///
/// ```text
/// framework/              framework root
/// framework/node_modules/ live plugin directory
/// cache/                  local-install cache
/// store/                  file-backed catalog
/// uploads/                local plugin sources
/// ```
pub struct TestFramework {
    temp_dir: TempDir,
}

impl Default for TestFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFramework {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("framework/node_modules")).unwrap();
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn framework_root(&self) -> PathBuf {
        self.root().join("framework")
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.framework_root().join("node_modules")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root().join("cache")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root().join("store")
    }

    /// Manager configuration pointing at this layout.
    pub fn config(&self) -> ManagerConfig {
        let mut config = ManagerConfig::new(self.framework_root());
        config.framework_version = Some(FRAMEWORK_VERSION.to_string());
        config.cache_dir = Some(self.cache_dir());
        config.store_dir = Some(self.store_dir());
        config
    }

    /// A fake runner writing into this framework's plugin directory.
    pub fn runner(&self) -> FakeRunner {
        FakeRunner::new(self.plugins_dir(), FRAMEWORK_VERSION)
    }

    /// Unpack `package` as a local upload and return its directory.
    pub fn upload(&self, package: &PluginPackage) -> PathBuf {
        package.write_to(&self.root().join("uploads").join(&package.name))
    }
}
