//! Declared dependencies and install sources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where a plugin is installed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// A named package from the remote registry, optionally pinned to a
    /// version or range.
    Registry {
        name: String,
        version: Option<String>,
    },
    /// An unpacked plugin directory on the local filesystem.
    Local { path: PathBuf },
}

impl PluginSource {
    pub fn registry(name: impl Into<String>, version: Option<&str>) -> Self {
        Self::Registry {
            name: name.into(),
            version: version.map(str::to_string),
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    /// Parse `name`, `name@version`, or `@scope/name@version`.
    pub fn parse_spec(spec: &str) -> Self {
        let spec = spec.trim();
        // Skip a leading scope marker when looking for the version separator
        let search_from = usize::from(spec.starts_with('@'));
        match spec[search_from..].find('@') {
            Some(idx) => {
                let (name, version) = spec.split_at(search_from + idx);
                let version = &version[1..];
                Self::registry(name, (!version.is_empty()).then_some(version))
            }
            None => Self::registry(spec, None),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// Argument handed to the package manager (`name@version` or a path).
    pub fn to_spec(&self) -> String {
        match self {
            Self::Registry {
                name,
                version: Some(v),
            } => format!("{name}@{v}"),
            Self::Registry { name, version: None } => name.clone(),
            Self::Local { path } => path.display().to_string(),
        }
    }
}

impl std::fmt::Display for PluginSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_spec())
    }
}

/// One entry of the framework's declared plugin set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredDependency {
    pub name: String,
    pub source: PluginSource,
}

impl DesiredDependency {
    /// Classify a `name = value` pair.
    ///
    /// A `file:` prefix or a path-like value (`./`, `../`, `/`) is a local
    /// source resolved against `base`; anything else is a version range.
    pub fn from_entry(name: &str, value: &str, base: &Path) -> Self {
        let value = value.trim();
        let local = value
            .strip_prefix("file:")
            .or_else(|| is_path_like(value).then_some(value));

        let source = match local {
            Some(path) => {
                let path = Path::new(path);
                if path.is_absolute() {
                    PluginSource::local(path)
                } else {
                    PluginSource::local(base.join(path))
                }
            }
            None => PluginSource::registry(name, (!value.is_empty()).then_some(value)),
        };

        Self {
            name: name.to_string(),
            source,
        }
    }

    /// Build the declared set from a name -> value table, sorted by name.
    pub fn from_table(table: &BTreeMap<String, String>, base: &Path) -> Vec<Self> {
        table
            .iter()
            .map(|(name, value)| Self::from_entry(name, value, base))
            .collect()
    }
}

fn is_path_like(value: &str) -> bool {
    value.starts_with("./") || value.starts_with("../") || value.starts_with('/')
}
