//! Discovery of installed plugins and their schema fragments.

use std::path::{Path, PathBuf};

use crate::manifest::{PluginManifest, manifest_path};

/// Schema fragments live under `schema/` with this suffix.
pub const SCHEMA_SUFFIX: &str = ".schema.json";

/// Schema fragment files shipped in a plugin directory, sorted by path.
pub fn schema_paths(plugin_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(plugin_dir.join("schema")) else {
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(SCHEMA_SUFFIX))
        })
        .collect();
    paths.sort();
    paths
}

/// A directory in the live plugin tree that carries a typed plugin manifest.
#[derive(Debug, Clone)]
pub struct ScannedPlugin {
    pub dir: PathBuf,
    pub manifest: PluginManifest,
}

/// List every plugin installed under `plugins_dir`.
///
/// `@scope/name` directories are descended into. Packages whose manifest
/// is missing, unreadable, or declares no plugin type are ordinary
/// dependencies of other packages and are skipped.
pub fn scan_plugins(plugins_dir: &Path) -> Vec<ScannedPlugin> {
    let mut found = Vec::new();
    for dir in package_dirs(plugins_dir) {
        if manifest_path(&dir).is_none() {
            continue;
        }
        match PluginManifest::load_dir(&dir) {
            Ok(manifest) if manifest.plugin_type().is_ok() => {
                found.push(ScannedPlugin { dir, manifest });
            }
            Ok(manifest) => {
                tracing::trace!(name = %manifest.name, "Skipping untyped package");
            }
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable package");
            }
        }
    }
    found.sort_by(|a, b| a.manifest.name.cmp(&b.manifest.name));
    found
}

fn package_dirs(plugins_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(plugins_dir) else {
        return Vec::new();
    };

    let mut dirs = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        if name.starts_with('@') {
            if let Ok(scoped) = std::fs::read_dir(&path) {
                dirs.extend(
                    scoped
                        .filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| p.is_dir()),
                );
            }
        } else {
            dirs.push(path);
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_plugin(root: &Path, rel: &str, manifest: &str) -> PathBuf {
        let dir = root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("package.json"), manifest).unwrap();
        dir
    }

    #[test]
    fn test_schema_paths_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let schema = temp.path().join("schema");
        std::fs::create_dir_all(&schema).unwrap();
        std::fs::write(schema.join("course.schema.json"), "{}").unwrap();
        std::fs::write(schema.join("article.schema.json"), "{}").unwrap();
        std::fs::write(schema.join("notes.json"), "{}").unwrap();

        let paths = schema_paths(temp.path());
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["article.schema.json", "course.schema.json"]);
    }

    #[test]
    fn test_schema_paths_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(schema_paths(temp.path()).is_empty());
    }

    #[test]
    fn test_scan_skips_untyped_and_descends_scopes() {
        let temp = TempDir::new().unwrap();
        write_plugin(
            temp.path(),
            "adapt-contrib-text",
            r#"{"name": "adapt-contrib-text", "version": "5.0.1", "pluginType": "component"}"#,
        );
        write_plugin(
            temp.path(),
            "@acme/adapt-quiz",
            r#"{"name": "@acme/adapt-quiz", "version": "1.0.0", "component": "quiz"}"#,
        );
        write_plugin(temp.path(), "lodash", r#"{"name": "lodash", "version": "4.17.21"}"#);
        std::fs::create_dir_all(temp.path().join(".bin")).unwrap();

        let found = scan_plugins(temp.path());
        let names: Vec<_> = found.iter().map(|p| p.manifest.name.as_str()).collect();
        assert_eq!(names, vec!["@acme/adapt-quiz", "adapt-contrib-text"]);
    }

    #[test]
    fn test_scan_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(scan_plugins(&temp.path().join("nope")).is_empty());
    }
}
