//! Schema fragments shipped by plugins

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};

/// One `schema/*.schema.json` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFragment {
    /// Registry identifier: the `$anchor`, else the file stem without
    /// `.schema`.
    pub id: String,
    pub path: PathBuf,
    /// Base schema this fragment extends through `$patch.source.$ref`.
    pub patch_source: Option<String>,
}

impl SchemaFragment {
    pub fn load(path: &Path) -> Result<Self> {
        let content = plugin_fs::io::read_text(path)?;
        let value: Value = serde_json::from_str(&content).map_err(|e| Error::Schema {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_value(path, &value)
    }

    pub fn from_value(path: &Path, value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::Schema {
                path: path.to_path_buf(),
                reason: "schema is not a JSON object".to_string(),
            });
        }

        let id = match value.get("$anchor").and_then(Value::as_str) {
            Some(anchor) if !anchor.is_empty() => anchor.to_string(),
            _ => stem_id(path).ok_or_else(|| Error::Schema {
                path: path.to_path_buf(),
                reason: "cannot derive schema identifier".to_string(),
            })?,
        };

        let patch_source = value
            .pointer("/$patch/source/$ref")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            id,
            path: path.to_path_buf(),
            patch_source,
        })
    }
}

fn stem_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let id = name
        .strip_suffix(".schema.json")
        .or_else(|| name.strip_suffix(".json"))
        .unwrap_or(name);
    (!id.is_empty()).then(|| id.to_string())
}
