//! [`PluginPackage`] builder for plugin directories on disk.

use std::fs;
use std::path::{Path, PathBuf};

use plugin_meta::PluginType;
use serde_json::{Value, json};

/// An unpacked plugin: manifest plus schema fragments.
///
/// # Example
///
/// ```rust,no_run
/// use plugin_test_utils::package::PluginPackage;
///
/// let dir = tempfile::TempDir::new().unwrap();
/// PluginPackage::new("adapt-contrib-text", "5.0.0")
///     .framework(">=5")
///     .schema("text")
///     .write_to(&dir.path().join("adapt-contrib-text"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PluginPackage {
    pub name: String,
    pub version: String,
    pub plugin_type: PluginType,
    pub target_attribute: Option<String>,
    pub framework: String,
    pub display_name: Option<String>,
    /// `(id, body)` pairs written to `schema/<id>.schema.json`.
    pub schemas: Vec<(String, Value)>,
}

impl PluginPackage {
    /// A component with target attribute `_<last name segment>` that runs on
    /// any framework.
    pub fn new(name: &str, version: &str) -> Self {
        let tail = name.rsplit(['-', '/']).next().unwrap_or(name);
        Self {
            name: name.to_string(),
            version: version.to_string(),
            plugin_type: PluginType::Component,
            target_attribute: Some(format!("_{tail}")),
            framework: "*".to_string(),
            display_name: None,
            schemas: Vec::new(),
        }
    }

    pub fn plugin_type(mut self, plugin_type: PluginType) -> Self {
        self.plugin_type = plugin_type;
        self
    }

    pub fn target(mut self, attribute: &str) -> Self {
        self.target_attribute = Some(attribute.to_string());
        self
    }

    pub fn no_target(mut self) -> Self {
        self.target_attribute = None;
        self
    }

    pub fn framework(mut self, constraint: &str) -> Self {
        self.framework = constraint.to_string();
        self
    }

    pub fn display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    /// Add a schema fragment anchored at `id`.
    pub fn schema(self, id: &str) -> Self {
        self.schema_body(id, json!({ "$anchor": id }))
    }

    /// Add a fragment that patches the base schema `base`.
    pub fn patch_schema(self, id: &str, base: &str) -> Self {
        self.schema_body(
            id,
            json!({ "$anchor": id, "$patch": { "source": { "$ref": base }, "with": {} } }),
        )
    }

    pub fn schema_body(mut self, id: &str, body: Value) -> Self {
        self.schemas.push((id.to_string(), body));
        self
    }

    pub fn manifest(&self) -> Value {
        let mut manifest = json!({
            "name": self.name,
            "version": self.version,
            "pluginType": self.plugin_type.as_str(),
            "framework": self.framework,
        });
        if let Some(target) = &self.target_attribute {
            manifest["targetAttribute"] = json!(target);
        }
        if let Some(display_name) = &self.display_name {
            manifest["displayName"] = json!(display_name);
        }
        manifest
    }

    /// Write the package into `dir`, replacing whatever was there.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        if dir.exists() {
            fs::remove_dir_all(dir).unwrap();
        }
        fs::create_dir_all(dir.join("schema")).unwrap();
        fs::write(
            dir.join("package.json"),
            serde_json::to_string_pretty(&self.manifest()).unwrap(),
        )
        .unwrap();
        for (id, body) in &self.schemas {
            fs::write(
                dir.join("schema").join(format!("{id}.schema.json")),
                serde_json::to_string_pretty(body).unwrap(),
            )
            .unwrap();
        }
        dir.to_path_buf()
    }
}
