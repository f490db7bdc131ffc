//! Which content documents reference a plugin

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::store::{DocumentStore, Filter, ID_FIELD};

/// Course configuration documents, one per course.
pub const CONFIG_COLLECTION: &str = "configs";
pub const COURSE_COLLECTION: &str = "courses";

/// A content document that enables a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub title: String,
}

/// Read-only lookup consulted before an uninstall.
#[async_trait]
pub trait UsageIndex: Send + Sync {
    async fn find_usage(&self, plugin_name: &str) -> Result<Vec<UsageEntry>>;
}

/// Joins config documents listing the plugin in `_enabledPlugins` with
/// their parent course through `_courseId`.
#[derive(Clone)]
pub struct DocumentUsageIndex {
    store: Arc<dyn DocumentStore>,
}

impl DocumentUsageIndex {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UsageIndex for DocumentUsageIndex {
    async fn find_usage(&self, plugin_name: &str) -> Result<Vec<UsageEntry>> {
        let configs = self
            .store
            .find(CONFIG_COLLECTION, &Filter::eq("_enabledPlugins", plugin_name))
            .await?;

        let mut usage = Vec::new();
        for config in configs {
            let Some(course_id) = config.get("_courseId").filter(|v| !v.is_null()) else {
                continue;
            };
            let courses = self
                .store
                .find(COURSE_COLLECTION, &Filter::eq(ID_FIELD, course_id.clone()))
                .await?;
            usage.extend(courses.into_iter().map(|course| UsageEntry {
                title: course
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }));
        }

        tracing::debug!(plugin = %plugin_name, references = usage.len(), "Usage lookup");
        Ok(usage)
    }
}
