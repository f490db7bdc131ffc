//! Error types for plugin-core

use std::path::PathBuf;

use crate::usage::UsageEntry;

/// Result type for plugin-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in plugin-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An install precondition failed; nothing was mutated
    #[error(transparent)]
    Policy(#[from] plugin_meta::PolicyError),

    /// The package manager reported a failure
    #[error(transparent)]
    Runner(#[from] plugin_runner::Error),

    #[error(transparent)]
    Meta(#[from] plugin_meta::Error),

    #[error("Invalid plugin source {spec}: {reason}")]
    InvalidSource { spec: String, reason: String },

    /// Uninstall refused while content documents reference the plugin
    #[error("Plugin {name} is used by {}: {}", .usage.len(), usage_titles(.usage))]
    InUse { name: String, usage: Vec<UsageEntry> },

    /// Strict bulk install: every per-plugin failure, in request order
    #[error("{} plugin install(s) failed: {}", .failures.len(), failed_names(.failures))]
    AggregateInstallFailure { failures: Vec<(String, Error)> },

    /// Uninstall attempted every step; these ones failed
    #[error("Uninstall of {name} incomplete: {}", .failures.join("; "))]
    PartialUninstall { name: String, failures: Vec<String> },

    #[error("Cached source for local plugin {name} is missing at {path}")]
    MissingCache { name: String, path: PathBuf },

    #[error("Plugin not found: {id}")]
    NotFound { id: String },

    #[error("Duplicate value for unique field {field} in {collection}: {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    #[error("Schema {id} is owned by {owner}, cannot be registered for {claimant}")]
    SchemaConflict {
        id: String,
        owner: String,
        claimant: String,
    },

    #[error("Invalid schema at {path}: {reason}")]
    Schema { path: PathBuf, reason: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error(transparent)]
    Fs(#[from] plugin_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_source(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

fn usage_titles(usage: &[UsageEntry]) -> String {
    usage
        .iter()
        .map(|u| u.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn failed_names(failures: &[(String, Error)]) -> String {
    failures
        .iter()
        .map(|(name, e)| format!("{name} ({e})"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugin_meta::PolicyError;

    #[test]
    fn test_policy_error_is_transparent() {
        let err: Error = PolicyError::AttributeMissing {
            name: "adapt-contrib-text".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            PolicyError::AttributeMissing {
                name: "adapt-contrib-text".into()
            }
            .to_string()
        );
    }

    #[test]
    fn test_in_use_lists_titles() {
        let err = Error::InUse {
            name: "adapt-contrib-text".into(),
            usage: vec![
                UsageEntry {
                    title: "Onboarding".into(),
                },
                UsageEntry {
                    title: "Safety 101".into(),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("Onboarding, Safety 101"));
        assert!(message.contains("used by 2"));
    }

    #[test]
    fn test_aggregate_names_every_failure() {
        let err = Error::AggregateInstallFailure {
            failures: vec![
                ("a".into(), Error::NotFound { id: "a".into() }),
                ("c".into(), Error::store("locked")),
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("2 plugin install(s) failed"));
        assert!(message.contains("a (Plugin not found: a)"));
        assert!(message.contains("c (Store error: locked)"));
    }
}
