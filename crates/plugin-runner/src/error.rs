//! Error types for plugin-runner

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },

    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed (exit code {code:?}): {command}\n{stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("Invalid plugin source {spec}: {reason}")]
    InvalidSource { spec: String, reason: String },

    #[error("Plugin manifest not found in {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Plugin not installed: {name}")]
    NotInstalled { name: String },

    #[error("Filesystem error: {0}")]
    Fs(#[from] plugin_fs::Error),
}

impl Error {
    pub fn invalid_source(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            spec: spec.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_includes_stderr() {
        let err = Error::CommandFailed {
            command: "npm install adapt-contrib-text".to_string(),
            code: Some(1),
            stderr: "E404 not found".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("npm install adapt-contrib-text"));
        assert!(message.contains("E404"));
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout {
            command: "npm view x".to_string(),
            seconds: 30,
        };
        assert!(err.to_string().contains("30s"));
    }
}
