use std::path::PathBuf;

/// Errors that can occur while reading plugin metadata and configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid semver version string.
    #[error("invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },

    /// Version range could not be parsed.
    #[error("invalid version constraint '{constraint}': {reason}")]
    VersionConstraintParse { constraint: String, reason: String },

    /// Invalid plugin name.
    #[error("invalid plugin name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Unknown plugin type string.
    #[error("unknown plugin type '{0}' (expected component, extension, menu, or theme)")]
    UnknownType(String),

    /// Framework version could not be determined.
    #[error("framework version not found: {reason}")]
    FrameworkVersion { reason: String },

    /// Configuration file error.
    #[error(transparent)]
    Fs(#[from] plugin_fs::Error),

    /// Configuration path could not be resolved.
    #[error("cannot resolve {what}: {path}")]
    UnresolvedPath { what: String, path: PathBuf },
}

/// Failures of the version/compatibility/attribute policy.
///
/// These are always raised before any external mutation takes place.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Candidate version is not newer than what is installed and `force` was not set.
    #[error("plugin '{name}' is already installed at {installed} (candidate {candidate})")]
    AlreadyExists {
        name: String,
        installed: String,
        candidate: String,
    },

    /// The running framework does not satisfy the plugin's declared range.
    #[error("plugin '{name}' requires framework {constraint} but {framework} is running")]
    Incompatible {
        name: String,
        constraint: String,
        framework: String,
    },

    /// The plugin declares no target attribute.
    #[error("plugin '{name}' does not declare a targetAttribute")]
    AttributeMissing { name: String },

    /// Another plugin already owns the target attribute.
    #[error("targetAttribute '{attribute}' is already used by '{owner}' (requested by '{claimant}')")]
    AttributeClash {
        attribute: String,
        owner: String,
        claimant: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
