//! Plugin data model for Plugin Manager.
//!
//! This crate provides the catalog record types, declared dependencies,
//! version-range handling, the pure [`policy`] checks that gate every
//! mutating operation, and the manager configuration.

pub mod config;
pub mod dependency;
pub mod error;
pub mod name;
pub mod policy;
pub mod record;
pub mod version;

pub use config::{ManagerConfig, RunnerSettings};
pub use dependency::{DesiredDependency, PluginSource};
pub use error::{Error, PolicyError, Result};
pub use name::validate_plugin_name;
pub use record::{PluginRecord, PluginType};
pub use version::VersionConstraint;
