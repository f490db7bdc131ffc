//! Package-manager runner for Plugin Manager.
//!
//! This crate wraps the external package manager behind the
//! [`PackageRunner`] trait and normalizes whatever it leaves on disk into
//! [`InstallResult`] / [`InstallInfo`] values with an explicit plugin type.

pub mod command;
pub mod error;
pub mod manifest;
pub mod runner;
pub mod scan;

pub use command::CommandRunner;
pub use error::{Error, Result};
pub use manifest::PluginManifest;
pub use runner::{InstallInfo, InstallResult, PackageRunner};
