//! Shared test utilities for the plugin-manager workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each hand-roll plugin directories. It is a dev-dependency only, never
//! published.
//!
//! # Modules
//!
//! - [`package`]: [`PluginPackage`] builder writing plugin directories
//! - [`runner`]: [`FakeRunner`], a scripted in-process package manager
//! - [`framework`]: [`TestFramework`] temporary installation layout

pub mod framework;
pub mod package;
pub mod runner;

pub use framework::{FRAMEWORK_VERSION, TestFramework};
pub use package::PluginPackage;
pub use runner::{Call, FakeRunner};
