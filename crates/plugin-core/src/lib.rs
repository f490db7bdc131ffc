//! Plugin catalog and reconciliation engine for Plugin Manager
//!
//! This crate ties the lower layers together:
//!
//! - **Document store**: a minimal document-database interface with memory
//!   and file backends, and the typed [`PluginStore`] catalog on top of it
//! - **Schema bookkeeping**: which plugin contributed which schema fragment
//!   to the external [`SchemaRegistry`]
//! - **Usage index**: content documents that still reference a plugin
//! - **ReconciliationEngine**: install, update, uninstall and startup
//!   reconciliation, gated by the install policy from `plugin-meta`
//!
//! # Architecture
//!
//! ```text
//!                  plugin-cli
//!                      |
//!                 plugin-core
//!                      |
//!        +-------------+-------------+
//!        |             |             |
//!    plugin-fs    plugin-meta   plugin-runner
//! ```

pub mod engine;
pub mod error;
pub mod schema;
pub mod store;
pub mod usage;

pub use engine::{
    EngineSettings, InstallOptions, PluginOutcome, PluginState, PluginStatus, ReconcileReport,
    ReconciliationEngine,
};
pub use error::{Error, Result};
pub use schema::{MemorySchemaRegistry, RegisterOptions, SchemaContributions, SchemaRegistry};
pub use store::{DocumentStore, FileStore, Filter, MemoryStore, PluginStore};
pub use usage::{DocumentUsageIndex, UsageEntry, UsageIndex};
