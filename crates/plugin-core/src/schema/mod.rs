//! Schema registration bookkeeping.
//!
//! Plugins ship JSON-schema fragments under `schema/*.schema.json`. The
//! registry service itself is external ([`SchemaRegistry`]); this module
//! remembers which plugin contributed which fragment so an uninstall or an
//! update removes exactly that plugin's schemas and nobody else's.

mod contributions;
mod fragment;
mod registry;
mod tracker;

pub use contributions::SchemaContributions;
pub use fragment::SchemaFragment;
pub use registry::{MemorySchemaRegistry, RegisterOptions, SchemaRegistry};
pub use tracker::SchemaTracker;
