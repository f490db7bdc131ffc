//! Filesystem helpers for Plugin Manager
//!
//! Provides locked, atomic file I/O for the catalog store, format-agnostic
//! configuration loading, and the recursive copy used to keep durable
//! copies of locally-installed plugin sources.

pub mod config;
pub mod copy;
pub mod error;
pub mod io;

pub use config::ConfigStore;
pub use copy::{copy_dir, move_dir, remove_dir};
pub use error::{Error, Result};
