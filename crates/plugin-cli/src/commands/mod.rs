//! Command implementations for plugin-cli

pub mod install;
pub mod manage;
pub mod sync;

pub use install::run_install;
pub use manage::{run_list, run_uninstall, run_update, run_usage};
pub use sync::run_sync;
