//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Plugin Manager - Install and reconcile content plugins for a framework
#[derive(Parser, Debug)]
#[command(name = "pluginctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the manager configuration
    #[arg(short, long, global = true, env = "PLUGINCTL_CONFIG", default_value = "plugins.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Reconcile the catalog, declared dependencies and installed plugins
    Sync {
        /// Output the report as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Install plugins from the registry or a local directory
    ///
    /// Examples:
    ///   pluginctl install adapt-contrib-text
    ///   pluginctl install adapt-contrib-text@5.0.1 adapt-contrib-gmcq
    ///   pluginctl install --path ./uploads/my-menu
    Install {
        /// Registry specs (`name` or `name@version`)
        specs: Vec<String>,

        /// Local plugin directories
        #[arg(long = "path", value_name = "DIR")]
        paths: Vec<PathBuf>,

        /// Replace an installed plugin with any version, including older ones
        #[arg(short, long)]
        force: bool,

        /// Fail if any plugin fails to install
        #[arg(long)]
        strict: bool,
    },

    /// Update a plugin to its newest compatible version
    Update {
        /// Catalog id of the plugin
        id: String,
    },

    /// Uninstall a plugin that no course uses
    Uninstall {
        /// Catalog id of the plugin
        id: String,
    },

    /// Show the courses that use a plugin
    Usage {
        /// Catalog id of the plugin
        id: String,
    },

    /// List installed plugins
    List,
}
