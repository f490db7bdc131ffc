//! Plugin Manager CLI
//!
//! Installs, updates and reconciles the content plugins of a framework
//! installation through the configured package manager.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(cmd) = cli.command else {
        println!("{} Plugin Manager CLI", "pluginctl".green().bold());
        println!();
        println!("Run {} for available commands.", "pluginctl --help".cyan());
        return Ok(());
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute_command(&cli.config, cmd))
}

/// Logs go to stderr so `sync --json` output stays parseable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

async fn execute_command(config: &std::path::Path, cmd: Commands) -> Result<()> {
    let engine = context::open_engine(config).await?;
    match cmd {
        Commands::Sync { json } => commands::run_sync(&engine, json).await,
        Commands::Install {
            specs,
            paths,
            force,
            strict,
        } => {
            engine.rebuild_schemas().await?;
            commands::run_install(&engine, &specs, &paths, force, strict).await
        }
        Commands::Update { id } => {
            engine.rebuild_schemas().await?;
            commands::run_update(&engine, &id).await
        }
        Commands::Uninstall { id } => {
            engine.rebuild_schemas().await?;
            commands::run_uninstall(&engine, &id).await
        }
        Commands::Usage { id } => commands::run_usage(&engine, &id).await,
        Commands::List => commands::run_list(&engine).await,
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_cli_error_user() {
        let error = crate::error::CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }
}
