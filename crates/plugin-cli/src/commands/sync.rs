//! Startup reconciliation command

use colored::Colorize;

use plugin_core::{PluginState, ReconcileReport, ReconciliationEngine};

use crate::error::{CliError, Result};

/// Run a reconciliation pass and print the report.
///
/// Exits with an error when any plugin failed or a schema could not be
/// registered, after the full report has been printed.
pub async fn run_sync(engine: &ReconciliationEngine, json: bool) -> Result<()> {
    if !json {
        println!("{} Reconciling plugins...", "=>".blue().bold());
    }

    let report = engine.reconcile().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.success() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "Reconciliation incomplete: {} plugin(s) failed, {} schema error(s)",
            report.failed().count(),
            report.schema_errors.len()
        )))
    }
}

fn print_report(report: &ReconcileReport) {
    if report.plugins.is_empty() {
        println!("   {}", "No plugins declared or installed.".dimmed());
    }

    for outcome in &report.plugins {
        let version = outcome.version.as_deref().unwrap_or("-");
        match outcome.state {
            PluginState::UpToDate => println!(
                "   {} {} {}",
                "OK".green().bold(),
                outcome.name.cyan(),
                version.dimmed()
            ),
            PluginState::Installed => println!(
                "   {} {} {}",
                "INSTALLED".green().bold(),
                outcome.name.cyan(),
                version
            ),
            _ => println!(
                "   {} {}: {}",
                "FAILED".red().bold(),
                outcome.name.cyan(),
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    println!();
    println!(
        "{} {} schema fragment(s) registered",
        "=>".blue().bold(),
        report.schemas_registered
    );
    for err in &report.schema_errors {
        println!("   {} {}", "!".red(), err);
    }
}
