//! Update, uninstall, usage and list commands

use colored::Colorize;

use plugin_core::{Error as CoreError, ReconciliationEngine};

use crate::error::{CliError, Result};

pub async fn run_update(engine: &ReconciliationEngine, id: &str) -> Result<()> {
    let before = engine.plugins().get(id).await?;
    println!(
        "{} Updating {}...",
        "=>".blue().bold(),
        before.name.cyan()
    );

    let after = engine.update(id).await?;
    if after.version == before.version {
        println!("{} {} is up to date ({})", "OK".green().bold(), after.name, after.version);
    } else {
        println!(
            "{} {} {} -> {}",
            "OK".green().bold(),
            after.name,
            before.version.dimmed(),
            after.version.green()
        );
    }
    Ok(())
}

pub async fn run_uninstall(engine: &ReconciliationEngine, id: &str) -> Result<()> {
    match engine.uninstall(id).await {
        Ok(()) => {
            println!("{} Plugin uninstalled.", "OK".green().bold());
            Ok(())
        }
        Err(CoreError::InUse { name, usage }) => {
            println!(
                "{} {} is still used by:",
                "IN USE".yellow().bold(),
                name.cyan()
            );
            for entry in &usage {
                println!("   {} {}", "-".yellow(), entry.title);
            }
            Err(CliError::user(format!(
                "Remove {name} from {} course(s) before uninstalling",
                usage.len()
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn run_usage(engine: &ReconciliationEngine, id: &str) -> Result<()> {
    let usage = engine.usage(id).await?;
    if usage.is_empty() {
        println!("{}", "Not used by any course.".dimmed());
        return Ok(());
    }
    for entry in &usage {
        println!("{}", entry.title);
    }
    Ok(())
}

pub async fn run_list(engine: &ReconciliationEngine) -> Result<()> {
    let statuses = engine.list().await?;
    if statuses.is_empty() {
        println!("{}", "No plugins installed.".dimmed());
        return Ok(());
    }

    for status in &statuses {
        let record = &status.record;
        let mut line = format!(
            "{} {} {} {}",
            record.id_str().dimmed(),
            record.name.cyan(),
            record.version,
            record.plugin_type.as_str().dimmed()
        );
        if record.is_local() {
            line.push_str(&format!(" {}", "[local]".dimmed()));
        }
        if status.has_drift() {
            let disk = status.installed_version.as_deref().unwrap_or("missing");
            line.push_str(&format!(" {}", format!("(disk: {disk})").red()));
        }
        if let Some(latest) = status.latest_version.as_ref().filter(|_| status.can_be_updated) {
            line.push_str(&format!(" {}", format!("-> {latest}").yellow()));
        }
        println!("{line}");
    }
    Ok(())
}
