//! Install command

use std::path::PathBuf;

use colored::Colorize;

use plugin_core::{InstallOptions, ReconciliationEngine};
use plugin_meta::PluginSource;

use crate::error::{CliError, Result};

/// Install registry specs and local directories in one batch.
pub async fn run_install(
    engine: &ReconciliationEngine,
    specs: &[String],
    paths: &[PathBuf],
    force: bool,
    strict: bool,
) -> Result<()> {
    let sources = collect_sources(specs, paths)?;

    println!(
        "{} Installing {} plugin(s)...",
        "=>".blue().bold(),
        sources.len()
    );

    let installed = engine
        .install_many(&sources, InstallOptions { force, strict })
        .await?;

    for record in &installed {
        println!(
            "   {} {}@{} ({})",
            "+".green(),
            record.name.cyan(),
            record.version,
            record.plugin_type.as_str().dimmed()
        );
    }

    let failed = sources.len() - installed.len();
    if failed > 0 {
        return Err(CliError::user(format!(
            "{failed} of {} install(s) failed",
            sources.len()
        )));
    }

    println!("{} Done.", "OK".green().bold());
    Ok(())
}

fn collect_sources(specs: &[String], paths: &[PathBuf]) -> Result<Vec<PluginSource>> {
    let mut sources: Vec<PluginSource> = specs.iter().map(|s| PluginSource::parse_spec(s)).collect();
    for path in paths {
        let abs = std::path::absolute(path)?;
        if !abs.is_dir() {
            return Err(CliError::user(format!(
                "Local plugin path is not a directory: {}",
                path.display()
            )));
        }
        sources.push(PluginSource::local(abs));
    }

    if sources.is_empty() {
        return Err(CliError::user(
            "Nothing to install. Pass a registry spec or --path <DIR>.",
        ));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_sources_requires_input() {
        let err = collect_sources(&[], &[]).unwrap_err();
        assert!(err.to_string().contains("Nothing to install"));
    }

    #[test]
    fn test_collect_sources_mixed() {
        let dir = TempDir::new().unwrap();
        let sources = collect_sources(
            &["adapt-contrib-text@5.0.1".to_string()],
            &[dir.path().to_path_buf()],
        )
        .unwrap();

        assert_eq!(sources.len(), 2);
        assert!(!sources[0].is_local());
        assert!(sources[1].is_local());
    }

    #[test]
    fn test_collect_sources_rejects_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = collect_sources(&[], &[dir.path().join("nope")]).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
