//! Engine construction from the manager configuration

use std::path::Path;
use std::sync::Arc;

use plugin_core::{
    DocumentStore, DocumentUsageIndex, EngineSettings, FileStore, MemorySchemaRegistry,
    PluginStore, ReconciliationEngine,
};
use plugin_meta::ManagerConfig;
use plugin_runner::CommandRunner;

use crate::error::{CliError, Result};

/// Load `config_path` and wire an engine over the file-backed catalog and
/// the configured package manager.
pub async fn open_engine(config_path: &Path) -> Result<ReconciliationEngine> {
    if !config_path.exists() {
        return Err(CliError::user(format!(
            "Configuration not found at {} (use --config or PLUGINCTL_CONFIG)",
            config_path.display()
        )));
    }

    let config = ManagerConfig::load(config_path)?;
    let settings = EngineSettings::from_config(&config)?;
    let store_dir = config.store_path()?;
    tracing::debug!(
        framework = %settings.framework_version,
        store = %store_dir.display(),
        cache = %settings.cache_dir.display(),
        "Opening engine"
    );

    let docs: Arc<dyn DocumentStore> = Arc::new(FileStore::new(store_dir));
    let plugins = PluginStore::open(docs.clone()).await?;
    let runner = Arc::new(CommandRunner::from_config(
        &config,
        settings.framework_version.clone(),
    ));

    Ok(ReconciliationEngine::new(
        settings,
        runner,
        plugins,
        Arc::new(MemorySchemaRegistry::new()),
        Arc::new(DocumentUsageIndex::new(docs)),
    ))
}
