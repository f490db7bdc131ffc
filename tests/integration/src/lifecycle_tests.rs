//! Full plugin lifecycle over the file-backed catalog.
//!
//! Each "restart" builds a fresh engine from the same configuration, the
//! same on-disk catalog and an empty schema registry, the way a framework
//! process would on boot.

use std::sync::Arc;

use plugin_core::{
    DocumentStore, DocumentUsageIndex, EngineSettings, Error, FileStore, InstallOptions,
    MemorySchemaRegistry, PluginState, PluginStore, ReconciliationEngine,
};
use plugin_meta::{ManagerConfig, PluginSource, PluginType};
use plugin_test_utils::{FakeRunner, PluginPackage, TestFramework};
use pretty_assertions::assert_eq;
use serde_json::json;

struct Boot {
    engine: ReconciliationEngine,
    registry: Arc<MemorySchemaRegistry>,
    docs: Arc<FileStore>,
}

async fn boot(config: &ManagerConfig, runner: &Arc<FakeRunner>) -> Boot {
    let settings = EngineSettings::from_config(config).unwrap();
    let docs = Arc::new(FileStore::new(config.store_path().unwrap()));
    let plugins = PluginStore::open(docs.clone()).await.unwrap();
    let registry = Arc::new(MemorySchemaRegistry::new());
    let engine = ReconciliationEngine::new(
        settings,
        runner.clone(),
        plugins,
        registry.clone(),
        Arc::new(DocumentUsageIndex::new(docs.clone())),
    );
    Boot {
        engine,
        registry,
        docs,
    }
}

fn text(version: &str) -> PluginPackage {
    PluginPackage::new("adapt-contrib-text", version)
        .target("_text")
        .framework(">=5")
        .schema("text")
}

fn gmcq(version: &str) -> PluginPackage {
    PluginPackage::new("adapt-contrib-gmcq", version)
        .target("_gmcq")
        .schema("gmcq")
}

#[tokio::test]
async fn test_first_boot_seeds_then_restart_is_stable() {
    let fw = TestFramework::new();
    let mut config = fw.config();
    config
        .dependencies
        .insert("adapt-contrib-text".to_string(), "^5.0.0".to_string());
    config
        .dependencies
        .insert("adapt-contrib-gmcq".to_string(), "^6.0.0".to_string());

    let runner = Arc::new(fw.runner());
    runner.publish(text("5.0.1"));
    runner.publish(gmcq("6.1.0"));

    let first = boot(&config, &runner).await;
    let report = first.engine.reconcile().await.unwrap();
    assert!(report.success(), "{report:?}");
    assert_eq!(report.state_of("adapt-contrib-text"), Some(PluginState::Installed));
    assert_eq!(report.schemas_registered, 2);
    drop(first);

    let installs = runner.install_calls();
    let second = boot(&config, &runner).await;
    let report = second.engine.reconcile().await.unwrap();

    assert!(report.success());
    assert_eq!(report.state_of("adapt-contrib-text"), Some(PluginState::UpToDate));
    assert_eq!(report.state_of("adapt-contrib-gmcq"), Some(PluginState::UpToDate));
    assert_eq!(runner.install_calls(), installs);
    assert_eq!(
        second.registry.ids().await,
        vec!["gmcq".to_string(), "text".to_string()]
    );
}

#[tokio::test]
async fn test_wiped_plugin_dir_is_restored_at_recorded_versions() {
    let fw = TestFramework::new();
    let config = fw.config();
    let runner = Arc::new(fw.runner());
    runner.publish(text("5.0.1"));
    runner.publish(text("5.2.0"));

    let first = boot(&config, &runner).await;
    first
        .engine
        .install(&PluginSource::registry("adapt-contrib-text", Some("5.0.1")), false)
        .await
        .unwrap();
    let upload = fw.upload(
        &PluginPackage::new("adapt-local-menu", "0.3.0")
            .plugin_type(PluginType::Menu)
            .target("_localMenu"),
    );
    first
        .engine
        .install(&PluginSource::local(&upload), false)
        .await
        .unwrap();
    drop(first);

    // Framework upgrade wipes the live plugin directory and the upload
    std::fs::remove_dir_all(fw.plugins_dir()).unwrap();
    std::fs::remove_dir_all(&upload).unwrap();

    let second = boot(&config, &runner).await;
    let report = second.engine.reconcile().await.unwrap();

    assert!(report.success(), "{report:?}");
    assert_eq!(report.state_of("adapt-contrib-text"), Some(PluginState::Installed));
    assert_eq!(report.state_of("adapt-local-menu"), Some(PluginState::Installed));

    let restored = second
        .engine
        .plugins()
        .find_by_name("adapt-contrib-text")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.version, "5.0.1");
    assert!(runner.is_installed("adapt-local-menu"));
    assert_eq!(second.engine.plugins().all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_usage_blocks_uninstall_across_restart() {
    let fw = TestFramework::new();
    let config = fw.config();
    let runner = Arc::new(fw.runner());
    runner.publish(gmcq("6.1.0"));

    let first = boot(&config, &runner).await;
    let record = first
        .engine
        .install(&PluginSource::registry("adapt-contrib-gmcq", None), false)
        .await
        .unwrap();

    let course = first
        .docs
        .insert(
            "courses",
            json!({ "title": "Onboarding" }).as_object().cloned().unwrap(),
        )
        .await
        .unwrap();
    first
        .docs
        .insert(
            "configs",
            json!({ "_courseId": course["_id"], "_enabledPlugins": ["adapt-contrib-gmcq"] })
                .as_object()
                .cloned()
                .unwrap(),
        )
        .await
        .unwrap();
    drop(first);

    let second = boot(&config, &runner).await;
    second.engine.rebuild_schemas().await.unwrap();

    let err = second.engine.uninstall(record.id_str()).await.unwrap_err();
    match err {
        Error::InUse { name, usage } => {
            assert_eq!(name, "adapt-contrib-gmcq");
            assert_eq!(usage[0].title, "Onboarding");
        }
        other => panic!("expected InUse, got {other:?}"),
    }
    assert!(runner.is_installed("adapt-contrib-gmcq"));
    assert_eq!(second.registry.ids().await, vec!["gmcq".to_string()]);

    // Course stops using the plugin
    second
        .docs
        .delete("configs", &plugin_core::Filter::all())
        .await
        .unwrap();
    second.engine.uninstall(record.id_str()).await.unwrap();

    assert!(!runner.is_installed("adapt-contrib-gmcq"));
    assert!(second.registry.ids().await.is_empty());

    let third = boot(&config, &runner).await;
    assert!(third.engine.plugins().is_empty().await.unwrap());
}

#[tokio::test]
async fn test_bulk_install_persists_only_successes() {
    let fw = TestFramework::new();
    let config = fw.config();
    let runner = Arc::new(fw.runner());
    runner.publish(PluginPackage::new("a", "1.0.0"));
    runner.publish(PluginPackage::new("b", "2.0.0"));
    runner.fail_install("a", "npm ERR! code E500");

    let first = boot(&config, &runner).await;
    let installed = first
        .engine
        .install_many(
            &[
                PluginSource::registry("a", Some("1.0.0")),
                PluginSource::registry("b", Some("2.0.0")),
            ],
            InstallOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].name, "b");
    drop(first);

    let second = boot(&config, &runner).await;
    let names: Vec<String> = second
        .engine
        .plugins()
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["b".to_string()]);
}

#[tokio::test]
async fn test_catalog_file_keeps_unique_indexes() {
    let fw = TestFramework::new();
    let config = fw.config();
    let runner = Arc::new(fw.runner());
    runner.publish(text("5.0.1"));

    let first = boot(&config, &runner).await;
    first
        .engine
        .install(&PluginSource::registry("adapt-contrib-text", None), false)
        .await
        .unwrap();

    let raw = plugin_fs::io::read_text(&fw.store_dir().join("contentplugins.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["unique"], json!(["displayName", "name"]));
    assert_eq!(value["documents"][0]["name"], "adapt-contrib-text");
    assert_eq!(value["documents"][0]["targetAttribute"], "_text");
}
