// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of install, enable/disable and uninstall.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use modelplug_config::ModelplugConfig;
use modelplug_config::model::RegistryBackend;
use modelplug_core::{
    Credentials, DispatchError, ImplementationUnit, InstallError, ModelType, PluginStatus,
    PluginType, RuntimeError,
};
use modelplug_loader::{HostSurface, HostUnit};
use modelplug_runtime::{InstallOptions, PluginRuntime};
use modelplug_storage::{Database, SqliteRecordStore};
use modelplug_test_utils::bundle::{BundleBuilder, HEALTHY_UNIT_WAT, acme_bundle, model_manifest};
use modelplug_test_utils::{FaultyStore, MockFactory, chat_definition};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_in(dir: &Path, backend: RegistryBackend) -> ModelplugConfig {
    let mut config = ModelplugConfig::default();
    config.storage.backend = backend;
    config.storage.database_path = dir.join("registry.db").to_string_lossy().into_owned();
    config.storage.wal_mode = false;
    config.install.plugins_dir = dir.join("plugins").to_string_lossy().into_owned();
    config.install.icons_dir = dir.join("icons").to_string_lossy().into_owned();
    config.install.allow_private_hosts = true;
    config.install.download_timeout_secs = 2;
    config
}

async fn memory_runtime() -> (PluginRuntime, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let runtime = PluginRuntime::new(config_in(dir.path(), RegistryBackend::Memory))
        .await
        .unwrap();
    (runtime, dir)
}

fn acme_zip(id: &str, version: &str) -> Vec<u8> {
    acme_bundle(id, version).zip_bytes()
}

async fn faulty_runtime() -> (PluginRuntime, Arc<FaultyStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory().await.unwrap();
    let store = Arc::new(FaultyStore::new(Arc::new(SqliteRecordStore::new(db))));
    let runtime = PluginRuntime::with_store(
        config_in(dir.path(), RegistryBackend::Sqlite),
        HostSurface::new(),
        store.clone(),
    )
    .unwrap();
    (runtime, store, dir)
}

fn is_provider_disabled(err: &RuntimeError) -> bool {
    matches!(
        err,
        RuntimeError::Dispatch(DispatchError::ProviderDisabled { provider }) if provider == "acme"
    )
}

#[tokio::test]
async fn install_leaves_plugin_disabled() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();

    let info = admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    assert_eq!(info.status, PluginStatus::InstalledDisabled);
    assert!(!info.enabled);
    assert_eq!(info.main_implementation.as_deref(), Some("acme.AcmePlugin"));
    assert!(info.bundle_path.starts_with(&runtime.config().install.plugins_dir));

    let found = runtime.registry().find_by_plugin_id("acme").await.unwrap().unwrap();
    assert_eq!(found.status, PluginStatus::InstalledDisabled);

    let associations = runtime.registry().associations("acme").await.unwrap();
    assert_eq!(associations.services.len(), 1);
    assert_eq!(associations.services[0].provider_name, "acme");
    assert_eq!(associations.services[0].model_types, vec![ModelType::Chat]);
}

#[tokio::test]
async fn uninstall_twice_is_harmless() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    let info = admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    assert!(admin.uninstall("acme").await.unwrap());
    assert!(!admin.uninstall("acme").await.unwrap());
    assert!(!info.bundle_path.exists());
    assert_eq!(admin.get("acme").await.unwrap_err().kind(), "not_found");
}

#[tokio::test]
async fn enable_disable_enable_moves_enabled_at_forward() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    let first = admin.enable("acme").await.unwrap().unwrap();
    assert_eq!(first.status, PluginStatus::InstalledEnabled);
    assert!(runtime.lifecycle().instances().get("acme", "acme.AcmePlugin").is_some());
    assert!(admin.status("acme").await.unwrap().available);

    let disabled = admin.disable("acme").await.unwrap().unwrap();
    assert_eq!(disabled.status, PluginStatus::InstalledDisabled);
    assert!(disabled.disabled_at.unwrap() > first.enabled_at.unwrap());
    assert!(runtime.lifecycle().instances().units_of("acme").is_empty());
    assert!(!admin.status("acme").await.unwrap().available);

    let second = admin.enable("acme").await.unwrap().unwrap();
    assert_eq!(second.status, PluginStatus::InstalledEnabled);
    assert!(second.enabled_at.unwrap() > first.enabled_at.unwrap());
    assert!(second.enabled_at.unwrap() > disabled.disabled_at.unwrap());
}

#[tokio::test]
async fn repeated_and_unknown_toggles_are_no_ops() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    let still_disabled = admin.disable("acme").await.unwrap().unwrap();
    assert_eq!(still_disabled.status, PluginStatus::InstalledDisabled);
    assert!(still_disabled.disabled_at.is_none());

    let enabled = admin.enable("acme").await.unwrap().unwrap();
    let again = admin.enable("acme").await.unwrap().unwrap();
    assert_eq!(again.enabled_at, enabled.enabled_at);

    assert!(admin.enable("ghost").await.unwrap().is_none());
    assert!(admin.disable("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn model_plugin_without_providers_is_rejected() {
    let (runtime, dir) = memory_runtime().await;
    let manifest = model_manifest("acme", "1.0.0").replace("plugins:\n  - provider/acme.yaml\n", "plugins: []\n");
    let bytes = acme_bundle("acme", "1.0.0")
        .file("manifest.yaml", manifest)
        .zip_bytes();

    let err = runtime
        .admin()
        .install_upload(bytes, "acme.zip", InstallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");
    assert_eq!(runtime.registry().count_all().await.unwrap(), 0);

    let staging = dir.path().join("plugins").join(".staging");
    let leftovers = std::fs::read_dir(&staging).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn duplicate_install_keeps_first_record() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    let first = admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    let err = admin
        .install_upload(acme_zip("acme", "2.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "duplicate_plugin");

    let current = admin.get("acme").await.unwrap();
    assert_eq!(current.version, "1.0.0");
    assert_eq!(current.bundle_path, first.bundle_path);
    assert_eq!(current.installed_at, first.installed_at);
}

#[tokio::test]
async fn replace_swaps_the_bundle() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    let first = admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    admin.enable("acme").await.unwrap();

    let second = admin
        .install_upload(acme_zip("acme", "2.0.0"), "acme.zip", InstallOptions::replace())
        .await
        .unwrap();
    assert_eq!(second.version, "2.0.0");
    assert_eq!(second.status, PluginStatus::InstalledDisabled);
    assert_eq!(second.installed_at, first.installed_at);
    assert_ne!(second.bundle_path, first.bundle_path);
    assert!(!first.bundle_path.exists());
    assert!(!runtime.load_contexts().is_cached(&first.bundle_path));
    assert_eq!(runtime.registry().count_all().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_main_unit_fails_enable_without_state_change() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    let bytes = acme_bundle("acme", "1.0.0")
        .without("units/acme/AcmePlugin.wasm")
        .zip_bytes();
    let info = admin
        .install_upload(bytes, "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    let err = admin.enable("acme").await.unwrap_err();
    assert_eq!(err.kind(), "load_error");

    let current = admin.get("acme").await.unwrap();
    assert_eq!(current.status, PluginStatus::InstalledDisabled);
    assert!(current.enabled_at.is_none());
    assert!(!runtime.load_contexts().is_cached(&info.bundle_path));
    assert!(runtime.lifecycle().instances().is_empty());
}

#[tokio::test]
async fn uninstall_evicts_cached_adapters() {
    let (runtime, _dir) = memory_runtime().await;
    let factory = Arc::new(MockFactory::chat_only("acme"));
    runtime.dispatcher().register_factory(factory.clone());

    let admin = runtime.admin();
    admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    admin.enable("acme").await.unwrap();

    let definition = chat_definition("acme-chat", "acme");
    runtime
        .dispatcher()
        .create_chat_adapter(&definition, &Credentials::new())
        .await
        .unwrap();
    assert_eq!(runtime.dispatcher().cached_adapter_count(), 1);

    assert!(admin.uninstall("acme").await.unwrap());
    assert_eq!(runtime.dispatcher().cached_adapter_count(), 0);
    assert_eq!(factory.shutdowns(), 1);
    assert!(runtime.lifecycle().instances().is_empty());
    assert_eq!(runtime.load_contexts().instance_count(), 0);

    let err = runtime
        .dispatcher()
        .create_chat_adapter(&definition, &Credentials::new())
        .await
        .err()
        .unwrap();
    assert!(is_provider_disabled(&err));
    assert_eq!(factory.created(), 1);
    assert_eq!(runtime.dispatcher().cached_adapter_count(), 0);
}

#[tokio::test]
async fn disable_evicts_adapters_but_keeps_the_record() {
    let (runtime, _dir) = memory_runtime().await;
    let factory = Arc::new(MockFactory::chat_only("acme"));
    runtime.dispatcher().register_factory(factory.clone());
    let admin = runtime.admin();
    admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    admin.enable("acme").await.unwrap();
    runtime
        .dispatcher()
        .create_chat_adapter(&chat_definition("acme-chat", "acme"), &Credentials::new())
        .await
        .unwrap();

    admin.disable("acme").await.unwrap();
    assert_eq!(runtime.dispatcher().cached_adapter_count(), 0);
    assert_eq!(admin.list().await.unwrap().len(), 1);

    let definition = chat_definition("acme-chat", "acme");
    let err = runtime
        .dispatcher()
        .create_chat_adapter(&definition, &Credentials::new())
        .await
        .err()
        .unwrap();
    assert!(is_provider_disabled(&err));
    assert_eq!(factory.created(), 1);

    admin.enable("acme").await.unwrap();
    runtime
        .dispatcher()
        .create_chat_adapter(&definition, &Credentials::new())
        .await
        .unwrap();
    assert_eq!(factory.created(), 2);
}

#[tokio::test]
async fn installed_but_disabled_provider_serves_no_adapters() {
    let (runtime, _dir) = memory_runtime().await;
    let factory = Arc::new(MockFactory::chat_only("acme"));
    runtime.dispatcher().register_factory(factory.clone());
    runtime
        .admin()
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    let err = runtime
        .dispatcher()
        .create_chat_adapter(&chat_definition("acme-chat", "acme"), &Credentials::new())
        .await
        .err()
        .unwrap();
    assert!(is_provider_disabled(&err));
    assert_eq!(factory.created(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disable_does_not_wait_for_a_slow_enable() {
    let dir = tempfile::tempdir().unwrap();
    let host = HostSurface::new();
    host.register(
        "acme.AcmePlugin",
        Arc::new(|| {
            std::thread::sleep(Duration::from_millis(1500));
            Ok(Arc::new(HostUnit::new("acme.AcmePlugin", ())) as Arc<dyn ImplementationUnit>)
        }),
    );
    let runtime = Arc::new(
        PluginRuntime::with_host(config_in(dir.path(), RegistryBackend::Memory), host)
            .await
            .unwrap(),
    );
    runtime
        .admin()
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    let enabling = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.admin().enable("acme").await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    let disabled = tokio::time::timeout(Duration::from_millis(500), runtime.admin().disable("acme"))
        .await
        .expect("disable blocked behind the unit constructor")
        .unwrap()
        .unwrap();
    assert_eq!(disabled.status, PluginStatus::InstalledDisabled);

    let enabled = enabling.await.unwrap().unwrap().unwrap();
    assert_eq!(enabled.status, PluginStatus::InstalledEnabled);
    assert!(runtime.lifecycle().instances().get("acme", "acme.AcmePlugin").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn uninstall_during_slow_enable_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let host = HostSurface::new();
    host.register(
        "acme.AcmePlugin",
        Arc::new(|| {
            std::thread::sleep(Duration::from_millis(1000));
            Ok(Arc::new(HostUnit::new("acme.AcmePlugin", ())) as Arc<dyn ImplementationUnit>)
        }),
    );
    let runtime = Arc::new(
        PluginRuntime::with_host(config_in(dir.path(), RegistryBackend::Memory), host)
            .await
            .unwrap(),
    );
    let info = runtime
        .admin()
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    let enabling = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.admin().enable("acme").await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(runtime.admin().uninstall("acme").await.unwrap());

    assert!(enabling.await.unwrap().unwrap().is_none());
    assert!(runtime.lifecycle().instances().is_empty());
    assert!(!runtime.load_contexts().is_cached(&info.bundle_path));
    assert!(!runtime.dispatcher().is_provider_enabled("acme"));
}

#[tokio::test]
async fn path_install_uses_bundle_in_place() {
    let (runtime, dir) = memory_runtime().await;
    let bundle_dir = acme_bundle("acme", "1.0.0").write_dir(&dir.path().join("src-bundle"));

    let info = runtime
        .admin()
        .install_path(&bundle_dir, InstallOptions::default())
        .await
        .unwrap();
    assert_eq!(info.bundle_path, std::fs::canonicalize(&bundle_dir).unwrap());

    runtime.admin().uninstall("acme").await.unwrap();
    assert!(bundle_dir.join("manifest.yaml").exists());
}

#[tokio::test]
async fn url_install_downloads_the_bundle() {
    let (runtime, _dir) = memory_runtime().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bundles/acme.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(acme_zip("acme", "1.0.0")))
        .mount(&server)
        .await;

    let url = format!("{}/bundles/acme.zip", server.uri());
    let info = runtime
        .admin()
        .install_url(&url, None, InstallOptions::default())
        .await
        .unwrap();
    assert_eq!(info.plugin_id, "acme");
    assert!(info.bundle_path.ends_with("acme.zip"));
}

#[tokio::test]
async fn url_install_reports_http_errors() {
    let (runtime, _dir) = memory_runtime().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing.zip", server.uri());
    let err = runtime
        .admin()
        .install_url(&url, None, InstallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.root(),
        RuntimeError::Install(InstallError::Download { .. })
    ));
    assert_eq!(runtime.registry().count_all().await.unwrap(), 0);
}

#[tokio::test]
async fn url_install_times_out_on_stalled_server() {
    let (runtime, _dir) = memory_runtime().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(acme_zip("acme", "1.0.0"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let url = format!("{}/slow.zip", server.uri());
    let err = runtime
        .admin()
        .install_url(&url, None, InstallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.root(),
        RuntimeError::Install(InstallError::Timeout { .. })
    ));
    assert_eq!(runtime.registry().count_all().await.unwrap(), 0);
}

#[tokio::test]
async fn url_install_checks_pinned_digest() {
    let (runtime, _dir) = memory_runtime().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(acme_zip("acme", "1.0.0")))
        .mount(&server)
        .await;

    let url = format!("{}/acme.zip", server.uri());
    let err = runtime
        .admin()
        .install_url(&url, Some(&"0".repeat(64)), InstallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.root(),
        RuntimeError::Install(InstallError::ChecksumMismatch { .. })
    ));
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path(), RegistryBackend::Memory);
    config.install.max_bundle_bytes = 16;
    let runtime = PluginRuntime::new(config).await.unwrap();

    let err = runtime
        .admin()
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.root(),
        RuntimeError::Install(InstallError::TooLarge { limit: 16 })
    ));
}

#[tokio::test]
async fn unrecognized_bundle_is_an_install_error() {
    let (runtime, _dir) = memory_runtime().await;
    let bytes = BundleBuilder::new().file("readme.txt", "hello").zip_bytes();
    let err = runtime
        .admin()
        .install_upload(bytes, "junk.zip", InstallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.root(),
        RuntimeError::Install(InstallError::UnrecognizedFormat { .. })
    ));
}

#[tokio::test]
async fn marketplace_install_is_not_supported() {
    let (runtime, _dir) = memory_runtime().await;
    let err = runtime
        .admin()
        .install_marketplace("acme/openai:1.0.0")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_supported");
}

#[tokio::test]
async fn dependency_cycle_is_rejected() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();

    let tool_a = BundleBuilder::new()
        .file(
            "manifest.yaml",
            "id: tool-a\nname: Tool A\nversion: 1.0.0\nauthor: acme\ntype: TOOL\n\
             dependencies:\n  - plugin_id: tool-b\n    optional: true\n",
        )
        .zip_bytes();
    admin
        .install_upload(tool_a, "a.zip", InstallOptions::default())
        .await
        .unwrap();

    let tool_b = BundleBuilder::new()
        .file(
            "manifest.yaml",
            "id: tool-b\nname: Tool B\nversion: 1.0.0\nauthor: acme\ntype: TOOL\n\
             dependencies:\n  - plugin_id: tool-a\n",
        )
        .zip_bytes();
    let err = admin
        .install_upload(tool_b, "b.zip", InstallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");
    assert!(!runtime.registry().exists_by_plugin_id("tool-b").await.unwrap());
}

#[tokio::test]
async fn missing_required_dependency_is_rejected() {
    let (runtime, _dir) = memory_runtime().await;
    let bundle = BundleBuilder::new()
        .file(
            "manifest.yaml",
            "id: tool-a\nname: Tool A\nversion: 1.0.0\nauthor: acme\ntype: TOOL\n\
             dependencies:\n  - plugin_id: base\n    min_version: 2.0.0\n",
        )
        .zip_bytes();
    let err = runtime
        .admin()
        .install_upload(bundle, "a.zip", InstallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");
}

#[tokio::test]
async fn stats_count_plugins_by_type() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    admin
        .install_upload(acme_zip("other", "1.0.0"), "other.zip", InstallOptions::default())
        .await
        .unwrap();
    let tool = BundleBuilder::new()
        .file(
            "manifest.yaml",
            "id: search\nname: Search\nversion: 0.1.0\nauthor: acme\ntype: TOOL\nplugin_class: search.Main\n",
        )
        .wasm("units/search/Main.wasm", HEALTHY_UNIT_WAT)
        .zip_bytes();
    admin
        .install_upload(tool, "search.zip", InstallOptions::default())
        .await
        .unwrap();
    admin.enable("acme").await.unwrap();

    let stats = admin.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.enabled, 1);
    assert_eq!(stats.disabled, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.by_type.get(&PluginType::Model), Some(&2));
    assert_eq!(stats.by_type.get(&PluginType::Tool), Some(&1));

    let enabled = admin.list_enabled().await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].plugin_id, "acme");
}

#[tokio::test]
async fn icon_is_stored_and_served() {
    let (runtime, dir) = memory_runtime().await;
    let admin = runtime.admin();
    admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();

    let icon = admin.icon("acme").await.unwrap();
    assert_eq!(icon.content_type, "image/svg+xml");
    assert!(icon.bytes.starts_with(b"<svg"));
    assert_eq!(
        admin.icon_path("acme").await.unwrap().as_deref(),
        Some("/plugins/acme/icon")
    );

    admin.uninstall("acme").await.unwrap();
    assert!(!dir.path().join("icons").join("acme").exists());
    assert_eq!(admin.icon_path("acme").await.unwrap_err().kind(), "not_found");
}

#[tokio::test]
async fn ids_that_differ_only_in_punctuation_keep_separate_icons() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    admin
        .install_upload(acme_zip("acme/x", "1.0.0"), "x.zip", InstallOptions::default())
        .await
        .unwrap();
    admin
        .install_upload(acme_zip("acme_x", "1.0.0"), "x.zip", InstallOptions::default())
        .await
        .unwrap();

    assert!(admin.uninstall("acme_x").await.unwrap());

    let icon = admin.icon("acme/x").await.unwrap();
    assert!(icon.bytes.starts_with(b"<svg"));
    assert_eq!(
        admin.icon_path("acme/x").await.unwrap().as_deref(),
        Some("/plugins/acme%2Fx/icon")
    );
    assert!(admin.get("acme/x").await.unwrap().bundle_path.exists());
}

#[tokio::test]
async fn failed_replace_restores_the_previous_record() {
    let (runtime, store, _dir) = faulty_runtime().await;
    let admin = runtime.admin();
    let first = admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    admin.enable("acme").await.unwrap();

    store.fail_associations(true);
    let err = admin
        .install_upload(acme_zip("acme", "2.0.0"), "acme.zip", InstallOptions::replace())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_error");
    store.fail_associations(false);

    let current = admin.get("acme").await.unwrap();
    assert_eq!(current.version, "1.0.0");
    assert_eq!(current.bundle_path, first.bundle_path);
    assert_eq!(current.icon_path, first.icon_path);
    assert_eq!(current.status, PluginStatus::InstalledEnabled);
    assert!(first.bundle_path.exists());
    assert_eq!(runtime.registry().associations("acme").await.unwrap().services.len(), 1);
    assert!(runtime.lifecycle().instances().get("acme", "acme.AcmePlugin").is_some());
    assert!(runtime.dispatcher().is_provider_enabled("acme"));
    assert_eq!(admin.icon("acme").await.unwrap().content_type, "image/svg+xml");

    let generations = std::fs::read_dir(first.bundle_path.parent().unwrap().parent().unwrap())
        .unwrap()
        .count();
    assert_eq!(generations, 1);
}

#[tokio::test]
async fn failed_fresh_install_leaves_no_record() {
    let (runtime, store, _dir) = faulty_runtime().await;
    store.fail_associations(true);
    let err = runtime
        .admin()
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_error");
    assert!(!runtime.registry().exists_by_plugin_id("acme").await.unwrap());
}

#[tokio::test]
async fn failed_uninstall_keeps_record_and_files() {
    let (runtime, store, _dir) = faulty_runtime().await;
    let admin = runtime.admin();
    let info = admin
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    admin.enable("acme").await.unwrap();

    store.fail_delete(true);
    let err = admin.uninstall("acme").await.unwrap_err();
    assert_eq!(err.kind(), "storage_error");

    let current = admin.get("acme").await.unwrap();
    assert_eq!(current.status, PluginStatus::InstalledEnabled);
    assert!(info.bundle_path.exists());
    assert!(admin.icon("acme").await.is_ok());
    assert!(admin.status("acme").await.unwrap().available);
    assert!(runtime.dispatcher().is_provider_enabled("acme"));

    store.fail_delete(false);
    assert!(admin.uninstall("acme").await.unwrap());
    assert!(!info.bundle_path.exists());
}

#[tokio::test]
async fn missing_icon_does_not_fail_install() {
    let (runtime, _dir) = memory_runtime().await;
    let admin = runtime.admin();
    let bytes = acme_bundle("acme", "1.0.0").without("_assets/icon.svg").zip_bytes();
    let info = admin
        .install_upload(bytes, "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    assert!(info.icon_path.is_none());
    assert_eq!(admin.icon_path("acme").await.unwrap(), None);
    assert_eq!(admin.icon("acme").await.unwrap_err().kind(), "not_found");
}

#[tokio::test]
async fn durable_runtime_restores_enabled_plugins() {
    let dir = tempfile::tempdir().unwrap();
    let bundle_dir = acme_bundle("acme", "1.0.0").write_dir(&dir.path().join("acme-bundle"));

    {
        let runtime = PluginRuntime::new(config_in(dir.path(), RegistryBackend::Sqlite))
            .await
            .unwrap();
        runtime
            .admin()
            .install_path(&bundle_dir, InstallOptions::default())
            .await
            .unwrap();
        runtime.admin().enable("acme").await.unwrap();
    }

    let (runtime, report) = PluginRuntime::start(config_in(dir.path(), RegistryBackend::Sqlite))
        .await
        .unwrap();
    assert_eq!(report.restored, vec!["acme".to_string()]);
    assert!(report.failed.is_empty());
    assert!(runtime.admin().status("acme").await.unwrap().available);
}

#[tokio::test]
async fn plugins_that_no_longer_load_are_marked_failed() {
    let dir = tempfile::tempdir().unwrap();
    let bundle_dir = acme_bundle("acme", "1.0.0").write_dir(&dir.path().join("acme-bundle"));

    {
        let runtime = PluginRuntime::new(config_in(dir.path(), RegistryBackend::Sqlite))
            .await
            .unwrap();
        runtime
            .admin()
            .install_path(&bundle_dir, InstallOptions::default())
            .await
            .unwrap();
        runtime.admin().enable("acme").await.unwrap();
    }
    std::fs::remove_file(bundle_dir.join("units/acme/AcmeProvider.wasm")).unwrap();

    let (runtime, report) = PluginRuntime::start(config_in(dir.path(), RegistryBackend::Sqlite))
        .await
        .unwrap();
    assert_eq!(report.failed, vec!["acme".to_string()]);

    let admin = runtime.admin();
    let record = admin.get("acme").await.unwrap();
    assert_eq!(record.status, PluginStatus::Failed);
    assert!(!record.enabled);
    assert!(record.last_error.is_some());
    assert_eq!(admin.stats().await.unwrap().failed, 1);
    assert_eq!(admin.enable("acme").await.unwrap_err().kind(), "invalid_transition");

    assert!(admin.uninstall("acme").await.unwrap());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn install_logs_plugin_id() {
    let (runtime, _dir) = memory_runtime().await;
    runtime
        .admin()
        .install_upload(acme_zip("acme", "1.0.0"), "acme.zip", InstallOptions::default())
        .await
        .unwrap();
    assert!(logs_contain("plugin installed"));
    assert!(logs_contain("plugin_id=acme"));
}
