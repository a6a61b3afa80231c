// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SqliteRecordStore behaviour against a real database file.

use chrono::Duration;
use modelplug_core::{
    Dependency, DependencyKind, Extension, ModelType, PluginAssociations, PluginFilter, PluginInfo,
    PluginStatus, PluginType, RecordStore, ServiceRecord,
};
use modelplug_storage::{Database, SqliteRecordStore};

async fn store() -> (tempfile::TempDir, SqliteRecordStore) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("registry.db"), true).await.unwrap();
    (dir, SqliteRecordStore::new(db))
}

fn plugin(id: &str, plugin_type: PluginType) -> PluginInfo {
    PluginInfo::new(id, id, "1.0.0", plugin_type, format!("/plugins/{id}"))
}

fn associations(id: &str) -> PluginAssociations {
    PluginAssociations {
        dependencies: vec![Dependency {
            plugin_id: "base".into(),
            version: Some("^1".into()),
            min_version: None,
            max_version: None,
            optional: false,
            kind: DependencyKind::Runtime,
        }],
        extensions: vec![Extension {
            extension_point: "model.provider".into(),
            implementation: "acme.AcmeProvider".into(),
            ordering: 10,
            active: true,
            config: serde_json::json!({"region": "eu"}),
        }],
        services: vec![ServiceRecord {
            plugin_id: id.into(),
            provider_name: "acme".into(),
            provider_implementation: "acme.AcmeProvider".into(),
            model_types: vec![ModelType::Chat, ModelType::Embedding],
        }],
    }
}

#[tokio::test]
async fn upsert_keeps_row_id_and_install_time() {
    let (_dir, store) = store().await;
    let first = store.upsert(&plugin("acme", PluginType::Model)).await.unwrap();
    assert!(first.id.is_some());

    let mut update = first.clone();
    update.version = "1.1.0".into();
    update.installed_at = first.installed_at + Duration::days(3);
    update.updated_at = first.updated_at + Duration::seconds(5);
    update.status = PluginStatus::InstalledEnabled;
    update.enabled = true;
    let stored = store.upsert(&update).await.unwrap();

    assert_eq!(stored.id, first.id);
    assert_eq!(stored.installed_at, first.installed_at);
    assert_eq!(stored.updated_at, update.updated_at);
    assert_eq!(stored.version, "1.1.0");
    assert_eq!(store.get("acme").await.unwrap(), Some(stored));
}

#[tokio::test]
async fn list_and_count_apply_filters() {
    let (_dir, store) = store().await;
    store.upsert(&plugin("zeta", PluginType::Model)).await.unwrap();
    store.upsert(&plugin("alpha", PluginType::Model)).await.unwrap();
    let mut tool = plugin("tool", PluginType::Tool);
    tool.enabled = true;
    tool.status = PluginStatus::InstalledEnabled;
    store.upsert(&tool).await.unwrap();

    let models = store
        .list(&PluginFilter::all().plugin_type(PluginType::Model))
        .await
        .unwrap();
    let ids: Vec<_> = models.iter().map(|p| p.plugin_id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "zeta"]);

    assert_eq!(store.count(&PluginFilter::all()).await.unwrap(), 3);
    assert_eq!(store.count(&PluginFilter::all().enabled(true)).await.unwrap(), 1);
    assert_eq!(
        store
            .count(
                &PluginFilter::all()
                    .plugin_type(PluginType::Tool)
                    .status(PluginStatus::InstalledDisabled)
            )
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn associations_keep_declaration_order() {
    let (_dir, store) = store().await;
    store.upsert(&plugin("acme", PluginType::Model)).await.unwrap();
    store
        .replace_associations("acme", &associations("acme"))
        .await
        .unwrap();

    assert_eq!(store.associations("acme").await.unwrap(), associations("acme"));

    store
        .replace_associations("acme", &PluginAssociations::default())
        .await
        .unwrap();
    assert!(store.associations("acme").await.unwrap().is_empty());
}

#[tokio::test]
async fn cascade_delete_removes_associations() {
    let (_dir, store) = store().await;
    store.upsert(&plugin("acme", PluginType::Model)).await.unwrap();
    store
        .replace_associations("acme", &associations("acme"))
        .await
        .unwrap();

    assert!(store.delete_cascade("acme").await.unwrap());
    assert!(!store.delete_cascade("acme").await.unwrap());
    assert!(store.get("acme").await.unwrap().is_none());
    assert!(store.associations("acme").await.unwrap().is_empty());
}

#[tokio::test]
async fn associations_require_an_existing_plugin() {
    let (_dir, store) = store().await;
    let err = store
        .replace_associations("ghost", &associations("ghost"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_error");
}
