// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry persisted through a [`RecordStore`].
//!
//! Deleting a plugin also drops its live units and releases its load
//! context so no stale code outlives the record.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use modelplug_core::types::next_timestamp;
use modelplug_core::{PluginAssociations, PluginFilter, PluginInfo, RecordStore, RuntimeError};
use modelplug_loader::LoadContextManager;
use tracing::{debug, info};

use crate::instances::RuntimeInstances;
use crate::registry::PluginRegistry;

pub struct DurablePluginRegistry {
    store: Arc<dyn RecordStore>,
    instances: RuntimeInstances,
    load_contexts: Option<Arc<LoadContextManager>>,
}

impl std::fmt::Debug for DurablePluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurablePluginRegistry")
            .field("instances", &self.instances)
            .field("load_contexts", &self.load_contexts.is_some())
            .finish()
    }
}

impl DurablePluginRegistry {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            instances: RuntimeInstances::new(),
            load_contexts: None,
        }
    }

    /// Share an instance cache with the lifecycle service.
    pub fn with_instances(mut self, instances: RuntimeInstances) -> Self {
        self.instances = instances;
        self
    }

    /// Release load contexts of deleted plugins through this manager.
    pub fn with_load_contexts(mut self, manager: Arc<LoadContextManager>) -> Self {
        self.load_contexts = Some(manager);
        self
    }

    pub fn instances(&self) -> &RuntimeInstances {
        &self.instances
    }
}

#[async_trait]
impl PluginRegistry for DurablePluginRegistry {
    async fn save(&self, mut info: PluginInfo) -> Result<PluginInfo, RuntimeError> {
        match self.store.get(&info.plugin_id).await? {
            Some(previous) => {
                info.id = previous.id;
                info.installed_at = previous.installed_at;
                info.updated_at = next_timestamp(Some(previous.updated_at));
            }
            None => {
                let now = Utc::now();
                info.id = None;
                info.installed_at = now;
                info.updated_at = now;
            }
        }
        let stored = self.store.upsert(&info).await?;
        debug!(plugin_id = %stored.plugin_id, status = %stored.status, "persisted plugin record");
        Ok(stored)
    }

    async fn delete(&self, plugin_id: &str) -> Result<bool, RuntimeError> {
        let existing = self.store.get(plugin_id).await?;
        let deleted = self.store.delete_cascade(plugin_id).await?;
        let evicted = self.instances.evict_plugin(plugin_id);
        if let (Some(record), Some(manager)) = (&existing, &self.load_contexts) {
            manager.release(&record.bundle_path);
        }
        if deleted {
            info!(plugin_id, evicted_units = evicted, "deleted plugin record");
        }
        Ok(deleted)
    }

    async fn find_by_plugin_id(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
        self.store.get(plugin_id).await
    }

    async fn find(&self, filter: &PluginFilter) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.store.list(filter).await
    }

    async fn count(&self, filter: &PluginFilter) -> Result<u64, RuntimeError> {
        self.store.count(filter).await
    }

    async fn save_associations(
        &self,
        plugin_id: &str,
        associations: &PluginAssociations,
    ) -> Result<(), RuntimeError> {
        self.store.replace_associations(plugin_id, associations).await
    }

    async fn associations(&self, plugin_id: &str) -> Result<PluginAssociations, RuntimeError> {
        self.store.associations(plugin_id).await
    }
}
