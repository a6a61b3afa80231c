// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local registry backed by concurrent maps.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use modelplug_core::types::next_timestamp;
use modelplug_core::{PluginAssociations, PluginFilter, PluginInfo, RuntimeError};
use tracing::debug;

use crate::registry::PluginRegistry;

/// Registry that lives only as long as the process.
#[derive(Debug)]
pub struct InMemoryPluginRegistry {
    records: DashMap<String, PluginInfo>,
    associations: DashMap<String, PluginAssociations>,
    next_id: AtomicI64,
}

impl Default for InMemoryPluginRegistry {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            associations: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryPluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginRegistry for InMemoryPluginRegistry {
    async fn save(&self, mut info: PluginInfo) -> Result<PluginInfo, RuntimeError> {
        // The entry guard makes the read-modify-write atomic per key.
        match self.records.entry(info.plugin_id.clone()) {
            Entry::Occupied(mut existing) => {
                let previous = existing.get();
                info.id = previous.id;
                info.installed_at = previous.installed_at;
                info.updated_at = next_timestamp(Some(previous.updated_at));
                existing.insert(info.clone());
            }
            Entry::Vacant(slot) => {
                let now = Utc::now();
                info.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst));
                info.installed_at = now;
                info.updated_at = now;
                slot.insert(info.clone());
            }
        }
        debug!(plugin_id = %info.plugin_id, status = %info.status, "saved plugin record");
        Ok(info)
    }

    async fn delete(&self, plugin_id: &str) -> Result<bool, RuntimeError> {
        self.associations.remove(plugin_id);
        Ok(self.records.remove(plugin_id).is_some())
    }

    async fn find_by_plugin_id(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
        Ok(self.records.get(plugin_id).map(|r| r.value().clone()))
    }

    async fn find(&self, filter: &PluginFilter) -> Result<Vec<PluginInfo>, RuntimeError> {
        let mut found: Vec<PluginInfo> = self
            .records
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| a.plugin_id.cmp(&b.plugin_id));
        Ok(found)
    }

    async fn count(&self, filter: &PluginFilter) -> Result<u64, RuntimeError> {
        Ok(self.records.iter().filter(|r| filter.matches(r.value())).count() as u64)
    }

    async fn save_associations(
        &self,
        plugin_id: &str,
        associations: &PluginAssociations,
    ) -> Result<(), RuntimeError> {
        if !self.records.contains_key(plugin_id) {
            return Err(RuntimeError::NotFound {
                plugin_id: plugin_id.to_string(),
            });
        }
        self.associations
            .insert(plugin_id.to_string(), associations.clone());
        Ok(())
    }

    async fn associations(&self, plugin_id: &str) -> Result<PluginAssociations, RuntimeError> {
        Ok(self
            .associations
            .get(plugin_id)
            .map(|a| a.value().clone())
            .unwrap_or_default())
    }
}
