// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The registry contract shared by every backend.

use async_trait::async_trait;
use modelplug_core::{
    PluginAssociations, PluginFilter, PluginInfo, PluginStatus, PluginType, RuntimeError,
};

/// Persistent index of installed plugins.
///
/// `save` is an upsert keyed by `plugin_id`: an existing record keeps its
/// row id and `installed_at` and gets a fresh `updated_at`; a new record
/// gets fresh install and update timestamps. Implementations are safe to
/// call concurrently.
#[async_trait]
pub trait PluginRegistry: Send + Sync {
    async fn save(&self, info: PluginInfo) -> Result<PluginInfo, RuntimeError>;

    /// Remove a record and its associations. Returns false when unknown.
    async fn delete(&self, plugin_id: &str) -> Result<bool, RuntimeError>;

    async fn find_by_plugin_id(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError>;

    /// Records matching `filter`, ordered by plugin id.
    async fn find(&self, filter: &PluginFilter) -> Result<Vec<PluginInfo>, RuntimeError>;

    async fn count(&self, filter: &PluginFilter) -> Result<u64, RuntimeError>;

    async fn save_associations(
        &self,
        plugin_id: &str,
        associations: &PluginAssociations,
    ) -> Result<(), RuntimeError>;

    async fn associations(&self, plugin_id: &str) -> Result<PluginAssociations, RuntimeError>;

    async fn find_all(&self) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.find(&PluginFilter::all()).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.find(&PluginFilter::all().name(name)).await
    }

    async fn find_by_type(&self, plugin_type: PluginType) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.find(&PluginFilter::all().plugin_type(plugin_type)).await
    }

    async fn find_by_status(&self, status: PluginStatus) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.find(&PluginFilter::all().status(status)).await
    }

    async fn find_by_enabled(&self, enabled: bool) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.find(&PluginFilter::all().enabled(enabled)).await
    }

    async fn find_by_type_and_status(
        &self,
        plugin_type: PluginType,
        status: PluginStatus,
    ) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.find(&PluginFilter::all().plugin_type(plugin_type).status(status))
            .await
    }

    async fn exists_by_plugin_id(&self, plugin_id: &str) -> Result<bool, RuntimeError> {
        Ok(self.find_by_plugin_id(plugin_id).await?.is_some())
    }

    async fn count_all(&self) -> Result<u64, RuntimeError> {
        self.count(&PluginFilter::all()).await
    }

    async fn count_by_status(&self, status: PluginStatus) -> Result<u64, RuntimeError> {
        self.count(&PluginFilter::all().status(status)).await
    }

    async fn count_by_type(&self, plugin_type: PluginType) -> Result<u64, RuntimeError> {
        self.count(&PluginFilter::all().plugin_type(plugin_type)).await
    }

    async fn count_by_enabled(&self, enabled: bool) -> Result<u64, RuntimeError> {
        self.count(&PluginFilter::all().enabled(enabled)).await
    }
}
