// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Abstract record store behind the durable plugin registry.

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::types::{PluginAssociations, PluginFilter, PluginInfo};

/// Durable storage of plugin records and their associations.
///
/// Implementations must make [`RecordStore::delete_cascade`] and
/// [`RecordStore::replace_associations`] atomic: either every row changes or
/// none does.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Insert or update a record keyed by `plugin_id` and return what was stored.
    ///
    /// On update, `installed_at` and the row id of the existing record are kept.
    async fn upsert(&self, info: &PluginInfo) -> Result<PluginInfo, RuntimeError>;

    async fn get(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError>;

    /// Records matching `filter`, ordered by plugin id.
    async fn list(&self, filter: &PluginFilter) -> Result<Vec<PluginInfo>, RuntimeError>;

    async fn count(&self, filter: &PluginFilter) -> Result<u64, RuntimeError>;

    /// Delete associations then the record itself. Returns false if nothing existed.
    async fn delete_cascade(&self, plugin_id: &str) -> Result<bool, RuntimeError>;

    /// Replace every association row of a plugin.
    async fn replace_associations(
        &self,
        plugin_id: &str,
        associations: &PluginAssociations,
    ) -> Result<(), RuntimeError>;

    async fn associations(&self, plugin_id: &str) -> Result<PluginAssociations, RuntimeError>;
}
