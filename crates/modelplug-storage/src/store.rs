// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`RecordStore`] backed by SQLite.

use async_trait::async_trait;
use modelplug_core::{PluginAssociations, PluginFilter, PluginInfo, RecordStore, RuntimeError};

use crate::database::Database;
use crate::queries::{associations, plugins};

/// SQLite implementation of the registry's record store.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn upsert(&self, info: &PluginInfo) -> Result<PluginInfo, RuntimeError> {
        plugins::upsert_plugin(&self.db, info).await
    }

    async fn get(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
        plugins::get_plugin(&self.db, plugin_id).await
    }

    async fn list(&self, filter: &PluginFilter) -> Result<Vec<PluginInfo>, RuntimeError> {
        plugins::list_plugins(&self.db, filter).await
    }

    async fn count(&self, filter: &PluginFilter) -> Result<u64, RuntimeError> {
        plugins::count_plugins(&self.db, filter).await
    }

    async fn delete_cascade(&self, plugin_id: &str) -> Result<bool, RuntimeError> {
        plugins::delete_plugin_cascade(&self.db, plugin_id).await
    }

    async fn replace_associations(
        &self,
        plugin_id: &str,
        associations: &PluginAssociations,
    ) -> Result<(), RuntimeError> {
        associations::replace_associations(&self.db, plugin_id, associations).await
    }

    async fn associations(&self, plugin_id: &str) -> Result<PluginAssociations, RuntimeError> {
        associations::load_associations(&self.db, plugin_id).await
    }
}
