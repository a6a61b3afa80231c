// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store wrapper that fails chosen writes on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use modelplug_core::{PluginAssociations, PluginFilter, PluginInfo, RecordStore, RuntimeError};

/// Delegates to an inner store until a failure switch is flipped.
pub struct FaultyStore {
    inner: Arc<dyn RecordStore>,
    fail_associations: AtomicBool,
    fail_delete: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            fail_associations: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    /// Make `replace_associations` fail until reset.
    pub fn fail_associations(&self, fail: bool) {
        self.fail_associations.store(fail, Ordering::SeqCst);
    }

    /// Make `delete_cascade` fail until reset.
    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn upsert(&self, info: &PluginInfo) -> Result<PluginInfo, RuntimeError> {
        self.inner.upsert(info).await
    }

    async fn get(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
        self.inner.get(plugin_id).await
    }

    async fn list(&self, filter: &PluginFilter) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.inner.list(filter).await
    }

    async fn count(&self, filter: &PluginFilter) -> Result<u64, RuntimeError> {
        self.inner.count(filter).await
    }

    async fn delete_cascade(&self, plugin_id: &str) -> Result<bool, RuntimeError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RuntimeError::storage(format!("injected delete failure for {plugin_id}")));
        }
        self.inner.delete_cascade(plugin_id).await
    }

    async fn replace_associations(
        &self,
        plugin_id: &str,
        associations: &PluginAssociations,
    ) -> Result<(), RuntimeError> {
        if self.fail_associations.load(Ordering::SeqCst) {
            return Err(RuntimeError::storage(format!(
                "injected association failure for {plugin_id}"
            )));
        }
        self.inner.replace_associations(plugin_id, associations).await
    }

    async fn associations(&self, plugin_id: &str) -> Result<PluginAssociations, RuntimeError> {
        self.inner.associations(plugin_id).await
    }
}
