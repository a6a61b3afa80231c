// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-plugin async mutexes serializing lifecycle mutations.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct PluginLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl PluginLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `plugin_id`.
    ///
    /// The shard lock is released before awaiting the plugin mutex.
    pub async fn acquire(&self, plugin_id: &str) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(self.locks.entry(plugin_id.to_string()).or_default().value());
        mutex.lock_owned().await
    }

    /// Drop the mutex of a plugin nobody is waiting on.
    pub fn forget(&self, plugin_id: &str) {
        self.locks
            .remove_if(plugin_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
