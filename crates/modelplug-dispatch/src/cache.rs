// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter cache keyed by `model_id@provider_id[#variant]`.
//!
//! Each key maps to an `Arc<OnceCell<_>>`. The shard lock is only held while
//! fetching or inserting the cell, so adapter construction never blocks
//! other keys and concurrent misses on one key build a single adapter.
//! Entries live until evicted explicitly.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use modelplug_core::RuntimeError;
use modelplug_descriptor::ModelDefinition;
use tokio::sync::OnceCell;

/// Composite cache key of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdapterKey {
    pub model_id: String,
    pub provider: String,
    pub variant: Option<String>,
}

impl AdapterKey {
    pub fn new(model_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            provider: provider.into(),
            variant: None,
        }
    }

    pub fn for_definition(definition: &ModelDefinition) -> Self {
        Self::new(&definition.model_id, &definition.provider)
    }

    /// Distinguish adapters of one model built with different settings.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

impl fmt::Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.model_id, self.provider)?;
        if let Some(variant) = &self.variant {
            write!(f, "#{variant}")?;
        }
        Ok(())
    }
}

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Compute-if-absent cache of shared adapters.
pub struct AdapterCache<T: ?Sized> {
    slots: DashMap<AdapterKey, Slot<T>>,
}

impl<T: ?Sized> Default for AdapterCache<T> {
    fn default() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for AdapterCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterCache")
            .field("entries", &self.slots.len())
            .finish()
    }
}

impl<T: ?Sized + Send + Sync> AdapterCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached adapter for `key`, building it with `init` on a miss.
    ///
    /// A failed build leaves no entry behind, so the next call retries.
    pub async fn get_or_try_insert<F, Fut>(
        &self,
        key: &AdapterKey,
        init: F,
    ) -> Result<Arc<T>, RuntimeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>, RuntimeError>>,
    {
        let slot = self.slots.entry(key.clone()).or_default().clone();
        let result = slot.get_or_try_init(init).await.cloned();
        if result.is_err() {
            self.slots.remove_if(key, |_, s| s.get().is_none());
        }
        result
    }

    pub fn get(&self, key: &AdapterKey) -> Option<Arc<T>> {
        self.slots.get(key).and_then(|s| s.get().cloned())
    }

    pub fn contains(&self, key: &AdapterKey) -> bool {
        self.get(key).is_some()
    }

    /// Keys with a built adapter, sorted.
    pub fn keys(&self) -> Vec<AdapterKey> {
        let mut keys: Vec<AdapterKey> = self
            .slots
            .iter()
            .filter(|e| e.value().initialized())
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Remove every adapter built for `provider` and return them.
    pub fn evict_provider(&self, provider: &str) -> Vec<Arc<T>> {
        self.evict_where(|key| key.provider == provider)
    }

    /// Remove every adapter of `model_id`, across providers and variants.
    pub fn evict_model(&self, model_id: &str) -> Vec<Arc<T>> {
        self.evict_where(|key| key.model_id == model_id)
    }

    pub fn evict_key(&self, key: &AdapterKey) -> Option<Arc<T>> {
        self.slots
            .remove(key)
            .and_then(|(_, slot)| slot.get().cloned())
    }

    pub fn clear(&self) -> Vec<Arc<T>> {
        self.evict_where(|_| true)
    }

    /// Number of built adapters. In-flight constructions are not counted.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_where(&self, predicate: impl Fn(&AdapterKey) -> bool) -> Vec<Arc<T>> {
        let keys: Vec<AdapterKey> = self
            .slots
            .iter()
            .filter(|e| predicate(e.key()))
            .map(|e| e.key().clone())
            .collect();
        keys.iter().filter_map(|key| self.evict_key(key)).collect()
    }
}
