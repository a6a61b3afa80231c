// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache of load contexts keyed by canonical bundle path.
//!
//! Both maps hold `Arc<OnceCell<_>>` slots. A shard lock is held only while
//! fetching or inserting an empty slot; opening the bundle, compiling
//! modules and instantiating units run outside it, and concurrent first
//! accesses converge on a single initialization.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use modelplug_core::{ImplementationUnit, LoadError};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::context::{LoadContext, LoadOptions};
use crate::host::HostSurface;

type ContextSlot = Arc<OnceCell<Arc<LoadContext>>>;
type InstanceSlot = Arc<OnceCell<Arc<dyn ImplementationUnit>>>;

pub struct LoadContextManager {
    host: HostSurface,
    defaults: LoadOptions,
    contexts: DashMap<PathBuf, ContextSlot>,
    instances: DashMap<(PathBuf, String), InstanceSlot>,
    created: AtomicUsize,
}

impl std::fmt::Debug for LoadContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContextManager")
            .field("contexts", &self.contexts.len())
            .field("instances", &self.instances.len())
            .field("created", &self.created_count())
            .finish()
    }
}

impl LoadContextManager {
    pub fn new(host: HostSurface, defaults: LoadOptions) -> Self {
        Self {
            host,
            defaults,
            contexts: DashMap::new(),
            instances: DashMap::new(),
            created: AtomicUsize::new(0),
        }
    }

    pub fn host(&self) -> &HostSurface {
        &self.host
    }

    pub fn defaults(&self) -> LoadOptions {
        self.defaults
    }

    /// The context for `bundle_path`, created with default options on first use.
    pub async fn context(&self, bundle_path: &Path) -> Result<Arc<LoadContext>, LoadError> {
        self.context_with(bundle_path, self.defaults).await
    }

    /// The context for `bundle_path`. `options` apply only if this call
    /// creates the context.
    pub async fn context_with(
        &self,
        bundle_path: &Path,
        options: LoadOptions,
    ) -> Result<Arc<LoadContext>, LoadError> {
        let key = canonical_key(bundle_path);
        let slot = self.contexts.entry(key.clone()).or_default().clone();

        let result: Result<Arc<LoadContext>, LoadError> = slot
            .get_or_try_init(|| async {
                let host = self.host.clone();
                let path = key.clone();
                let context = tokio::task::spawn_blocking(move || {
                    LoadContext::create(&path, host, options)
                })
                .await
                .map_err(|e| LoadError::BundleUnreadable {
                    plugin_id: None,
                    bundle: key.clone(),
                    message: format!("context creation task failed: {e}"),
                })??;
                self.created.fetch_add(1, Ordering::SeqCst);
                info!(bundle = %key.display(), units = context.unit_names().len(), "load context ready");
                Ok::<_, LoadError>(Arc::new(context))
            })
            .await
            .cloned();

        if result.is_err() {
            self.contexts.remove_if(&key, |_, s| s.get().is_none());
        }
        result
    }

    /// Resolve `unit` from the bundle at `bundle_path`, reusing the cached
    /// instance when one exists.
    pub async fn resolve(
        &self,
        bundle_path: &Path,
        unit: &str,
    ) -> Result<Arc<dyn ImplementationUnit>, LoadError> {
        let context = self.context(bundle_path).await?;
        let key = (context.bundle_path().to_path_buf(), unit.to_string());
        let slot = self.instances.entry(key.clone()).or_default().clone();

        let result: Result<Arc<dyn ImplementationUnit>, LoadError> = slot
            .get_or_try_init(|| async {
                let ctx = Arc::clone(&context);
                let name = unit.to_string();
                tokio::task::spawn_blocking(move || ctx.construct(&name))
                    .await
                    .map_err(|e| LoadError::Instantiation {
                        plugin_id: None,
                        bundle: key.0.clone(),
                        unit: unit.to_string(),
                        message: format!("instantiation task failed: {e}"),
                    })?
            })
            .await
            .cloned();

        if result.is_err() {
            self.instances.remove_if(&key, |_, s| s.get().is_none());
        } else {
            debug!(bundle = %key.0.display(), unit = %unit, "resolved unit");
        }
        result
    }

    /// Close and forget the context for `bundle_path` along with every
    /// instance resolved from it. Returns whether a context was cached.
    pub fn release(&self, bundle_path: &Path) -> bool {
        let key = canonical_key(bundle_path);
        self.instances.retain(|(path, _), _| *path != key);
        match self.contexts.remove(&key) {
            Some((_, slot)) => {
                if let Some(context) = slot.get() {
                    context.close();
                }
                info!(bundle = %key.display(), "released load context");
                true
            }
            None => false,
        }
    }

    /// Release every context.
    pub fn clear(&self) {
        self.instances.clear();
        let keys: Vec<PathBuf> = self.contexts.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, slot)) = self.contexts.remove(&key)
                && let Some(context) = slot.get()
            {
                context.close();
            }
        }
    }

    /// How many contexts have been created over the manager's lifetime.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Canonical paths of contexts currently cached, sorted.
    pub fn cached_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .contexts
            .iter()
            .filter(|e| e.value().initialized())
            .map(|e| e.key().clone())
            .collect();
        paths.sort();
        paths
    }

    pub fn is_cached(&self, bundle_path: &Path) -> bool {
        self.contexts
            .get(&canonical_key(bundle_path))
            .is_some_and(|slot| slot.initialized())
    }

    /// Number of cached unit instances across all contexts.
    pub fn instance_count(&self) -> usize {
        self.instances.iter().filter(|e| e.value().initialized()).count()
    }
}

impl Default for LoadContextManager {
    fn default() -> Self {
        Self::new(HostSurface::new(), LoadOptions::default())
    }
}

/// Canonical form of a bundle path, falling back to an absolute path when
/// the bundle no longer exists.
pub fn canonical_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
