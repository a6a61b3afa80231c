// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The owning runtime context.
//!
//! [`PluginRuntime`] holds every long-lived piece of the plugin system: the
//! registry, the load-context manager, the factory dispatcher and the
//! lifecycle service. Nothing lives in globals; hosts construct one runtime
//! and pass it around.
//!
//! The dispatcher is gated: a provider serves adapters only while the plugin
//! that declares it is enabled.

use std::sync::Arc;

use modelplug_config::ModelplugConfig;
use modelplug_config::model::RegistryBackend;
use modelplug_core::{RecordStore, RuntimeError};
use modelplug_dispatch::FactoryDispatcher;
use modelplug_loader::{HostSurface, LoadContextManager, LoadOptions};
use modelplug_registry::{
    DurablePluginRegistry, InMemoryPluginRegistry, PluginRegistry, RuntimeInstances,
};
use modelplug_storage::{Database, SqliteRecordStore};
use tracing::info;

use crate::admin::PluginAdmin;
use crate::lifecycle::{LifecycleService, RestoreReport};

pub struct PluginRuntime {
    config: ModelplugConfig,
    registry: Arc<dyn PluginRegistry>,
    load_contexts: Arc<LoadContextManager>,
    dispatcher: Arc<FactoryDispatcher>,
    lifecycle: LifecycleService,
}

impl std::fmt::Debug for PluginRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRuntime")
            .field("backend", &self.config.storage.backend)
            .field("load_contexts", &self.load_contexts)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl PluginRuntime {
    /// Build a runtime with an empty host surface.
    pub async fn new(config: ModelplugConfig) -> Result<Self, RuntimeError> {
        Self::with_host(config, HostSurface::new()).await
    }

    /// Build a runtime whose load contexts see the given host units first.
    pub async fn with_host(config: ModelplugConfig, host: HostSurface) -> Result<Self, RuntimeError> {
        match config.storage.backend {
            RegistryBackend::Sqlite => {
                let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;
                Self::with_store(config, host, Arc::new(SqliteRecordStore::new(db)))
            }
            RegistryBackend::Memory => {
                let load_contexts = Arc::new(LoadContextManager::new(host, load_defaults(&config)));
                Self::assemble(
                    config,
                    Arc::new(InMemoryPluginRegistry::new()),
                    load_contexts,
                    RuntimeInstances::new(),
                )
            }
        }
    }

    /// Build a runtime whose durable registry persists through `store`.
    pub fn with_store(
        config: ModelplugConfig,
        host: HostSurface,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, RuntimeError> {
        let load_contexts = Arc::new(LoadContextManager::new(host, load_defaults(&config)));
        let instances = RuntimeInstances::new();
        let registry = Arc::new(
            DurablePluginRegistry::new(store)
                .with_instances(instances.clone())
                .with_load_contexts(load_contexts.clone()),
        );
        Self::assemble(config, registry, load_contexts, instances)
    }

    fn assemble(
        config: ModelplugConfig,
        registry: Arc<dyn PluginRegistry>,
        load_contexts: Arc<LoadContextManager>,
        instances: RuntimeInstances,
    ) -> Result<Self, RuntimeError> {
        let dispatcher = Arc::new(FactoryDispatcher::gated());
        let lifecycle = LifecycleService::new(
            &config,
            registry.clone(),
            load_contexts.clone(),
            dispatcher.clone(),
            instances,
        )?;

        info!(
            backend = ?config.storage.backend,
            plugins_dir = %config.install.plugins_dir,
            "plugin runtime ready"
        );
        Ok(Self {
            config,
            registry,
            load_contexts,
            dispatcher,
            lifecycle,
        })
    }

    /// Build a runtime and re-activate plugins persisted as enabled.
    pub async fn start(config: ModelplugConfig) -> Result<(Self, RestoreReport), RuntimeError> {
        let runtime = Self::new(config).await?;
        let report = runtime.lifecycle.restore_enabled().await?;
        Ok((runtime, report))
    }

    pub fn config(&self) -> &ModelplugConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn PluginRegistry> {
        &self.registry
    }

    pub fn load_contexts(&self) -> &Arc<LoadContextManager> {
        &self.load_contexts
    }

    pub fn dispatcher(&self) -> &Arc<FactoryDispatcher> {
        &self.dispatcher
    }

    pub fn lifecycle(&self) -> &LifecycleService {
        &self.lifecycle
    }

    pub fn admin(&self) -> PluginAdmin<'_> {
        PluginAdmin::new(&self.registry, &self.lifecycle, &self.load_contexts)
    }

    /// Drop every cached adapter and load context.
    pub async fn shutdown(&self) {
        let adapters = self.dispatcher.clear().await;
        self.load_contexts.clear();
        info!(adapters, "plugin runtime shut down");
    }
}

fn load_defaults(config: &ModelplugConfig) -> LoadOptions {
    LoadOptions {
        max_unit_memory_bytes: usize::try_from(config.loader.max_unit_memory_bytes)
            .unwrap_or(usize::MAX),
        unit_fuel: config.loader.unit_fuel,
    }
}
