// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Installation and lifecycle of plugins.
//!
//! An install normalizes its source into a local bundle, then parses and
//! validates the manifest, providers and model definitions, checks
//! dependencies, and finally persists an `INSTALLED_DISABLED` record with its
//! associations. Bundle reading runs on the blocking pool under
//! `install.extract_timeout_secs` and never while a plugin lock is held.
//!
//! Mutations of one plugin are serialized through [`PluginLocks`]. The lock
//! only covers the registry section of an operation: bundle reads, unit
//! compilation and file cleanup happen before or after it. The registry
//! holds durable metadata; live units and adapters sit in the load-context
//! manager, [`RuntimeInstances`] and the dispatcher, and are kept in step
//! here.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use modelplug_config::ModelplugConfig;
use modelplug_core::types::next_timestamp;
use modelplug_core::{
    ImplementationUnit, InstallError, LifecyclePhase, LoadError, PluginAssociations, PluginInfo,
    PluginStatus, RuntimeError, ServiceRecord,
};
use modelplug_descriptor::{
    Bundle, DependencyGraph, ParsedBundle, PluginManifest, extract_icon, load_bundle,
    parse_manifest,
};
use modelplug_dispatch::FactoryDispatcher;
use modelplug_loader::{LoadContextManager, LoadOptions};
use modelplug_registry::{PluginRegistry, RuntimeInstances};
use tracing::{debug, error, info, warn};

use crate::download::BundleDownloader;
use crate::icon::IconService;
use crate::locks::PluginLocks;
use crate::source::{BundleStore, InstallOptions, InstallSource, StagedBundle};

/// Limits applied by the lifecycle service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub extract_timeout: Duration,
    pub max_bundle_bytes: u64,
    pub max_unit_memory_bytes: u64,
    pub unit_fuel: u64,
}

impl LifecycleSettings {
    pub fn from_config(config: &ModelplugConfig) -> Self {
        Self {
            extract_timeout: Duration::from_secs(config.install.extract_timeout_secs),
            max_bundle_bytes: config.install.max_bundle_bytes,
            max_unit_memory_bytes: config.loader.max_unit_memory_bytes,
            unit_fuel: config.loader.unit_fuel,
        }
    }
}

/// Outcome of re-activating enabled plugins at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: Vec<String>,
    pub failed: Vec<String>,
}

/// Units resolved for a plugin, not yet visible to the runtime.
struct Activation {
    units: Vec<Arc<dyn ImplementationUnit>>,
    providers: Vec<String>,
}

/// A parsed bundle plus its icon, read off the blocking pool.
struct Inspected {
    parsed: ParsedBundle,
    icon: Option<(String, Vec<u8>)>,
}

pub struct LifecycleService {
    registry: Arc<dyn PluginRegistry>,
    load_contexts: Arc<LoadContextManager>,
    dispatcher: Arc<FactoryDispatcher>,
    instances: RuntimeInstances,
    icons: IconService,
    bundles: BundleStore,
    downloader: BundleDownloader,
    locks: PluginLocks,
    settings: LifecycleSettings,
}

impl std::fmt::Debug for LifecycleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleService")
            .field("bundles", &self.bundles)
            .field("icons", &self.icons)
            .field("settings", &self.settings)
            .finish()
    }
}

impl LifecycleService {
    pub fn new(
        config: &ModelplugConfig,
        registry: Arc<dyn PluginRegistry>,
        load_contexts: Arc<LoadContextManager>,
        dispatcher: Arc<FactoryDispatcher>,
        instances: RuntimeInstances,
    ) -> Result<Self, RuntimeError> {
        Ok(Self {
            registry,
            load_contexts,
            dispatcher,
            instances,
            icons: IconService::new(&config.install.icons_dir),
            bundles: BundleStore::new(&config.install.plugins_dir),
            downloader: BundleDownloader::new(&config.install)?,
            locks: PluginLocks::new(),
            settings: LifecycleSettings::from_config(config),
        })
    }

    pub fn icons(&self) -> &IconService {
        &self.icons
    }

    pub fn bundles(&self) -> &BundleStore {
        &self.bundles
    }

    pub fn instances(&self) -> &RuntimeInstances {
        &self.instances
    }

    // --- install ---

    /// Install a bundle from `source`.
    ///
    /// A failed install leaves no record and removes anything it staged.
    pub async fn install(
        &self,
        source: InstallSource,
        options: InstallOptions,
    ) -> Result<PluginInfo, RuntimeError> {
        let described = source.describe();
        info!(source = %described, replace = options.replace, "installing plugin");

        let staged = self.stage(source).await.inspect_err(|e| {
            error!(source = %described, error = %e, "install source rejected");
        })?;
        match self.install_staged(&staged, options).await {
            Ok(info) => Ok(info),
            Err(e) => {
                self.bundles.discard(&staged).await;
                error!(source = %described, kind = e.kind(), error = %e, "install failed");
                Err(e)
            }
        }
    }

    pub async fn install_from_stream(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        options: InstallOptions,
    ) -> Result<PluginInfo, RuntimeError> {
        let source = InstallSource::Stream {
            bytes,
            filename: filename.to_string(),
        };
        self.install(source, options).await
    }

    pub async fn install_from_path(
        &self,
        path: impl Into<PathBuf>,
        options: InstallOptions,
    ) -> Result<PluginInfo, RuntimeError> {
        self.install(InstallSource::Path(path.into()), options).await
    }

    pub async fn install_from_url(
        &self,
        url: &str,
        sha256: Option<&str>,
        options: InstallOptions,
    ) -> Result<PluginInfo, RuntimeError> {
        let source = InstallSource::Url {
            url: url.to_string(),
            sha256: sha256.map(str::to_string),
        };
        self.install(source, options).await
    }

    pub async fn install_from_marketplace(&self, reference: &str) -> Result<PluginInfo, RuntimeError> {
        self.install(
            InstallSource::Marketplace(reference.to_string()),
            InstallOptions::default(),
        )
        .await
    }

    async fn stage(&self, source: InstallSource) -> Result<StagedBundle, RuntimeError> {
        match source {
            InstallSource::Stream { bytes, filename } => {
                if bytes.len() as u64 > self.settings.max_bundle_bytes {
                    return Err(InstallError::TooLarge {
                        limit: self.settings.max_bundle_bytes,
                    }
                    .into());
                }
                self.bundles.stage_bytes(&bytes, &filename).await
            }
            InstallSource::Path(path) => self.bundles.use_in_place(&path).await,
            InstallSource::Url { url, sha256 } => {
                let downloaded = self.downloader.fetch(&url, sha256.as_deref()).await?;
                self.bundles
                    .stage_bytes(&downloaded.bytes, &downloaded.filename)
                    .await
            }
            InstallSource::Marketplace(reference) => Err(RuntimeError::NotSupported {
                operation: format!("marketplace install of `{reference}`"),
            }),
        }
    }

    async fn install_staged(
        &self,
        staged: &StagedBundle,
        options: InstallOptions,
    ) -> Result<PluginInfo, RuntimeError> {
        debug!(bundle = %staged.path.display(), status = %PluginStatus::Discovered, "bundle discovered");
        let inspected = self.inspect(staged.path.clone()).await?;
        let manifest = &inspected.parsed.manifest;
        let plugin_id = manifest.id.clone();
        debug!(plugin_id = %plugin_id, status = %PluginStatus::Validated, "bundle validated");

        if !options.replace && self.registry.exists_by_plugin_id(&plugin_id).await? {
            return Err(InstallError::DuplicateId { plugin_id }.into());
        }
        self.check_dependencies(manifest)
            .await
            .map_err(|e| e.in_phase(&plugin_id, LifecyclePhase::Validate))?;

        let bundle_path = self.bundles.promote(staged, &plugin_id).await?;
        let icon_path = match &inspected.icon {
            Some((filename, bytes)) => self.store_icon(&plugin_id, filename, bytes).await,
            None => None,
        };

        let mut info = PluginInfo::new(
            &plugin_id,
            &manifest.name,
            &manifest.version,
            manifest.plugin_type,
            bundle_path.clone(),
        );
        info.main_implementation = manifest.main_implementation.clone();
        info.icon_path = icon_path
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned());
        let associations = associations_of(&inspected.parsed);

        let (saved, replaced) = match self.commit_install(info, &associations, options).await {
            Ok(committed) => committed,
            Err(e) => {
                if let Some(icon) = &icon_path {
                    self.icons.discard(icon).await;
                }
                if let Err(cleanup) = self.bundles.remove_managed(&bundle_path).await {
                    warn!(plugin_id = %plugin_id, error = %cleanup, "failed to remove bundle of failed install");
                }
                return Err(e);
            }
        };
        if let Some(previous) = &replaced {
            self.clean_up_replaced(previous, &saved).await;
        }

        info!(
            plugin_id = %saved.plugin_id,
            version = %saved.version,
            providers = inspected.parsed.providers.len(),
            models = inspected.parsed.models.definitions.len(),
            skipped_models = inspected.parsed.models.failures.len(),
            "plugin installed"
        );
        Ok(saved)
    }

    /// The registry section of an install: duplicate check, save, and
    /// deactivation of a replaced plugin. Returns the replaced record.
    async fn commit_install(
        &self,
        info: PluginInfo,
        associations: &PluginAssociations,
        options: InstallOptions,
    ) -> Result<(PluginInfo, Option<PluginInfo>), RuntimeError> {
        let plugin_id = info.plugin_id.clone();
        let _guard = self.locks.acquire(&plugin_id).await;
        let previous = match self.registry.find_by_plugin_id(&plugin_id).await? {
            Some(_) if !options.replace => {
                return Err(InstallError::DuplicateId { plugin_id }.into());
            }
            Some(record) => {
                let previous_associations = self.registry.associations(&plugin_id).await?;
                Some((record, previous_associations))
            }
            None => None,
        };

        let saved = self
            .persist(info, associations, previous.as_ref())
            .await
            .map_err(|e| e.in_phase(&plugin_id, LifecyclePhase::Install))?;

        let Some((record, previous_associations)) = previous else {
            return Ok((saved, None));
        };
        info!(plugin_id = %plugin_id, previous_version = %record.version, "replacing installed plugin");
        self.deactivate(&plugin_id, &previous_associations.services).await;
        self.load_contexts.release(&record.bundle_path);
        Ok((saved, Some(record)))
    }

    /// Delete the replaced generation's bundle and icon.
    async fn clean_up_replaced(&self, previous: &PluginInfo, current: &PluginInfo) {
        if previous.bundle_path != current.bundle_path
            && let Err(e) = self.bundles.remove_managed(&previous.bundle_path).await
        {
            warn!(plugin_id = %current.plugin_id, error = %e, "failed to remove replaced bundle");
        }
        if let Some(icon) = &previous.icon_path
            && previous.icon_path != current.icon_path
        {
            self.icons.discard(Path::new(icon)).await;
        }
    }

    /// Parse and validate the bundle on the blocking pool under the extract timeout.
    async fn inspect(&self, path: PathBuf) -> Result<Inspected, RuntimeError> {
        let limit = self.settings.extract_timeout;
        let task = tokio::task::spawn_blocking(move || inspect_bundle(&path));
        match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined.map_err(|e| {
                RuntimeError::Internal(format!("bundle inspection task failed: {e}"))
            })?,
            Err(_) => Err(InstallError::Timeout {
                step: "bundle extraction".to_string(),
                duration: limit,
            }
            .into()),
        }
    }

    /// Reject unmet required dependencies and cycles; warn on unmet optional ones.
    async fn check_dependencies(&self, manifest: &PluginManifest) -> Result<(), RuntimeError> {
        let installed = self.registry.find_all().await?;
        let known: HashSet<&str> = installed
            .iter()
            .map(|p| p.plugin_id.as_str())
            .chain(std::iter::once(manifest.id.as_str()))
            .collect();

        let mut graph = DependencyGraph::new();
        for record in installed.iter().filter(|p| p.plugin_id != manifest.id) {
            // Only edges between known plugins matter for cycle detection;
            // their own unmet dependencies are not this install's concern.
            let dependencies = self
                .registry
                .associations(&record.plugin_id)
                .await?
                .dependencies
                .into_iter()
                .filter(|d| known.contains(d.plugin_id.as_str()))
                .collect();
            graph.add(&record.plugin_id, &record.version, dependencies);
        }
        graph.add(&manifest.id, &manifest.version, manifest.dependencies.clone());

        let report = graph.check()?;
        for warning in &report.warnings {
            warn!(plugin_id = %manifest.id, warning = %warning, "optional dependency not satisfied");
        }
        Ok(())
    }

    /// Save the record and its associations. When the associations fail
    /// the registry is put back as it was: a fresh record is deleted, a
    /// replaced one is restored with its previous associations.
    async fn persist(
        &self,
        info: PluginInfo,
        associations: &PluginAssociations,
        previous: Option<&(PluginInfo, PluginAssociations)>,
    ) -> Result<PluginInfo, RuntimeError> {
        let plugin_id = info.plugin_id.clone();
        let saved = self.registry.save(info).await?;
        if let Err(e) = self.registry.save_associations(&plugin_id, associations).await {
            self.roll_back(&plugin_id, previous).await;
            return Err(e);
        }
        Ok(saved)
    }

    async fn roll_back(&self, plugin_id: &str, previous: Option<&(PluginInfo, PluginAssociations)>) {
        let restored = match previous {
            None => self.registry.delete(plugin_id).await.map(|_| ()),
            Some((record, associations)) => match self.registry.save(record.clone()).await {
                Ok(_) => self.registry.save_associations(plugin_id, associations).await,
                Err(e) => Err(e),
            },
        };
        if let Err(e) = restored {
            error!(plugin_id, error = %e, "failed to roll back plugin record");
        }
    }

    /// Persist icon bytes. Failures are logged and the plugin goes without.
    async fn store_icon(&self, plugin_id: &str, filename: &str, bytes: &[u8]) -> Option<PathBuf> {
        match self.icons.store(plugin_id, filename, bytes).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(plugin_id, error = %e, "icon extraction failed");
                None
            }
        }
    }

    // --- enable / disable ---

    /// Enable a plugin. Unknown ids and already enabled plugins are no-ops.
    ///
    /// The main implementation and every provider implementation must
    /// resolve; otherwise a load error is returned and the status is kept.
    /// Units are compiled before the plugin lock is taken.
    pub async fn enable(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
        loop {
            let Some(record) = self.registry.find_by_plugin_id(plugin_id).await? else {
                debug!(plugin_id, "enable of unknown plugin ignored");
                return Ok(None);
            };
            if record.status == PluginStatus::InstalledEnabled {
                return Ok(Some(record));
            }
            ensure_transition(&record, PluginStatus::InstalledEnabled)?;

            let activation = match self.prepare(&record).await {
                Ok(activation) => activation,
                Err(e) => match self.registry.find_by_plugin_id(plugin_id).await? {
                    None => {
                        debug!(plugin_id, "plugin uninstalled while loading");
                        self.load_contexts.release(&record.bundle_path);
                        return Ok(None);
                    }
                    Some(current) if current.bundle_path != record.bundle_path => continue,
                    Some(_) => {
                        error!(plugin_id, error = %e, "plugin failed to load");
                        return Err(e.in_phase(plugin_id, LifecyclePhase::Enable));
                    }
                },
            };

            let _guard = self.locks.acquire(plugin_id).await;
            let current = match self.registry.find_by_plugin_id(plugin_id).await? {
                Some(current) if current.bundle_path == record.bundle_path => current,
                Some(_) => {
                    debug!(plugin_id, "plugin replaced while loading; retrying");
                    self.load_contexts.release(&record.bundle_path);
                    continue;
                }
                None => {
                    debug!(plugin_id, "plugin uninstalled while loading");
                    self.load_contexts.release(&record.bundle_path);
                    return Ok(None);
                }
            };
            if current.status == PluginStatus::InstalledEnabled {
                return Ok(Some(current));
            }
            if let Err(e) = ensure_transition(&current, PluginStatus::InstalledEnabled) {
                self.load_contexts.release(&current.bundle_path);
                return Err(e);
            }

            let mut updated = current.clone();
            updated.status = PluginStatus::InstalledEnabled;
            updated.enabled = true;
            updated.enabled_at = Some(next_timestamp(current.enabled_at.max(current.disabled_at)));
            updated.last_error = None;
            let saved = match self.registry.save(updated).await {
                Ok(saved) => saved,
                Err(e) => {
                    self.load_contexts.release(&current.bundle_path);
                    return Err(e);
                }
            };
            self.publish(plugin_id, activation);
            info!(plugin_id, "plugin enabled");
            return Ok(Some(saved));
        }
    }

    /// Disable a plugin and evict its adapters. Unknown ids and already
    /// disabled plugins are no-ops.
    pub async fn disable(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
        let _guard = self.locks.acquire(plugin_id).await;
        let Some(record) = self.registry.find_by_plugin_id(plugin_id).await? else {
            debug!(plugin_id, "disable of unknown plugin ignored");
            return Ok(None);
        };
        if record.status == PluginStatus::InstalledDisabled {
            return Ok(Some(record));
        }
        ensure_transition(&record, PluginStatus::InstalledDisabled)?;
        let services = self.registry.associations(plugin_id).await?.services;

        let mut updated = record.clone();
        updated.status = PluginStatus::InstalledDisabled;
        updated.enabled = false;
        updated.disabled_at = Some(next_timestamp(record.enabled_at.max(record.disabled_at)));
        let saved = self.registry.save(updated).await?;

        self.deactivate(plugin_id, &services).await;
        info!(plugin_id, "plugin disabled");
        Ok(Some(saved))
    }

    /// Warm the load context and resolve every declared implementation.
    ///
    /// Nothing is published; [`Self::publish`] does that once the record
    /// has been re-checked under the plugin lock.
    async fn prepare(&self, record: &PluginInfo) -> Result<Activation, RuntimeError> {
        let plugin_id = record.plugin_id.as_str();
        let options = self.load_options_for(record).await?;
        self.load_contexts
            .context_with(&record.bundle_path, options)
            .await
            .map_err(|e| e.with_plugin_id(plugin_id))?;

        let services = self.registry.associations(plugin_id).await?.services;
        let mut names: Vec<String> = record.main_implementation.iter().cloned().collect();
        for service in &services {
            if !names.contains(&service.provider_implementation) {
                names.push(service.provider_implementation.clone());
            }
        }

        let mut units = Vec::with_capacity(names.len());
        for name in &names {
            match self.load_contexts.resolve(&record.bundle_path, name).await {
                Ok(unit) => units.push(unit),
                Err(e) => {
                    self.load_contexts.release(&record.bundle_path);
                    return Err(e.with_plugin_id(plugin_id).into());
                }
            }
        }
        debug!(plugin_id, units = ?names, "plugin units resolved");
        Ok(Activation {
            units,
            providers: services.into_iter().map(|s| s.provider_name).collect(),
        })
    }

    /// Make resolved units visible and open the plugin's providers.
    fn publish(&self, plugin_id: &str, activation: Activation) {
        for unit in activation.units {
            self.instances.insert(plugin_id, unit);
        }
        for provider in &activation.providers {
            self.dispatcher.enable_provider(provider, plugin_id);
        }
    }

    /// Close the plugin's providers, drop their adapters and its live units.
    async fn deactivate(&self, plugin_id: &str, services: &[ServiceRecord]) {
        for service in services {
            self.dispatcher.disable_provider(&service.provider_name, plugin_id);
            let evicted = self.dispatcher.evict_provider(&service.provider_name).await;
            debug!(plugin_id, provider = %service.provider_name, evicted, "evicted adapters");
        }
        self.instances.evict_plugin(plugin_id);
    }

    /// Load options with the manifest's memory limit applied when lower.
    async fn load_options_for(&self, record: &PluginInfo) -> Result<LoadOptions, RuntimeError> {
        let path = record.bundle_path.clone();
        let plugin_id = record.plugin_id.clone();
        let manifest = tokio::task::spawn_blocking(move || {
            Bundle::open(&path)
                .and_then(|bundle| parse_manifest(&bundle))
                .map_err(|e| LoadError::BundleUnreadable {
                    plugin_id: Some(plugin_id),
                    bundle: path.clone(),
                    message: e.to_string(),
                })
        })
        .await
        .map_err(|e| RuntimeError::Internal(format!("manifest read task failed: {e}")))??;

        let ceiling = manifest
            .resources
            .memory
            .map_or(self.settings.max_unit_memory_bytes, |m| {
                m.min(self.settings.max_unit_memory_bytes)
            });
        Ok(LoadOptions {
            max_unit_memory_bytes: usize::try_from(ceiling).unwrap_or(usize::MAX),
            unit_fuel: self.settings.unit_fuel,
        })
    }

    // --- uninstall ---

    /// Remove a plugin and everything the runtime holds for it.
    ///
    /// The record is deleted first; if that fails nothing else changes.
    /// Icon and bundle files are removed after the plugin lock is released,
    /// and failures there are logged. Returns false for unknown ids.
    pub async fn uninstall(&self, plugin_id: &str) -> Result<bool, RuntimeError> {
        let guard = self.locks.acquire(plugin_id).await;
        let Some(record) = self.registry.find_by_plugin_id(plugin_id).await? else {
            debug!(plugin_id, "uninstall of unknown plugin ignored");
            return Ok(false);
        };
        let services = self.registry.associations(plugin_id).await?.services;
        self.registry
            .delete(plugin_id)
            .await
            .map_err(|e| e.in_phase(plugin_id, LifecyclePhase::Uninstall))?;
        self.deactivate(plugin_id, &services).await;
        self.load_contexts.release(&record.bundle_path);
        drop(guard);
        self.locks.forget(plugin_id);

        if let Some(icon) = &record.icon_path {
            self.icons.discard(Path::new(icon)).await;
        }
        match self.bundles.remove_managed(&record.bundle_path).await {
            Ok(removed) => debug!(plugin_id, removed, "bundle cleanup done"),
            Err(e) => warn!(plugin_id, error = %e, "failed to delete plugin bundle"),
        }
        info!(plugin_id, status = %PluginStatus::Uninstalled, "plugin uninstalled");
        Ok(true)
    }

    // --- startup ---

    /// Re-activate plugins persisted as enabled. Plugins that no longer load
    /// are marked `FAILED` with the reason. Plugins changed by a concurrent
    /// operation while loading are left to that operation.
    pub async fn restore_enabled(&self) -> Result<RestoreReport, RuntimeError> {
        let mut report = RestoreReport::default();
        for record in self
            .registry
            .find_by_status(PluginStatus::InstalledEnabled)
            .await?
        {
            let plugin_id = record.plugin_id.as_str();
            let outcome = self.prepare(&record).await;

            let _guard = self.locks.acquire(plugin_id).await;
            let Some(current) = self.registry.find_by_plugin_id(plugin_id).await?.filter(|c| {
                c.status == PluginStatus::InstalledEnabled && c.bundle_path == record.bundle_path
            }) else {
                if outcome.is_ok() {
                    self.load_contexts.release(&record.bundle_path);
                }
                debug!(plugin_id, "plugin changed while restoring; skipped");
                continue;
            };

            match outcome {
                Ok(activation) => {
                    self.publish(plugin_id, activation);
                    report.restored.push(record.plugin_id.clone());
                }
                Err(e) => {
                    error!(plugin_id, error = %e, "enabled plugin failed to restore");
                    let mut failed = current;
                    failed.status = PluginStatus::Failed;
                    failed.enabled = false;
                    failed.last_error = Some(e.to_string());
                    self.registry.save(failed).await?;
                    report.failed.push(record.plugin_id.clone());
                }
            }
        }
        info!(restored = report.restored.len(), failed = report.failed.len(), "restored enabled plugins");
        Ok(report)
    }
}

fn ensure_transition(record: &PluginInfo, next: PluginStatus) -> Result<(), RuntimeError> {
    if record.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(RuntimeError::InvalidTransition {
            plugin_id: record.plugin_id.clone(),
            from: record.status,
            to: next,
        })
    }
}

fn inspect_bundle(path: &Path) -> Result<Inspected, RuntimeError> {
    let bundle = Bundle::open(path).map_err(|e| InstallError::UnrecognizedFormat {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if bundle.manifest_file().is_none() {
        return Err(InstallError::UnrecognizedFormat {
            path: path.to_path_buf(),
            message: "no manifest at bundle root".to_string(),
        }
        .into());
    }

    let parsed = load_bundle(path)?;
    let icon = parsed.manifest.icon.as_deref().and_then(|name| {
        match extract_icon(&bundle, name) {
            Ok(Some(bytes)) => Some((name.to_string(), bytes)),
            Ok(None) => {
                warn!(plugin_id = %parsed.manifest.id, icon = name, "declared icon not found in bundle");
                None
            }
            Err(e) => {
                warn!(plugin_id = %parsed.manifest.id, error = %e, "icon could not be read");
                None
            }
        }
    });
    Ok(Inspected { parsed, icon })
}

/// Dependencies, extensions and one service record per provider.
fn associations_of(parsed: &ParsedBundle) -> PluginAssociations {
    let plugin_id = &parsed.manifest.id;
    PluginAssociations {
        dependencies: parsed.manifest.dependencies.clone(),
        extensions: parsed.manifest.extensions.clone(),
        services: parsed
            .providers
            .iter()
            .map(|provider| ServiceRecord {
                plugin_id: plugin_id.clone(),
                provider_name: provider.provider_name.clone(),
                provider_implementation: provider.provider_implementation.clone(),
                model_types: provider.supported_model_types.clone(),
            })
            .collect(),
    }
}
