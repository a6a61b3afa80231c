// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative operations over installed plugins.
//!
//! [`PluginAdmin`] is the surface an HTTP layer or the CLI calls. It borrows
//! the pieces owned by [`PluginRuntime`](crate::PluginRuntime) and adds the
//! read-side queries the lifecycle service does not need.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modelplug_core::{PluginInfo, PluginStatus, RuntimeError};
use modelplug_loader::LoadContextManager;
use modelplug_registry::PluginRegistry;

use crate::icon::{IconAsset, IconService};
use crate::lifecycle::LifecycleService;
use crate::source::InstallOptions;
use crate::status::{PluginStats, PluginStatusView};

#[derive(Clone, Copy)]
pub struct PluginAdmin<'a> {
    registry: &'a Arc<dyn PluginRegistry>,
    lifecycle: &'a LifecycleService,
    load_contexts: &'a LoadContextManager,
}

impl<'a> PluginAdmin<'a> {
    pub fn new(
        registry: &'a Arc<dyn PluginRegistry>,
        lifecycle: &'a LifecycleService,
        load_contexts: &'a LoadContextManager,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            load_contexts,
        }
    }

    pub async fn list(&self) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.registry.find_all().await
    }

    pub async fn list_enabled(&self) -> Result<Vec<PluginInfo>, RuntimeError> {
        self.registry.find_by_enabled(true).await
    }

    /// Fetch one plugin; unknown ids are a not-found error.
    pub async fn get(&self, plugin_id: &str) -> Result<PluginInfo, RuntimeError> {
        self.registry
            .find_by_plugin_id(plugin_id)
            .await?
            .ok_or_else(|| RuntimeError::NotFound {
                plugin_id: plugin_id.to_string(),
            })
    }

    pub async fn install_upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        options: InstallOptions,
    ) -> Result<PluginInfo, RuntimeError> {
        self.lifecycle.install_from_stream(bytes, filename, options).await
    }

    pub async fn install_path(
        &self,
        path: impl Into<PathBuf>,
        options: InstallOptions,
    ) -> Result<PluginInfo, RuntimeError> {
        self.lifecycle.install_from_path(path, options).await
    }

    pub async fn install_url(
        &self,
        url: &str,
        sha256: Option<&str>,
        options: InstallOptions,
    ) -> Result<PluginInfo, RuntimeError> {
        self.lifecycle.install_from_url(url, sha256, options).await
    }

    pub async fn install_marketplace(&self, reference: &str) -> Result<PluginInfo, RuntimeError> {
        self.lifecycle.install_from_marketplace(reference).await
    }

    pub async fn uninstall(&self, plugin_id: &str) -> Result<bool, RuntimeError> {
        self.lifecycle.uninstall(plugin_id).await
    }

    pub async fn enable(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
        self.lifecycle.enable(plugin_id).await
    }

    pub async fn disable(&self, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
        self.lifecycle.disable(plugin_id).await
    }

    /// Status summary. A plugin is available when it is enabled and its
    /// load context is live.
    pub async fn status(&self, plugin_id: &str) -> Result<PluginStatusView, RuntimeError> {
        let info = self.get(plugin_id).await?;
        let available = info.status == PluginStatus::InstalledEnabled
            && self.load_contexts.is_cached(&info.bundle_path);
        Ok(PluginStatusView::new(&info, available))
    }

    pub async fn stats(&self) -> Result<PluginStats, RuntimeError> {
        let all = self.registry.find_all().await?;
        Ok(PluginStats::from_records(&all))
    }

    /// Icon bytes of a plugin. Unknown plugins and plugins without an icon
    /// are both not-found.
    pub async fn icon(&self, plugin_id: &str) -> Result<IconAsset, RuntimeError> {
        let info = self.get(plugin_id).await?;
        let Some(stored) = info.icon_path.as_deref() else {
            return Err(RuntimeError::NotFound {
                plugin_id: format!("{plugin_id} (icon)"),
            });
        };
        self.lifecycle.icons().load(plugin_id, Path::new(stored)).await
    }

    /// Stable access path of the plugin's icon, `None` when it has none.
    pub async fn icon_path(&self, plugin_id: &str) -> Result<Option<String>, RuntimeError> {
        let info = self.get(plugin_id).await?;
        Ok(info
            .icon_path
            .is_some()
            .then(|| IconService::access_path(plugin_id)))
    }
}
