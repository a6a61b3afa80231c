// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read models returned by administrative queries.

use std::collections::BTreeMap;

use modelplug_core::{PluginInfo, PluginStatus, PluginType};
use serde::Serialize;

/// Status summary of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginStatusView {
    pub plugin_id: String,
    pub status: PluginStatus,
    pub enabled: bool,
    /// Enabled and holding a live load context.
    pub available: bool,
    pub plugin_type: PluginType,
    pub version: String,
}

impl PluginStatusView {
    pub fn new(info: &PluginInfo, available: bool) -> Self {
        Self {
            plugin_id: info.plugin_id.clone(),
            status: info.status,
            enabled: info.enabled,
            available,
            plugin_type: info.plugin_type,
            version: info.version.clone(),
        }
    }
}

/// Counts across every installed plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginStats {
    pub total: u64,
    pub enabled: u64,
    pub disabled: u64,
    pub failed: u64,
    pub by_type: BTreeMap<PluginType, u64>,
}

impl PluginStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PluginInfo>) -> Self {
        let mut stats = PluginStats::default();
        for record in records {
            stats.total += 1;
            match record.status {
                PluginStatus::InstalledEnabled => stats.enabled += 1,
                PluginStatus::InstalledDisabled => stats.disabled += 1,
                PluginStatus::Failed => stats.failed += 1,
                _ => {}
            }
            *stats.by_type.entry(record.plugin_type).or_default() += 1;
        }
        stats
    }
}
