// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live implementation units of enabled plugins.

use std::sync::Arc;

use dashmap::DashMap;
use modelplug_core::ImplementationUnit;

/// Units resolved for each plugin, keyed by `(plugin_id, unit name)`.
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct RuntimeInstances {
    units: Arc<DashMap<(String, String), Arc<dyn ImplementationUnit>>>,
}

impl std::fmt::Debug for RuntimeInstances {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeInstances")
            .field("units", &self.units.len())
            .finish()
    }
}

impl RuntimeInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, plugin_id: &str, unit: Arc<dyn ImplementationUnit>) {
        self.units
            .insert((plugin_id.to_string(), unit.name().to_string()), unit);
    }

    pub fn get(&self, plugin_id: &str, unit: &str) -> Option<Arc<dyn ImplementationUnit>> {
        self.units
            .get(&(plugin_id.to_string(), unit.to_string()))
            .map(|u| Arc::clone(u.value()))
    }

    /// Names of the units held for a plugin, sorted.
    pub fn units_of(&self, plugin_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .units
            .iter()
            .filter(|e| e.key().0 == plugin_id)
            .map(|e| e.key().1.clone())
            .collect();
        names.sort();
        names
    }

    /// Drop every unit of a plugin. Returns how many were removed.
    pub fn evict_plugin(&self, plugin_id: &str) -> usize {
        let before = self.units.len();
        self.units.retain(|(owner, _), _| owner != plugin_id);
        before - self.units.len()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
