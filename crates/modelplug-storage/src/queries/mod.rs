// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed queries over the registry tables.

pub mod associations;
pub mod plugins;

/// Tables whose rows belong to a plugin and are removed with it.
pub(crate) const ASSOCIATION_TABLES: [&str; 3] =
    ["plugin_dependencies", "plugin_extensions", "plugin_services"];
