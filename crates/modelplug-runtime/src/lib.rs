// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Installation, lifecycle and administration of modelplug plugins.
//!
//! [`PluginRuntime`] wires the registry, load contexts and factory
//! dispatcher together; [`LifecycleService`] drives installs and state
//! changes; [`PluginAdmin`] is the administrative surface on top.

pub mod admin;
pub mod download;
pub mod icon;
pub mod lifecycle;
pub mod locks;
pub mod runtime;
pub mod source;
pub mod status;

pub use admin::PluginAdmin;
pub use download::{BundleDownloader, Downloaded, PublicOnlyResolver};
pub use icon::{IconAsset, IconService};
pub use lifecycle::{LifecycleService, LifecycleSettings, RestoreReport};
pub use locks::PluginLocks;
pub use runtime::PluginRuntime;
pub use source::{BundleStore, InstallOptions, InstallSource, StagedBundle};
pub use status::{PluginStats, PluginStatusView};
