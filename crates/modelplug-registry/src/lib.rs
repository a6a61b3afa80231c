// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry for the modelplug runtime.
//!
//! [`PluginRegistry`] is the contract the lifecycle service talks to. The
//! in-memory backend suits tests and ephemeral hosts; the durable backend
//! persists through any [`modelplug_core::RecordStore`].

pub mod durable;
pub mod instances;
pub mod memory;
pub mod registry;

pub use durable::DurablePluginRegistry;
pub use instances::RuntimeInstances;
pub use memory::InMemoryPluginRegistry;
pub use registry::PluginRegistry;
