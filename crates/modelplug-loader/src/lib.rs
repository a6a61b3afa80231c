// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Load contexts for plugin bundles.
//!
//! Every installed bundle gets its own [`LoadContext`]: a private wasmtime
//! engine plus a table of named unit constructors discovered in the bundle.
//! The [`LoadContextManager`] caches one context per canonical bundle path
//! and the units resolved from it, and releases both together.

pub mod context;
pub mod host;
pub mod manager;
pub mod wasm;

pub use context::{
    CODE_ROOTS, DEFAULT_UNIT_FUEL, LoadContext, LoadOptions, UNIT_EXTENSION, unit_name,
};
pub use host::{HostSurface, HostUnit, UnitConstructor};
pub use manager::{LoadContextManager, canonical_key};
pub use wasm::WasmUnit;
