// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the modelplug plugin runtime.
//!
//! Defines the error taxonomy, the records the registry stores, and the
//! trait seams (adapters, record store, implementation units) that the
//! other crates implement or consume.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    DispatchError, InstallError, LifecyclePhase, LoadError, ParseError, RuntimeError,
    ValidationError,
};
pub use types::{
    ConfigurationMethod, Credentials, Dependency, DependencyKind, Extension, HealthStatus,
    ModelType, PluginAssociations, PluginFilter, PluginInfo, PluginStatus, PluginType,
    ServiceRecord,
};

pub use traits::{
    ChatAdapter, ChatStream, EmbeddingAdapter, ImageAdapter, ImplementationUnit, ModelAdapter,
    RecordStore, UnitOrigin,
};
