// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams of the plugin runtime.
//!
//! Backend adapters extend [`ModelAdapter`] and use `#[async_trait]` for
//! dynamic dispatch. [`RecordStore`] abstracts durable registry persistence
//! and [`ImplementationUnit`] is what a load context hands back on resolve.

pub mod adapter;
pub mod chat;
pub mod embedding;
pub mod image;
pub mod store;
pub mod unit;

pub use adapter::ModelAdapter;
pub use chat::{ChatAdapter, ChatStream};
pub use embedding::EmbeddingAdapter;
pub use image::ImageAdapter;
pub use store::RecordStore;
pub use unit::{ImplementationUnit, UnitOrigin};
