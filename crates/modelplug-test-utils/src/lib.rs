// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for modelplug integration tests.
//!
//! # Components
//!
//! - [`bundle`] - bundle builders and ready-made plugin fixtures
//! - [`MockChatAdapter`] / [`MockEmbeddingAdapter`] - deterministic adapters
//! - [`MockFactory`] - provider factory with construction counters
//! - [`FaultyStore`] - record store that fails chosen writes
//! - [`chat_definition`] - a model definition without parsing a bundle

pub mod bundle;
pub mod faulty_store;
pub mod mock_adapter;
pub mod mock_factory;

pub use faulty_store::FaultyStore;
pub use mock_adapter::{MockChatAdapter, MockEmbeddingAdapter};
pub use mock_factory::MockFactory;

use std::collections::BTreeMap;

use modelplug_core::ModelType;
use modelplug_descriptor::{LocalizedText, ModelDefinition};

/// A bare model definition for dispatch tests.
pub fn model_definition(model_id: &str, provider: &str, model_type: ModelType) -> ModelDefinition {
    ModelDefinition {
        model_id: model_id.to_string(),
        model_type,
        provider: provider.to_string(),
        label: LocalizedText::single("en_US", model_id),
        features: Vec::new(),
        model_properties: BTreeMap::new(),
        parameter_rules: Vec::new(),
        pricing: None,
        source_path: format!("models/{model_id}.yaml"),
    }
}

pub fn chat_definition(model_id: &str, provider: &str) -> ModelDefinition {
    model_definition(model_id, provider, ModelType::Chat)
}
