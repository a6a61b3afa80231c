// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider factories build adapters for the models a provider declares.

use std::sync::Arc;

use async_trait::async_trait;
use modelplug_core::{
    ChatAdapter, Credentials, DispatchError, EmbeddingAdapter, ImageAdapter, ModelType,
    RuntimeError,
};
use modelplug_descriptor::ModelDefinition;

fn unsupported(namespace: &str, model_type: ModelType) -> RuntimeError {
    DispatchError::UnsupportedCombination {
        namespace: namespace.to_string(),
        model_type,
    }
    .into()
}

/// Builds adapters for one provider namespace.
///
/// Only the constructors for [`ProviderFactory::supported_model_types`] need
/// overriding; the rest report an unsupported combination.
#[async_trait]
pub trait ProviderFactory: Send + Sync + 'static {
    /// Provider namespace this factory serves (e.g. `acme`).
    fn namespace(&self) -> &str;

    fn supported_model_types(&self) -> Vec<ModelType>;

    fn supports(&self, model_type: ModelType) -> bool {
        self.supported_model_types().contains(&model_type)
    }

    async fn create_chat(
        &self,
        _definition: &ModelDefinition,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn ChatAdapter>, RuntimeError> {
        Err(unsupported(self.namespace(), ModelType::Chat))
    }

    async fn create_embedding(
        &self,
        _definition: &ModelDefinition,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn EmbeddingAdapter>, RuntimeError> {
        Err(unsupported(self.namespace(), ModelType::Embedding))
    }

    async fn create_image(
        &self,
        _definition: &ModelDefinition,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn ImageAdapter>, RuntimeError> {
        Err(unsupported(self.namespace(), ModelType::Image))
    }
}
