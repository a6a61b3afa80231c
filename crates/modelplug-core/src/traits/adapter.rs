// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait for every backend adapter produced by a provider factory.

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::types::{HealthStatus, ModelType};

/// Identity and lifecycle shared by chat, embedding, and image adapters.
#[async_trait]
pub trait ModelAdapter: Send + Sync + 'static {
    /// The model this adapter serves.
    fn model_id(&self) -> &str;

    /// Namespace of the provider that built this adapter.
    fn provider(&self) -> &str;

    fn model_type(&self) -> ModelType;

    async fn health_check(&self) -> Result<HealthStatus, RuntimeError>;

    /// Releases backend resources. Called when the adapter is evicted.
    async fn shutdown(&self) -> Result<(), RuntimeError> {
        Ok(())
    }
}
