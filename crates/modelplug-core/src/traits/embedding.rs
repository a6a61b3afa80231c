// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait.

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::traits::adapter::ModelAdapter;
use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// Adapter that turns text into vectors.
#[async_trait]
pub trait EmbeddingAdapter: ModelAdapter {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, RuntimeError>;
}
