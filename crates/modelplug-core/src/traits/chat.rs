// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat adapter trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::RuntimeError;
use crate::traits::adapter::ModelAdapter;
use crate::types::{ChatChunk, ChatRequest, ChatResponse};

/// A boxed stream of chat completion chunks.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, RuntimeError>> + Send>>;

/// Adapter for conversational models, with single-shot and streaming calls.
///
/// Dropping the stream returned by [`ChatAdapter::stream`] must abort the
/// in-flight backend call.
#[async_trait]
pub trait ChatAdapter: ModelAdapter {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, RuntimeError>;

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream, RuntimeError>;
}
