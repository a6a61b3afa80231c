// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat and embedding adapters with deterministic output.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use modelplug_core::types::{
    ChatChunk, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse,
};
use modelplug_core::{
    ChatAdapter, ChatStream, EmbeddingAdapter, HealthStatus, ModelAdapter, ModelType,
    RuntimeError,
};
use tokio::sync::Mutex;

/// Chat adapter that answers from a FIFO queue.
///
/// An empty queue yields `"mock response"`. Streams split the answer on
/// whitespace, one chunk per word.
pub struct MockChatAdapter {
    model_id: String,
    provider: String,
    responses: Mutex<VecDeque<String>>,
    hang_after_first_chunk: bool,
    shutdowns: Arc<AtomicUsize>,
    stream_dropped: Arc<AtomicBool>,
}

impl MockChatAdapter {
    pub fn new(model_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            provider: provider.into(),
            responses: Mutex::new(VecDeque::new()),
            hang_after_first_chunk: false,
            shutdowns: Arc::new(AtomicUsize::new(0)),
            stream_dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = Mutex::new(VecDeque::from(responses));
        self
    }

    /// Streams emit one chunk and then never finish, like a stalled backend.
    pub fn hanging(mut self) -> Self {
        self.hang_after_first_chunk = true;
        self
    }

    /// Share a shutdown counter with the caller.
    pub fn with_shutdown_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.shutdowns = counter;
        self
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Whether the last stream handed out has been dropped.
    pub fn stream_dropped(&self) -> bool {
        self.stream_dropped.load(Ordering::SeqCst)
    }

    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

#[async_trait]
impl ModelAdapter for MockChatAdapter {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn model_type(&self) -> ModelType {
        ModelType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, RuntimeError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sets a flag when the stream holding it is dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatAdapter for MockChatAdapter {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, RuntimeError> {
        Ok(ChatResponse {
            model: self.model_id.clone(),
            content: self.next_response().await,
        })
    }

    async fn stream(&self, _request: ChatRequest) -> Result<ChatStream, RuntimeError> {
        let text = self.next_response().await;
        self.stream_dropped.store(false, Ordering::SeqCst);
        let guard = DropFlag(Arc::clone(&self.stream_dropped));

        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let last = words.len().saturating_sub(1);
        let chunks: Vec<Result<ChatChunk, RuntimeError>> = words
            .into_iter()
            .enumerate()
            .map(|(i, word)| {
                Ok(ChatChunk {
                    delta: word,
                    finished: i == last,
                })
            })
            .collect();

        let body = if self.hang_after_first_chunk {
            stream::iter(chunks.into_iter().take(1))
                .chain(stream::pending())
                .boxed()
        } else {
            stream::iter(chunks).boxed()
        };
        Ok(Box::pin(body.map(move |chunk| {
            let _held = &guard;
            chunk
        })))
    }
}

/// Embedding adapter returning fixed-size vectors derived from input length.
pub struct MockEmbeddingAdapter {
    model_id: String,
    provider: String,
    dimensions: usize,
}

impl MockEmbeddingAdapter {
    pub fn new(model_id: impl Into<String>, provider: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model_id: model_id.into(),
            provider: provider.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl ModelAdapter for MockEmbeddingAdapter {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        &self.provider
    }

    fn model_type(&self) -> ModelType {
        ModelType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, RuntimeError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbeddingAdapter {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, RuntimeError> {
        let vectors = request
            .inputs
            .iter()
            .map(|input| vec![input.len() as f32; self.dimensions])
            .collect();
        Ok(EmbeddingResponse { vectors })
    }
}
