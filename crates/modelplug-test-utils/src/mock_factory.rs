// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider factory that counts the adapters it builds.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use modelplug_core::{
    ChatAdapter, Credentials, EmbeddingAdapter, ModelType, RuntimeError,
};
use modelplug_descriptor::ModelDefinition;
use modelplug_dispatch::ProviderFactory;

use crate::mock_adapter::{MockChatAdapter, MockEmbeddingAdapter};

/// Builds [`MockChatAdapter`]s and [`MockEmbeddingAdapter`]s for one namespace.
pub struct MockFactory {
    namespace: String,
    model_types: Vec<ModelType>,
    created: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
    build_delay: Option<Duration>,
    fail: AtomicBool,
    hanging_streams: bool,
}

impl MockFactory {
    /// A factory serving chat models only.
    pub fn chat_only(namespace: impl Into<String>) -> Self {
        Self::new(namespace, vec![ModelType::Chat])
    }

    pub fn new(namespace: impl Into<String>, model_types: Vec<ModelType>) -> Self {
        Self {
            namespace: namespace.into(),
            model_types,
            created: Arc::new(AtomicUsize::new(0)),
            shutdowns: Arc::new(AtomicUsize::new(0)),
            build_delay: None,
            fail: AtomicBool::new(false),
            hanging_streams: false,
        }
    }

    /// Sleep this long inside every construction, to widen race windows.
    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = Some(delay);
        self
    }

    /// Chat adapters built from now on stall after their first chunk.
    pub fn with_hanging_streams(mut self) -> Self {
        self.hanging_streams = true;
        self
    }

    /// Make subsequent constructions fail until reset.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Adapters constructed so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Adapters shut down after eviction.
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    async fn begin_build(&self, definition: &ModelDefinition) -> Result<(), RuntimeError> {
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RuntimeError::Internal(format!(
                "backend for {} unavailable",
                definition.model_id
            )));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ProviderFactory for MockFactory {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn supported_model_types(&self) -> Vec<ModelType> {
        self.model_types.clone()
    }

    async fn create_chat(
        &self,
        definition: &ModelDefinition,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn ChatAdapter>, RuntimeError> {
        self.begin_build(definition).await?;
        let mut adapter = MockChatAdapter::new(&definition.model_id, &self.namespace)
            .with_shutdown_counter(Arc::clone(&self.shutdowns));
        if self.hanging_streams {
            adapter = adapter.hanging();
        }
        Ok(Arc::new(adapter))
    }

    async fn create_embedding(
        &self,
        definition: &ModelDefinition,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn EmbeddingAdapter>, RuntimeError> {
        self.begin_build(definition).await?;
        Ok(Arc::new(MockEmbeddingAdapter::new(
            &definition.model_id,
            &self.namespace,
            4,
        )))
    }
}
