// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes adapter requests to the factory registered for a provider namespace.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use modelplug_core::{
    ChatAdapter, Credentials, DispatchError, EmbeddingAdapter, ImageAdapter, ModelAdapter,
    ModelType, RuntimeError,
};
use modelplug_descriptor::ModelDefinition;
use tracing::{debug, info, warn};

use crate::cache::{AdapterCache, AdapterKey};
use crate::factory::ProviderFactory;

/// Namespace-keyed factory table with one adapter cache per model kind.
///
/// A gated dispatcher only serves providers that an enabled plugin has
/// opened with [`FactoryDispatcher::enable_provider`].
#[derive(Default)]
pub struct FactoryDispatcher {
    factories: DashMap<String, Arc<dyn ProviderFactory>>,
    gated: bool,
    /// provider name -> plugin id that enabled it
    enabled: DashMap<String, String>,
    chat: AdapterCache<dyn ChatAdapter>,
    embedding: AdapterCache<dyn EmbeddingAdapter>,
    image: AdapterCache<dyn ImageAdapter>,
}

impl std::fmt::Debug for FactoryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryDispatcher")
            .field("namespaces", &self.namespaces())
            .field("gated", &self.gated)
            .field("adapters", &self.cached_adapter_count())
            .finish()
    }
}

impl FactoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher that rejects providers no enabled plugin has opened.
    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::default()
        }
    }

    pub fn enable_provider(&self, provider: &str, plugin_id: &str) {
        if let Some(previous) = self.enabled.insert(provider.to_string(), plugin_id.to_string())
            && previous != plugin_id
        {
            warn!(provider, plugin_id, previous = %previous, "provider taken over by another plugin");
        }
    }

    /// Close `provider` if `plugin_id` opened it. Returns whether it was closed.
    pub fn disable_provider(&self, provider: &str, plugin_id: &str) -> bool {
        self.enabled
            .remove_if(provider, |_, owner| owner == plugin_id)
            .is_some()
    }

    pub fn is_provider_enabled(&self, provider: &str) -> bool {
        !self.gated || self.enabled.contains_key(provider)
    }

    /// Register `factory` under its namespace, replacing any previous one.
    ///
    /// Adapters built by a replaced factory stay cached until evicted.
    pub fn register_factory(&self, factory: Arc<dyn ProviderFactory>) {
        let namespace = factory.namespace().to_string();
        let types = factory.supported_model_types();
        if self.factories.insert(namespace.clone(), factory).is_some() {
            warn!(namespace = %namespace, "replaced provider factory");
        } else {
            info!(namespace = %namespace, model_types = ?types, "registered provider factory");
        }
    }

    /// Remove the factory for `namespace` and evict its adapters.
    pub async fn unregister_factory(&self, namespace: &str) -> bool {
        let removed = self.factories.remove(namespace).is_some();
        let evicted = self.evict_provider(namespace).await;
        if removed {
            info!(namespace, evicted, "unregistered provider factory");
        }
        removed
    }

    pub fn factory(&self, namespace: &str) -> Option<Arc<dyn ProviderFactory>> {
        self.factories.get(namespace).map(|f| Arc::clone(f.value()))
    }

    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub async fn create_chat_adapter(
        &self,
        definition: &ModelDefinition,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ChatAdapter>, RuntimeError> {
        let factory = self.route(definition, ModelType::Chat)?;
        self.cached(&self.chat, definition, || async move {
            factory.create_chat(definition, credentials).await
        })
        .await
    }

    pub async fn create_embedding_adapter(
        &self,
        definition: &ModelDefinition,
        credentials: &Credentials,
    ) -> Result<Arc<dyn EmbeddingAdapter>, RuntimeError> {
        let factory = self.route(definition, ModelType::Embedding)?;
        self.cached(&self.embedding, definition, || async move {
            factory.create_embedding(definition, credentials).await
        })
        .await
    }

    pub async fn create_image_adapter(
        &self,
        definition: &ModelDefinition,
        credentials: &Credentials,
    ) -> Result<Arc<dyn ImageAdapter>, RuntimeError> {
        let factory = self.route(definition, ModelType::Image)?;
        self.cached(&self.image, definition, || async move {
            factory.create_image(definition, credentials).await
        })
        .await
    }

    /// Evict and shut down every adapter built for `provider`.
    pub async fn evict_provider(&self, provider: &str) -> usize {
        let chat = self.chat.evict_provider(provider);
        let embedding = self.embedding.evict_provider(provider);
        let image = self.image.evict_provider(provider);
        shutdown_all(chat, embedding, image).await
    }

    /// Evict and shut down every adapter of `model_id`.
    pub async fn evict_model(&self, model_id: &str) -> usize {
        let chat = self.chat.evict_model(model_id);
        let embedding = self.embedding.evict_model(model_id);
        let image = self.image.evict_model(model_id);
        shutdown_all(chat, embedding, image).await
    }

    pub async fn evict_key(&self, key: &AdapterKey) -> usize {
        let chat = self.chat.evict_key(key).into_iter().collect();
        let embedding = self.embedding.evict_key(key).into_iter().collect();
        let image = self.image.evict_key(key).into_iter().collect();
        shutdown_all(chat, embedding, image).await
    }

    pub async fn clear(&self) -> usize {
        let chat = self.chat.clear();
        let embedding = self.embedding.clear();
        let image = self.image.clear();
        shutdown_all(chat, embedding, image).await
    }

    pub fn cached_adapter_count(&self) -> usize {
        self.chat.len() + self.embedding.len() + self.image.len()
    }

    /// Keys of every cached adapter, sorted.
    pub fn cached_keys(&self) -> Vec<AdapterKey> {
        let mut keys = self.chat.keys();
        keys.extend(self.embedding.keys());
        keys.extend(self.image.keys());
        keys.sort();
        keys
    }

    /// Resolve the factory for a request, failing before anything is cached.
    fn route(
        &self,
        definition: &ModelDefinition,
        requested: ModelType,
    ) -> Result<Arc<dyn ProviderFactory>, RuntimeError> {
        if !self.is_provider_enabled(&definition.provider) {
            return Err(DispatchError::ProviderDisabled {
                provider: definition.provider.clone(),
            }
            .into());
        }
        let factory = self
            .factory(&definition.provider)
            .filter(|f| f.supports(requested))
            .ok_or_else(|| DispatchError::UnsupportedCombination {
                namespace: definition.provider.clone(),
                model_type: requested,
            })?;
        if definition.model_type != requested {
            return Err(DispatchError::ModelTypeMismatch {
                model_id: definition.model_id.clone(),
                requested,
                actual: definition.model_type,
            }
            .into());
        }
        Ok(factory)
    }

    async fn cached<T, F, Fut>(
        &self,
        cache: &AdapterCache<T>,
        definition: &ModelDefinition,
        build: F,
    ) -> Result<Arc<T>, RuntimeError>
    where
        T: ?Sized + ModelAdapter,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>, RuntimeError>>,
    {
        let key = AdapterKey::for_definition(definition);
        let label = key.to_string();
        let adapter = cache
            .get_or_try_insert(&key, move || async move {
                let adapter = build().await.map_err(|e| match e {
                    RuntimeError::Dispatch(_) => e,
                    other => DispatchError::Construction {
                        key: label.clone(),
                        message: other.to_string(),
                    }
                    .into(),
                })?;
                debug!(adapter = %label, "constructed adapter");
                Ok(adapter)
            })
            .await?;

        // The provider may have been closed while the adapter was being built.
        if !self.is_provider_enabled(&definition.provider) {
            cache.evict_key(&key);
            shutdown(adapter.as_ref()).await;
            return Err(DispatchError::ProviderDisabled {
                provider: definition.provider.clone(),
            }
            .into());
        }
        Ok(adapter)
    }
}

async fn shutdown_all(
    chat: Vec<Arc<dyn ChatAdapter>>,
    embedding: Vec<Arc<dyn EmbeddingAdapter>>,
    image: Vec<Arc<dyn ImageAdapter>>,
) -> usize {
    let mut count = 0;
    for adapter in chat {
        shutdown(adapter.as_ref()).await;
        count += 1;
    }
    for adapter in embedding {
        shutdown(adapter.as_ref()).await;
        count += 1;
    }
    for adapter in image {
        shutdown(adapter.as_ref()).await;
        count += 1;
    }
    count
}

async fn shutdown<A: ModelAdapter + ?Sized>(adapter: &A) {
    if let Err(e) = adapter.shutdown().await {
        warn!(
            model_id = adapter.model_id(),
            provider = adapter.provider(),
            error = %e,
            "adapter shutdown failed"
        );
    }
}
