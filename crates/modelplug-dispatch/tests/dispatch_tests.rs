// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Factory dispatch, adapter caching and stream cancellation.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use modelplug_core::types::{ChatRequest, EmbeddingRequest};
use modelplug_core::{Credentials, DispatchError, ModelType, RuntimeError};
use modelplug_dispatch::{AdapterKey, FactoryDispatcher, stream_with_cancellation};
use modelplug_test_utils::{MockFactory, chat_definition, model_definition};
use tokio_util::sync::CancellationToken;

fn credentials() -> Credentials {
    Credentials::new().with("api_key", "sk-test")
}

#[tokio::test]
async fn image_request_for_chat_only_provider_is_rejected_and_not_cached() {
    let dispatcher = FactoryDispatcher::new();
    let factory = Arc::new(MockFactory::chat_only("acme"));
    dispatcher.register_factory(factory.clone());

    let definition = model_definition("acme-draw", "acme", ModelType::Image);
    let err = dispatcher
        .create_image_adapter(&definition, &credentials())
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        RuntimeError::Dispatch(DispatchError::UnsupportedCombination {
            model_type: ModelType::Image,
            ..
        })
    ));
    assert_eq!(factory.created(), 0);
    assert_eq!(dispatcher.cached_adapter_count(), 0);
}

#[tokio::test]
async fn unknown_namespace_fails_fast() {
    let dispatcher = FactoryDispatcher::new();
    let err = dispatcher
        .create_chat_adapter(&chat_definition("m", "nobody"), &credentials())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), "dispatch_error");
    assert!(dispatcher.cached_keys().is_empty());
}

#[tokio::test]
async fn definition_of_another_kind_is_a_mismatch() {
    let dispatcher = FactoryDispatcher::new();
    dispatcher.register_factory(Arc::new(MockFactory::new(
        "acme",
        vec![ModelType::Chat, ModelType::Embedding],
    )));
    let embedding = model_definition("acme-embed", "acme", ModelType::Embedding);
    let err = dispatcher
        .create_chat_adapter(&embedding, &credentials())
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RuntimeError::Dispatch(DispatchError::ModelTypeMismatch { .. })
    ));

    let adapter = dispatcher
        .create_embedding_adapter(&embedding, &credentials())
        .await
        .unwrap();
    let response = adapter
        .embed(EmbeddingRequest {
            inputs: vec!["abc".into()],
        })
        .await
        .unwrap();
    assert_eq!(response.vectors, vec![vec![3.0; 4]]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_build_one_adapter() {
    let dispatcher = Arc::new(FactoryDispatcher::new());
    let factory = Arc::new(MockFactory::chat_only("acme").with_build_delay(Duration::from_millis(50)));
    dispatcher.register_factory(factory.clone());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(tokio::spawn(async move {
            dispatcher
                .create_chat_adapter(&chat_definition("acme-chat", "acme"), &credentials())
                .await
                .unwrap()
        }));
    }
    let mut adapters = Vec::new();
    for handle in handles {
        adapters.push(handle.await.unwrap());
    }

    assert_eq!(factory.created(), 1);
    assert!(adapters.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(
        dispatcher.cached_keys(),
        vec![AdapterKey::new("acme-chat", "acme")]
    );
}

#[tokio::test]
async fn construction_failure_is_retried_on_next_call() {
    let dispatcher = FactoryDispatcher::new();
    let factory = Arc::new(MockFactory::chat_only("acme"));
    dispatcher.register_factory(factory.clone());
    let definition = chat_definition("acme-chat", "acme");

    factory.set_failing(true);
    let err = dispatcher
        .create_chat_adapter(&definition, &credentials())
        .await
        .err()
        .unwrap();
    match err {
        RuntimeError::Dispatch(DispatchError::Construction { key, .. }) => {
            assert_eq!(key, "acme-chat@acme");
        }
        other => panic!("expected construction error, got {other:?}"),
    }
    assert_eq!(dispatcher.cached_adapter_count(), 0);

    factory.set_failing(false);
    dispatcher
        .create_chat_adapter(&definition, &credentials())
        .await
        .unwrap();
    assert_eq!(factory.created(), 1);
}

#[tokio::test]
async fn eviction_shuts_adapters_down_and_forces_rebuild() {
    let dispatcher = FactoryDispatcher::new();
    let factory = Arc::new(MockFactory::new(
        "acme",
        vec![ModelType::Chat, ModelType::Embedding],
    ));
    dispatcher.register_factory(factory.clone());

    let chat = chat_definition("acme-chat", "acme");
    let embed = model_definition("acme-embed", "acme", ModelType::Embedding);
    let first = dispatcher.create_chat_adapter(&chat, &credentials()).await.unwrap();
    dispatcher
        .create_embedding_adapter(&embed, &credentials())
        .await
        .unwrap();
    assert_eq!(dispatcher.cached_adapter_count(), 2);

    assert_eq!(dispatcher.evict_model("acme-chat").await, 1);
    assert_eq!(factory.shutdowns(), 1);
    let second = dispatcher.create_chat_adapter(&chat, &credentials()).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));

    assert_eq!(dispatcher.evict_provider("acme").await, 2);
    assert_eq!(dispatcher.cached_adapter_count(), 0);

    dispatcher.create_chat_adapter(&chat, &credentials()).await.unwrap();
    assert!(dispatcher.unregister_factory("acme").await);
    assert_eq!(dispatcher.cached_adapter_count(), 0);
    assert!(!dispatcher.unregister_factory("acme").await);
}

#[tokio::test]
async fn cancelling_one_stream_leaves_others_running() {
    let dispatcher = FactoryDispatcher::new();
    dispatcher.register_factory(Arc::new(MockFactory::chat_only("acme").with_hanging_streams()));
    let adapter = dispatcher
        .create_chat_adapter(&chat_definition("acme-chat", "acme"), &credentials())
        .await
        .unwrap();

    let cancelled_token = CancellationToken::new();
    let mut cancelled = stream_with_cancellation(
        adapter.stream(ChatRequest::default()).await.unwrap(),
        cancelled_token.clone(),
    );
    let mut survivor = stream_with_cancellation(
        adapter.stream(ChatRequest::default()).await.unwrap(),
        CancellationToken::new(),
    );

    assert_eq!(cancelled.next().await.unwrap().unwrap().delta, "mock");
    assert_eq!(survivor.next().await.unwrap().unwrap().delta, "mock");

    cancelled_token.cancel();
    assert!(cancelled.next().await.is_none());
    assert!(cancelled.next().await.is_none());

    let still_open = tokio::time::timeout(Duration::from_millis(50), survivor.next()).await;
    assert!(still_open.is_err(), "uncancelled stream must keep waiting");
}

#[tokio::test]
async fn gated_dispatcher_serves_only_enabled_providers() {
    let dispatcher = FactoryDispatcher::gated();
    let factory = Arc::new(MockFactory::chat_only("acme"));
    dispatcher.register_factory(factory.clone());
    let definition = chat_definition("acme-chat", "acme");

    let err = dispatcher
        .create_chat_adapter(&definition, &credentials())
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        RuntimeError::Dispatch(DispatchError::ProviderDisabled { ref provider }) if provider == "acme"
    ));
    assert_eq!(err.kind(), "dispatch_error");
    assert_eq!(factory.created(), 0);

    dispatcher.enable_provider("acme", "com.acme.plugin");
    dispatcher
        .create_chat_adapter(&definition, &credentials())
        .await
        .unwrap();

    assert!(!dispatcher.disable_provider("acme", "com.other.plugin"));
    assert!(dispatcher.is_provider_enabled("acme"));
    assert!(dispatcher.disable_provider("acme", "com.acme.plugin"));
    assert!(
        dispatcher
            .create_chat_adapter(&definition, &credentials())
            .await
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn adapter_built_while_provider_closes_is_not_cached() {
    let dispatcher = Arc::new(FactoryDispatcher::gated());
    let factory = Arc::new(MockFactory::chat_only("acme").with_build_delay(Duration::from_millis(200)));
    dispatcher.register_factory(factory.clone());
    dispatcher.enable_provider("acme", "com.acme.plugin");

    let building = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            dispatcher
                .create_chat_adapter(&chat_definition("acme-chat", "acme"), &credentials())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    dispatcher.disable_provider("acme", "com.acme.plugin");
    dispatcher.evict_provider("acme").await;

    let result = building.await.unwrap();
    assert!(matches!(
        result,
        Err(RuntimeError::Dispatch(DispatchError::ProviderDisabled { .. }))
    ));
    assert_eq!(dispatcher.cached_adapter_count(), 0);
    assert_eq!(factory.shutdowns(), 1);
}
