//! HTTP provider behavior against a mock embedding endpoint.

use httpmock::prelude::*;
use serde_json::json;
use url::Url;

use docloom::embedding::{Embedder, EmbeddingModel, HttpEmbedder};
use docloom::types::PipelineError;

fn mock_endpoint(server: &MockServer) -> Url {
    Url::parse(&server.url("/v1/embeddings")).unwrap()
}

#[tokio::test]
async fn submits_normalized_text_with_openai_encoding_format() {
    let server = MockServer::start_async().await;
    let vector: Vec<f32> = vec![0.25; 1536];
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .header("authorization", "Bearer test-key")
                .json_body_includes(
                    r#"{"input": "line one line two", "model": "text-embedding-3-small", "encoding_format": "float"}"#,
                );
            then.status(200)
                .json_body(json!({"data": [{"embedding": vector}]}));
        })
        .await;

    let embedder = HttpEmbedder::new("text-embedding-3-small", "test-key")
        .unwrap()
        .with_endpoint(mock_endpoint(&server));

    let result = embedder.embed("line one\nline two\n").await.unwrap();
    assert_eq!(result.len(), 1536);
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_is_a_provider_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(500).body("upstream exploded");
        })
        .await;

    let embedder = HttpEmbedder::new("text-embedding-3-small", "test-key")
        .unwrap()
        .with_endpoint(mock_endpoint(&server));

    let err = embedder.embed("some chunk text").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));
    assert!(err.to_string().contains("500"));
    mock.assert_async().await;
}

#[tokio::test]
async fn unknown_model_fails_before_any_network_call() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200).json_body(json!({"data": []}));
        })
        .await;

    let err = HttpEmbedder::new("unknown-model", "test-key").unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert!(EmbeddingModel::resolve("unknown-model").is_err());
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn empty_data_array_is_a_provider_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200).json_body(json!({"data": []}));
        })
        .await;

    let embedder = HttpEmbedder::new("text-embedding-3-small", "test-key")
        .unwrap()
        .with_endpoint(mock_endpoint(&server));

    let err = embedder.embed("text").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));
}

#[tokio::test]
async fn mis_sized_vector_is_a_provider_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/embeddings");
            then.status(200)
                .json_body(json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]}));
        })
        .await;

    let embedder = HttpEmbedder::new("text-embedding-3-small", "test-key")
        .unwrap()
        .with_endpoint(mock_endpoint(&server));

    let err = embedder.embed("text").await.unwrap_err();
    assert!(matches!(err, PipelineError::Provider(_)));
    assert!(err.to_string().contains("dimension"));
}

#[tokio::test]
async fn together_models_route_without_encoding_format() {
    let server = MockServer::start_async().await;
    let vector: Vec<f32> = vec![0.5; 768];
    let mock = server
        .mock_async(move |when, then| {
            // Exact body match: no encoding_format field for TogetherAI.
            when.method(POST).path("/v1/embeddings").json_body(json!({
                "input": "retrieval text",
                "model": "togethercomputer/m2-bert-80M-8k-retrieval"
            }));
            then.status(200)
                .json_body(json!({"data": [{"embedding": vector}]}));
        })
        .await;

    let embedder = HttpEmbedder::new("togethercomputer/m2-bert-80M-8k-retrieval", "test-key")
        .unwrap()
        .with_endpoint(mock_endpoint(&server));

    let result = embedder.embed("retrieval text").await.unwrap();
    assert_eq!(result.len(), 768);
    mock.assert_async().await;
}
