//! Integration tests for the HTTP embedding provider against a mock service.

use docsearch_embeddings::{
    EmbeddingError, EmbeddingProvider, EmbeddingRequest, HttpEmbeddingProvider, ServiceConfig,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn embedding_body(embedding: &[f32]) -> serde_json::Value {
    serde_json::json!({
        "object": "list",
        "data": [{ "object": "embedding", "embedding": embedding, "index": 0 }],
        "model": "ada",
        "usage": { "prompt_tokens": 3, "total_tokens": 3 }
    })
}

fn azure_provider(server: &MockServer) -> HttpEmbeddingProvider {
    let config = ServiceConfig::azure(server.uri(), "ada-deploy").with_api_key("test-key");
    HttpEmbeddingProvider::new(config).unwrap()
}

#[tokio::test]
async fn test_azure_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/ada-deploy/embeddings"))
        .and(query_param("api-version", "2023-05-15"))
        .and(header("api-key", "test-key"))
        .and(body_json(serde_json::json!({ "input": ["hello world"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[0.5, 0.25])))
        .expect(1)
        .mount(&server)
        .await;

    let provider = azure_provider(&server);
    let response = provider
        .embed(EmbeddingRequest::new("hello world"))
        .await
        .unwrap();

    assert_eq!(response.embedding, vec![0.5, 0.25]);
    assert_eq!(response.dimension(), 2);
    assert_eq!(response.tokens_used, Some(3));
    assert_eq!(response.model, "ada");
}

#[tokio::test]
async fn test_openai_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_json(serde_json::json!({
            "input": ["query"],
            "model": "text-embedding-3-small"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[1.0, 0.0, 0.0])))
        .mount(&server)
        .await;

    let config = ServiceConfig::openai(format!("{}/v1", server.uri()), "text-embedding-3-small")
        .with_api_key("test-key");
    let provider = HttpEmbeddingProvider::new(config).unwrap();

    let embedding = provider.embed_text("query").await.unwrap();
    assert_eq!(embedding, vec![1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let err = azure_provider(&server).embed_text("x").await.unwrap_err();
    match err {
        EmbeddingError::Authentication { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = azure_provider(&server).embed_text("x").await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::RateLimited {
            retry_after_secs: 7
        }
    ));
    assert!(err.is_service_error());
}

#[tokio::test]
async fn test_token_limit_rejection_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string("This model's maximum context length is 8191 tokens"),
        )
        .mount(&server)
        .await;

    let err = azure_provider(&server).embed_text("x").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::ApiRequest { status: 400, .. }));
}

#[tokio::test]
async fn test_empty_data_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
        )
        .mount(&server)
        .await;

    let err = azure_provider(&server).embed_text("x").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = azure_provider(&server).embed_text("x").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::InvalidResponse(_)));
    assert!(err.is_service_error());
}

#[tokio::test]
async fn test_pinned_dimension_is_enforced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[1.0, 2.0])))
        .mount(&server)
        .await;

    let config = ServiceConfig::azure(server.uri(), "ada")
        .with_api_key("test-key")
        .with_dimension(1536);
    let provider = HttpEmbeddingProvider::new(config).unwrap();
    assert_eq!(provider.dimension(), Some(1536));

    let err = provider.embed_text("x").await.unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::DimensionMismatch {
            expected: 1536,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(embedding_body(&[1.0]))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ServiceConfig::azure(server.uri(), "ada")
        .with_api_key("test-key")
        .with_timeout_secs(1);
    let provider = HttpEmbeddingProvider::new(config).unwrap();

    let err = provider.embed_text("x").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::Timeout { timeout_secs: 1 }));
}
