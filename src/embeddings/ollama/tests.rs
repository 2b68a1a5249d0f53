use super::*;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn config_for(server: &MockServer, batch_size: u32) -> EmbeddingConfig {
    let url = Url::parse(&server.uri()).expect("mock uri should parse");
    EmbeddingConfig {
        protocol: url.scheme().to_string(),
        host: url.host_str().expect("mock uri has host").to_string(),
        port: url.port().expect("mock uri has port"),
        model: "all-minilm".to_string(),
        batch_size,
        timeout_seconds: 5,
    }
}

#[test]
fn client_configuration() {
    let config = EmbeddingConfig {
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        ..EmbeddingConfig::default()
    };
    let client = OllamaEmbedder::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.model_name(), "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
}

#[tokio::test]
async fn retry_attempts_repeat_unavailable_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 16))
        .expect("should create client")
        .with_timeout(Duration::from_secs(5))
        .with_retry_attempts(2);
    let result = embedder.embed_one("hello").await;

    assert!(matches!(result, Err(RagError::BackendUnavailable(_))));
}

#[test]
fn model_name_matching() {
    assert!(model_matches("all-minilm:latest", "all-minilm"));
    assert!(model_matches("all-minilm:latest", "all-minilm:latest"));
    assert!(model_matches("llama3.2:1b", "llama3.2:1b"));
    assert!(!model_matches("llama3.2:1b", "llama3.2"));
    assert!(!model_matches("all-minilm-l12:latest", "all-minilm"));
}

#[tokio::test]
async fn embed_preserves_order_across_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["one", "two"]})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0], [2.0, 0.0]]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"input": ["three"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[3.0, 0.0]]})))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 2)).expect("should create client");
    let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
    let vectors = embedder.embed(&texts).await.expect("embedding should succeed");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]]);
}

#[tokio::test]
async fn embed_one_sends_model_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({"model": "all-minilm", "input": ["query"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5, 0.5]]})))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 16)).expect("should create client");
    let vector = embedder.embed_one("query").await.expect("embedding should succeed");

    assert_eq!(vector, vec![0.5, 0.5, 0.5]);
}

#[tokio::test]
async fn embed_empty_input_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 16)).expect("should create client");
    let vectors = embedder.embed(&[]).await.expect("empty input should succeed");

    assert!(vectors.is_empty());
}

#[tokio::test]
async fn count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0]]})))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 16)).expect("should create client");
    let texts = vec!["a".to_string(), "b".to_string()];
    let result = embedder.embed(&texts).await;

    assert!(matches!(result, Err(RagError::InvalidInput(_))));
}

#[tokio::test]
async fn unknown_model_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 16)).expect("should create client");
    let result = embedder.embed_one("hello").await;

    assert!(matches!(result, Err(RagError::NotFound(_))));
}

#[tokio::test]
async fn health_check_validates_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "all-minilm:latest", "size": 45960996, "digest": "1b226e2802db"},
                {"name": "llama3.2:latest"}
            ]
        })))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 16)).expect("should create client");
    assert!(embedder.health_check().is_ok());
    assert!(embedder.is_reachable().await);

    let mut other = config_for(&server, 16);
    other.model = "nomic-embed-text".to_string();
    let embedder = OllamaEmbedder::new(&other).expect("should create client");
    assert!(matches!(embedder.health_check(), Err(RagError::NotFound(_))));
}

#[tokio::test]
async fn missing_model_is_not_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3.2:latest"}]
        })))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedder::new(&config_for(&server, 16)).expect("should create client");
    assert!(!embedder.is_reachable().await);
}
