use super::*;
use serde::Deserialize;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

#[derive(Debug, Deserialize, PartialEq)]
struct Greeting {
    message: String,
}

fn url_for(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).expect("mock url should parse")
}

/// A URL on a port nothing listens on
fn closed_port_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("should bind");
    let port = listener.local_addr().expect("should have address").port();
    drop(listener);
    Url::parse(&format!("http://127.0.0.1:{}/", port)).expect("url should parse")
}

#[test]
fn client_defaults() {
    let client = HttpClient::new("Ollama");
    assert_eq!(client.service, "Ollama");
    assert_eq!(client.retry_attempts, 1);

    let client = client.with_retry_attempts(0);
    assert_eq!(client.retry_attempts, 1);
}

#[tokio::test]
async fn get_json_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "hi"})))
        .mount(&server)
        .await;

    let client = HttpClient::new("test");
    let greeting: Greeting = client
        .get_json(&url_for(&server, "/hello"))
        .expect("get should succeed");

    assert_eq!(greeting.message, "hi");
}

#[tokio::test]
async fn post_json_sends_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(body_json(json!({"message": "ping"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "pong"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new("test");
    let reply: Greeting = client
        .post_json(&url_for(&server, "/echo"), &json!({"message": "ping"}))
        .expect("post should succeed");

    assert_eq!(reply.message, "pong");
}

#[tokio::test]
async fn not_found_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = HttpClient::new("test");
    let result: Result<Greeting> = client.get_json(&url_for(&server, "/missing"));

    assert!(matches!(result, Err(RagError::NotFound(_))));
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = HttpClient::new("test");
    let result: Result<Greeting> = client.get_json(&url_for(&server, "/broken"));

    assert!(matches!(result, Err(RagError::BackendUnavailable(_))));
}

#[tokio::test]
async fn client_error_is_invalid_input() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let client = HttpClient::new("test");
    let result: Result<Greeting> = client.get_json(&url_for(&server, "/bad"));

    assert!(matches!(result, Err(RagError::InvalidInput(_))));
}

#[tokio::test]
async fn malformed_body_is_invalid_input() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = HttpClient::new("test");
    let result: Result<Greeting> = client.get_json(&url_for(&server, "/garbled"));

    assert!(matches!(result, Err(RagError::InvalidInput(_))));
}

#[test]
fn connection_refused_is_unavailable() {
    let client = HttpClient::new("test").with_timeout(Duration::from_secs(2));
    let result: Result<Greeting> = client.get_json(&closed_port_url());

    let error = result.expect_err("request should fail");
    assert!(error.is_unavailable(), "unexpected error: {}", error);
}

#[tokio::test]
async fn retries_server_errors_when_enabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .mount(&server)
        .await;

    let client = HttpClient::new("test")
        .with_retry_attempts(3)
        .with_backoff(Duration::from_millis(10));
    let greeting: Greeting = client
        .get_json(&url_for(&server, "/flaky"))
        .expect("should succeed after retries");

    assert_eq!(greeting.message, "ok");
}

#[tokio::test]
async fn single_attempt_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new("test");
    let result: Result<Greeting> = client.get_json(&url_for(&server, "/flaky"));

    assert!(result.is_err());
}
