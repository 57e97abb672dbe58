//! Integration tests for `OpenAiClient` against a local `wiremock` server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use saledesk_extract::{CompletionRequest, ExtractError, ModelClient, OpenAiClient};

fn client(server: &MockServer, max_retries: u32) -> OpenAiClient {
    OpenAiClient::new(&server.uri(), "sk-test", "gpt-4o-mini", 5, max_retries, 0)
        .expect("failed to build test OpenAiClient")
}

fn request() -> CompletionRequest {
    CompletionRequest {
        system: "extract".to_string(),
        user: "<h1>Ankle Boot</h1>".to_string(),
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn complete_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0,
            "response_format": { "type": "json_object" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"salePrice": 128}"#)))
        .expect(1)
        .mount(&server)
        .await;

    let content = client(&server, 0).complete(&request()).await.unwrap();

    assert_eq!(content, r#"{"salePrice": 128}"#);
}

#[tokio::test]
async fn unauthorized_maps_to_upstream_auth_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3).complete(&request()).await.unwrap_err();

    assert!(
        matches!(err, ExtractError::UpstreamAuth { status: 401, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn rate_limit_is_retried_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(1)
        .mount(&server)
        .await;

    let content = client(&server, 2).complete(&request()).await.unwrap();

    assert_eq!(content, "{}");
}

#[tokio::test]
async fn persistent_rate_limit_surfaces_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server, 1).complete(&request()).await.unwrap_err();

    assert!(matches!(err, ExtractError::RateLimited { .. }), "got: {err:?}");
}

#[tokio::test]
async fn missing_content_is_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = client(&server, 0).complete(&request()).await.unwrap_err();

    assert!(matches!(err, ExtractError::Parse(_)), "got: {err:?}");
}
