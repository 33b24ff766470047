// Tests for the text-generation client

use reelsort_augment::{AugmentError, Augmentor, ChatClient, GenerationRequest, TextGenerator};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

// ============================================================================
// ChatClient Tests
// ============================================================================

#[test]
fn test_chat_client_endpoint_is_joined() {
    let client = ChatClient::new("http://localhost:4891").unwrap();
    assert_eq!(
        client.endpoint().as_str(),
        "http://localhost:4891/v1/chat/completions"
    );
}

#[test]
fn test_chat_client_rejects_invalid_url() {
    let result = ChatClient::new("not a url");
    assert!(matches!(result, Err(AugmentError::InvalidUrl(_))));
}

#[test]
fn test_chat_client_with_model() {
    let client = ChatClient::new("http://localhost:11434")
        .unwrap()
        .with_model("llama3");
    assert_eq!(client.model(), "llama3");
}

#[tokio::test]
async fn test_generate_returns_trimmed_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "llama3", "max_tokens": 20 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  A summary.  ")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri()).unwrap().with_model("llama3");
    let request = GenerationRequest::new("Summarise".to_string()).with_max_tokens(20);
    let text = client.generate(&request).await.unwrap();

    assert_eq!(text, "A summary.");
}

#[tokio::test]
async fn test_generate_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri()).unwrap();
    let request = GenerationRequest::new("Summarise".to_string());
    let result = client.generate(&request).await;

    assert!(matches!(result, Err(AugmentError::Status(503))));
}

#[tokio::test]
async fn test_generate_empty_choices_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri()).unwrap();
    let request = GenerationRequest::new("Summarise".to_string());
    let result = client.generate(&request).await;

    assert!(matches!(result, Err(AugmentError::EmptyResponse)));
}

// ============================================================================
// Augmentor Tests
// ============================================================================

#[tokio::test]
async fn test_augmentor_plot_from_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Heroes save the day.")))
        .mount(&server)
        .await;

    let augmentor = Augmentor::new(ChatClient::new(&server.uri()).unwrap());
    let plot = augmentor
        .franchise_plot(&["A hero rises.".to_string(), "The hero returns.".to_string()])
        .await;

    assert_eq!(plot.as_deref(), Some("Heroes save the day."));
}

#[tokio::test]
async fn test_augmentor_without_input_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let augmentor = Augmentor::new(ChatClient::new(&server.uri()).unwrap());
    let awards = augmentor.franchise_awards(&["N/A".to_string()]).await;

    assert!(awards.is_none());
}

#[tokio::test]
async fn test_augmentor_unavailable_server_leaves_field_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let augmentor = Augmentor::new(ChatClient::new(&server.uri()).unwrap());
    let awards = augmentor
        .franchise_awards(&["Won 1 Oscar.".to_string()])
        .await;

    assert!(awards.is_none());
}
