//! Generation gateway tests: retry, response validation and endpoints

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_gateway::*;
use broker_core::{BrokerError, ChatMessage, GenerationRequest};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_retry_recovers_after_two_failures() {
    let gateway = MockGateway::new().await;
    gateway.mock_flaky_chat(503, 2, "third time lucky").await;

    let broker = connect(api_key_config(&gateway.url())).await;
    let answer = broker.inference().complete("hi").await.unwrap();

    assert_eq!(answer, "third time lucky");
    assert_eq!(gateway.calls(CHAT_PATH).await, 3);
}

#[tokio::test]
async fn test_retries_exhausted_returns_last_error() {
    let gateway = MockGateway::new().await;
    gateway.mock_error(CHAT_PATH, 502, "bad gateway").await;

    let broker = connect(api_key_config(&gateway.url())).await;
    let err = broker.inference().complete("hi").await.unwrap_err();

    assert!(matches!(
        &err,
        BrokerError::Transient { status: Some(502), message } if message == "bad gateway"
    ));
    assert_eq!(gateway.calls(CHAT_PATH).await, 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let gateway = MockGateway::new().await;
    gateway.mock_error(CHAT_PATH, 400, "context length exceeded").await;

    let broker = connect(api_key_config(&gateway.url())).await;
    let err = broker.inference().complete("hi").await.unwrap_err();

    assert_eq!(err.status_code(), Some(400));
    assert!(!err.is_retryable());
    assert_eq!(gateway.calls(CHAT_PATH).await, 1);
}

#[tokio::test]
async fn test_request_timeout_is_retried() {
    let gateway = MockGateway::new().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("slow"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&gateway.server)
        .await;

    let config = broker_config::GatewayConfig {
        request_timeout: Duration::from_millis(50),
        max_retries: 2,
        ..api_key_config(&gateway.url())
    };
    let broker = connect(config).await;
    let err = broker.inference().complete("hi").await.unwrap_err();

    assert!(matches!(err, BrokerError::Timeout { .. }));
    assert_eq!(gateway.calls(CHAT_PATH).await, 2);
}

#[tokio::test]
async fn test_missing_choices_yield_empty_text() {
    let gateway = MockGateway::new().await;
    gateway.mock_chat_raw(json!({"model": "test-model", "choices": []})).await;

    let broker = connect(test_config(&gateway.url())).await;
    let result = broker
        .inference()
        .chat(&GenerationRequest::user("hi"))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.raw_character_count, 0);
}

#[tokio::test]
async fn test_unexpected_body_degrades_to_empty_text() {
    let gateway = MockGateway::new().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&gateway.server)
        .await;

    let broker = connect(test_config(&gateway.url())).await;
    let text = broker.inference().complete("hi").await.unwrap();

    assert_eq!(text, "");
    assert_eq!(gateway.calls(CHAT_PATH).await, 1);
}

#[tokio::test]
async fn test_null_choices_degrade_to_empty_text() {
    let gateway = MockGateway::new().await;
    gateway.mock_chat_raw(json!({"choices": null})).await;

    let broker = connect(test_config(&gateway.url())).await;
    let text = broker.inference().complete("hi").await.unwrap();

    assert_eq!(text, "");
    assert_eq!(gateway.calls(CHAT_PATH).await, 1);
}

#[tokio::test]
async fn test_request_defaults_and_overrides_reach_the_wire() {
    let gateway = MockGateway::new().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(json!({
            "model": "override-model",
            "temperature": 0.5,
            "max_tokens": 4096,
            "messages": [
                {"role": "system", "content": "be terse"},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&gateway.server)
        .await;

    let broker = connect(test_config(&gateway.url())).await;
    let request = GenerationRequest::with_system("be terse", "hi")
        .model("override-model")
        .temperature(0.5);
    let result = broker.inference().chat(&request).await.unwrap();

    assert_eq!(result.text, "ok");
    assert_eq!(result.usage.map(|u| u.total_tokens), Some(11));
}

#[tokio::test]
async fn test_chat_complete_sends_conversation() {
    let gateway = MockGateway::new().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "user", "content": "2 + 2?"},
                {"role": "assistant", "content": "4"},
                {"role": "user", "content": "times 3?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("12")))
        .expect(1)
        .mount(&gateway.server)
        .await;

    let broker = connect(test_config(&gateway.url())).await;
    let answer = broker
        .inference()
        .chat_complete(vec![
            ChatMessage::user("2 + 2?"),
            ChatMessage::assistant("4"),
            ChatMessage::user("times 3?"),
        ])
        .await
        .unwrap();

    assert_eq!(answer, "12");
}

#[tokio::test]
async fn test_translate_code_strips_fences() {
    let gateway = MockGateway::new().await;
    gateway.mock_chat(FENCED_RUST).await;

    let broker = connect(test_config(&gateway.url())).await;
    let result = broker
        .inference()
        .translate_code(PYTHON_SOURCE, "python", "rust")
        .await
        .unwrap();

    assert!(result.text.starts_with("fn add"));
    assert!(!result.text.contains("```"));
    assert_eq!(result.raw_character_count, FENCED_RUST.chars().count());
}

#[tokio::test]
async fn test_model_endpoint_segment_precedes_v1() {
    let gateway = MockGateway::new().await;
    Mock::given(method("POST"))
        .and(path("/llama-34b/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("routed")))
        .expect(1)
        .mount(&gateway.server)
        .await;

    let config = broker_config::GatewayConfig {
        inference_model_endpoint: Some("llama-34b".to_string()),
        ..test_config(&gateway.url())
    };
    let broker = connect(config).await;

    assert_eq!(
        broker.inference().client().base_url(),
        format!("{}/llama-34b/v1", gateway.url())
    );
    assert_eq!(broker.inference().complete("hi").await.unwrap(), "routed");
}

#[tokio::test]
async fn test_embeddings_chunked_on_separate_gateway() {
    let inference = MockGateway::new().await;
    let embeddings = MockGateway::new().await;
    embeddings.mock_embeddings().await;

    let config = broker_config::GatewayConfig {
        embeddings_base_url: Some(embeddings.url()),
        embedding_batch_size: 4,
        ..api_key_config(&inference.url())
    };
    let broker = connect(config).await;

    let texts: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let vectors = broker.embeddings().embed_texts(&texts).await.unwrap();

    assert_eq!(vectors.len(), 10);
    assert_eq!(vectors[7], vec![7.0, 1.0]);
    assert_eq!(embeddings.calls(EMBEDDINGS_PATH).await, 3);
    assert_eq!(inference.calls(EMBEDDINGS_PATH).await, 0);

    let requests = embeddings.server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap();
    assert_eq!(auth.to_str().unwrap(), bearer(API_KEY));
}
