//! Mock gateways for integration testing
//!
//! Wiremock servers that speak the Keycloak token endpoint and the
//! OpenAI-compatible chat, embeddings and speech APIs.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Chat completions path below the `/v1` root.
pub const CHAT_PATH: &str = "/v1/chat/completions";
/// Embeddings path below the `/v1` root.
pub const EMBEDDINGS_PATH: &str = "/v1/embeddings";
/// Speech path below the `/v1` root.
pub const SPEECH_PATH: &str = "/v1/audio/speech";
/// Keycloak token path below the base URL.
pub const TOKEN_PATH: &str = "/token";

/// One mock gateway; also serves the token endpoint.
pub struct MockGateway {
    pub server: MockServer,
}

impl MockGateway {
    /// Start a new mock gateway
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the gateway (no `/v1`)
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Number of requests received on `request_path`
    pub async fn calls(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }

    /// Token endpoint issuing `token` for `client_id`
    pub async fn mock_token(&self, client_id: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains(format!("client_id={client_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_response(token)))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint answering with `status`
    pub async fn mock_token_rejected(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({"error": "unauthorized_client"})),
            )
            .mount(&self.server)
            .await;
    }

    /// Token endpoint that answers after `delay`
    pub async fn mock_token_slow(&self, token: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_response(token))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Chat completions answering `content`
    pub async fn mock_chat(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(content)))
            .mount(&self.server)
            .await;
    }

    /// Chat completions answering `content` only for `Bearer {credential}`
    pub async fn mock_chat_for(&self, credential: &str, content: &str) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(header("authorization", format!("Bearer {credential}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(content)))
            .expect(1..)
            .mount(&self.server)
            .await;
    }

    /// Chat completions returning an arbitrary JSON body
    pub async fn mock_chat_raw(&self, body: Value) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Chat completions failing with `status` `fail_count` times, then
    /// answering `content`
    pub async fn mock_flaky_chat(&self, status: u16, fail_count: u64, content: &str) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(error_response("upstream unavailable")),
            )
            .up_to_n_times(fail_count)
            .expect(fail_count)
            .mount(&self.server)
            .await;

        self.mock_chat(content).await;
    }

    /// `status` error on `request_path` for every request
    pub async fn mock_error(&self, request_path: &str, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_response(message)))
            .mount(&self.server)
            .await;
    }

    /// Embeddings echoing each numeric input back as a one-element vector
    pub async fn mock_embeddings(&self) {
        Mock::given(method("POST"))
            .and(path(EMBEDDINGS_PATH))
            .respond_with(EchoEmbeddings)
            .mount(&self.server)
            .await;
    }

    /// Speech returning `audio`, each response delayed by `delay`
    pub async fn mock_speech(&self, audio: &[u8], delay: Duration) {
        Mock::given(method("POST"))
            .and(path(SPEECH_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(audio.to_vec())
                    .insert_header("content-type", "audio/mpeg")
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Speech failing with a client error when the input contains `marker`
    pub async fn mock_speech_rejecting(&self, marker: &str) {
        Mock::given(method("POST"))
            .and(path(SPEECH_PATH))
            .and(body_string_contains(marker))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_response("bad input")))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }
}

/// Answers with one vector per input: the input parsed as a number.
struct EchoEmbeddings;

impl Respond for EchoEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let data: Vec<Value> = body["input"]
            .as_array()
            .map(|inputs| {
                inputs
                    .iter()
                    .enumerate()
                    .map(|(index, text)| {
                        let value: f64 = text.as_str().and_then(|t| t.parse().ok()).unwrap_or(0.0);
                        json!({"object": "embedding", "index": index, "embedding": [value, 1.0]})
                    })
                    .collect()
            })
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({"object": "list", "data": data}))
    }
}

/// Keycloak token response body
pub fn token_response(token: &str) -> Value {
    json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": 300
    })
}

/// OpenAI-compatible chat completion body
pub fn chat_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [
            {
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": content.split_whitespace().count(),
            "total_tokens": 10 + content.split_whitespace().count()
        }
    })
}

/// OpenAI-compatible error body
pub fn error_response(message: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": "server_error",
            "code": null
        }
    })
}
