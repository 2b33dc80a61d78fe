//! End-to-end integration tests
//!
//! Load configuration the way the binary does, connect a broker and drive
//! every service through it.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_gateway::*;
use broker_config::load_config_with;
use broker_core::AuthMode;
use broker_sdk::Service;
use std::collections::HashMap;
use std::time::Duration;

#[tokio::test]
async fn test_e2e_config_file_with_env_overrides() {
    let inference = MockGateway::new().await;
    inference.mock_token(CLIENT_ID, "kc-inference").await;
    inference.mock_chat_for("kc-inference", "configured").await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("broker.yaml");
    std::fs::write(
        &file,
        format!(
            "base_url: {}\nmodel_name: file-model\nmax_retries: 2\nretry_min_wait: 1ms\nretry_max_wait: 2ms\n",
            inference.url()
        ),
    )
    .unwrap();

    let env: HashMap<&str, String> = HashMap::from([
        ("KEYCLOAK_CLIENT_ID", CLIENT_ID.to_string()),
        ("KEYCLOAK_CLIENT_SECRET", CLIENT_SECRET.to_string()),
        ("INFERENCE_MODEL_NAME", "env-model".to_string()),
    ]);
    let config = load_config_with(Some(&file), |key| env.get(key).cloned())
        .await
        .unwrap();

    assert_eq!(config.model_name, "env-model");
    assert_eq!(config.max_retries, 2);

    let broker = connect(config).await;
    assert_eq!(broker.auth_mode(Service::Inference), Some(AuthMode::Keycloak));
    assert_eq!(broker.inference().settings().model, "env-model");
    assert_eq!(broker.inference().complete("hi").await.unwrap(), "configured");
}

#[tokio::test]
async fn test_e2e_keycloak_per_service() {
    let inference = MockGateway::new().await;
    let speech = MockGateway::new().await;
    inference.mock_token(CLIENT_ID, "kc-inference").await;
    speech.mock_token(CLIENT_ID, "kc-speech").await;
    inference.mock_chat_for("kc-inference", "text").await;
    speech.mock_speech(b"audio", Duration::ZERO).await;

    let config = broker_config::GatewayConfig {
        tts_base_url: Some(speech.url()),
        ..keycloak_config(&inference.url())
    };
    let broker = connect(config).await;

    assert_eq!(broker.auth_mode(Service::Inference), Some(AuthMode::Keycloak));
    assert_eq!(broker.auth_mode(Service::Speech), Some(AuthMode::Keycloak));
    assert_eq!(broker.speech().unwrap().auth_decision().credential(), "kc-speech");
    assert_eq!(inference.calls(TOKEN_PATH).await, 1);
    assert_eq!(speech.calls(TOKEN_PATH).await, 1);

    assert_eq!(broker.inference().complete("hi").await.unwrap(), "text");
    let audio = broker.speech().unwrap().synthesize("hi", None, None).await.unwrap();
    assert_eq!(&audio[..], b"audio");

    let requests = speech.server.received_requests().await.unwrap();
    let speech_call = requests
        .iter()
        .find(|r| r.url.path() == SPEECH_PATH)
        .unwrap();
    assert_eq!(
        speech_call.headers.get("authorization").unwrap().to_str().unwrap(),
        bearer("kc-speech")
    );
}

#[tokio::test]
async fn test_e2e_full_workflow() {
    let inference = MockGateway::new().await;
    let speech = MockGateway::new().await;
    inference.mock_chat(FENCED_RUST).await;
    inference.mock_embeddings().await;
    speech.mock_speech(b"ID3", Duration::ZERO).await;

    let broker = connect(with_speech(api_key_config(&inference.url()), &speech.url())).await;
    assert!(broker.is_authenticated());
    assert_eq!(broker.auth_mode(Service::Embeddings), Some(AuthMode::ApiKey));
    assert_eq!(broker.auth_mode(Service::Speech), Some(AuthMode::ApiKey));

    let translated = broker
        .inference()
        .translate_code(PYTHON_SOURCE, "python", "rust")
        .await
        .unwrap();
    assert!(translated.text.starts_with("fn add"));

    let vector = broker.embeddings().embed_text("2.5").await.unwrap();
    assert_eq!(vector, vec![2.5, 1.0]);

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("audio/summary.mp3");
    broker
        .speech()
        .unwrap()
        .synthesize_to("Translation finished.", Some("onyx"), Some(1.5), &target)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"ID3");
}

#[tokio::test]
async fn test_e2e_speech_disabled_without_tts_url() {
    let inference = MockGateway::new().await;
    let broker = connect(test_config(&inference.url())).await;

    assert!(broker.speech().is_err());
    assert_eq!(broker.auth_mode(Service::Speech), None);
    assert_eq!(broker.auth_mode(Service::Inference), Some(AuthMode::Open));
}

#[tokio::test]
async fn test_e2e_missing_base_url_fails_to_load() {
    let err = load_config_with(None, |_| None).await.unwrap_err();
    assert!(err.to_string().contains("BASE_URL"));
}
