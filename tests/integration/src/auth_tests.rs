//! Auth resolution tests against a mock Keycloak token endpoint

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_gateway::*;
use broker_auth::{AuthResolver, AuthSettings, TierOutcome};
use broker_core::{AuthMode, BrokerError, OPEN_MODE_CREDENTIAL};
use broker_sdk::{Broker, Service};
use std::time::Duration;

#[tokio::test]
async fn test_keycloak_token_is_used_for_chat() {
    let gateway = MockGateway::new().await;
    gateway.mock_token(CLIENT_ID, "kc-access-token").await;
    gateway.mock_chat_for("kc-access-token", "hello from keycloak").await;

    let broker = connect(keycloak_config(&gateway.url())).await;

    assert_eq!(broker.auth_mode(Service::Inference), Some(AuthMode::Keycloak));
    assert!(broker.is_authenticated());
    let answer = broker.inference().complete("hi").await.unwrap();
    assert_eq!(answer, "hello from keycloak");
    assert_eq!(gateway.calls(TOKEN_PATH).await, 1);
}

#[tokio::test]
async fn test_rejected_token_falls_through_to_api_key() {
    let gateway = MockGateway::new().await;
    gateway.mock_token_rejected(401).await;
    gateway.mock_chat_for(API_KEY, "hello from api key").await;

    let config = broker_config::GatewayConfig {
        inference_api_key: api_key_config(&gateway.url()).inference_api_key,
        ..keycloak_config(&gateway.url())
    };
    let broker = connect(config).await;

    let resolution = broker.resolution(Service::Inference).unwrap();
    assert_eq!(resolution.decision.mode(), AuthMode::ApiKey);
    assert_eq!(resolution.attempts[0].tier, AuthMode::Keycloak);
    assert!(matches!(
        &resolution.attempts[0].outcome,
        TierOutcome::Failed { reason } if reason.contains("401")
    ));
    assert_eq!(resolution.attempts[1].outcome, TierOutcome::Selected);

    let answer = broker.inference().complete("hi").await.unwrap();
    assert_eq!(answer, "hello from api key");
}

#[tokio::test]
async fn test_failed_keycloak_without_key_is_open_mode() {
    let gateway = MockGateway::new().await;
    gateway.mock_token_rejected(500).await;
    gateway.mock_chat_for(OPEN_MODE_CREDENTIAL, "hello anonymous").await;

    let broker = connect(keycloak_config(&gateway.url())).await;

    assert_eq!(broker.auth_mode(Service::Inference), Some(AuthMode::Open));
    assert!(!broker.is_authenticated());
    let answer = broker.inference().complete("hi").await.unwrap();
    assert_eq!(answer, "hello anonymous");
}

#[tokio::test]
async fn test_unconfigured_keycloak_makes_no_token_call() {
    let gateway = MockGateway::new().await;
    gateway.mock_token(CLIENT_ID, "unused").await;

    let broker = connect(api_key_config(&gateway.url())).await;

    assert_eq!(broker.auth_mode(Service::Inference), Some(AuthMode::ApiKey));
    assert_eq!(gateway.calls(TOKEN_PATH).await, 0);

    let attempts = &broker.resolution(Service::Inference).unwrap().attempts;
    assert!(!attempts[0].was_attempted());
}

#[tokio::test]
async fn test_partial_keycloak_pair_is_skipped() {
    let gateway = MockGateway::new().await;
    gateway.mock_token(CLIENT_ID, "unused").await;

    let config = broker_config::GatewayConfig {
        keycloak_client_id: Some(CLIENT_ID.to_string()),
        ..api_key_config(&gateway.url())
    };
    let broker = connect(config).await;

    assert_eq!(broker.auth_mode(Service::Inference), Some(AuthMode::ApiKey));
    assert_eq!(gateway.calls(TOKEN_PATH).await, 0);
}

#[tokio::test]
async fn test_partial_keycloak_pair_rejected_in_strict_mode() {
    let gateway = MockGateway::new().await;
    let config = broker_config::GatewayConfig {
        keycloak_client_id: Some(CLIENT_ID.to_string()),
        strict_auth: true,
        ..api_key_config(&gateway.url())
    };

    let err = Broker::connect(config).await.unwrap_err();
    assert!(matches!(err, BrokerError::Config { .. }));
}

#[tokio::test]
async fn test_slow_token_endpoint_times_out() {
    let gateway = MockGateway::new().await;
    gateway
        .mock_token_slow("too-late", Duration::from_millis(500))
        .await;

    let config = broker_config::GatewayConfig {
        token_timeout: Duration::from_millis(50),
        ..keycloak_config(&gateway.url())
    };
    let broker = connect(config).await;

    let resolution = broker.resolution(Service::Inference).unwrap();
    assert_eq!(resolution.decision.mode(), AuthMode::Open);
    assert!(matches!(
        &resolution.attempts[0].outcome,
        TierOutcome::Failed { reason } if reason.contains("timed out")
    ));
}

#[tokio::test]
async fn test_open_mode_disabled_after_keycloak_failure() {
    let gateway = MockGateway::new().await;
    gateway.mock_token_rejected(403).await;

    let config = broker_config::GatewayConfig {
        allow_open_mode: false,
        ..keycloak_config(&gateway.url())
    };

    let err = Broker::connect(config).await.unwrap_err();
    assert!(matches!(err, BrokerError::Config { .. }));
}

#[tokio::test]
async fn test_resolution_is_cached() {
    let gateway = MockGateway::new().await;
    gateway.mock_token(CLIENT_ID, "kc-cached").await;

    let config = keycloak_config(&gateway.url());
    let resolver = AuthResolver::new(
        AuthSettings::from_config(&config, &config.inference_endpoint()),
        config.tls_insecure,
    )
    .unwrap();

    let first = resolver.resolve().await.unwrap();
    let second = resolver.resolve().await.unwrap();

    assert_eq!(first.credential(), "kc-cached");
    assert_eq!(second.credential(), "kc-cached");
    assert_eq!(resolver.cached().map(|d| d.mode()), Some(AuthMode::Keycloak));
    assert_eq!(gateway.calls(TOKEN_PATH).await, 1);
}

#[tokio::test]
async fn test_bearer_header_carries_credential() {
    let gateway = MockGateway::new().await;
    gateway.mock_chat("ok").await;

    let broker = connect(api_key_config(&gateway.url())).await;
    broker.inference().complete("hi").await.unwrap();

    let requests = gateway.server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap();
    assert_eq!(auth.to_str().unwrap(), bearer(API_KEY));
}
