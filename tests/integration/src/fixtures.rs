//! Test fixtures and sample data for integration tests

use broker_config::GatewayConfig;
use secrecy::SecretString;
use std::time::Duration;

/// Keycloak client id used by the fixtures.
pub const CLIENT_ID: &str = "broker-tests";
/// Keycloak client secret used by the fixtures.
pub const CLIENT_SECRET: &str = "s3cr3t";
/// Static inference key used by the fixtures.
pub const API_KEY: &str = "sk-inference-test";
/// Static speech key used by the fixtures.
pub const TTS_KEY: &str = "sk-tts-test";

/// Config for `base_url` in open mode with millisecond retry waits
pub fn test_config(base_url: &str) -> GatewayConfig {
    GatewayConfig {
        base_url: Some(base_url.to_string()),
        max_retries: 3,
        retry_min_wait: Duration::from_millis(1),
        retry_max_wait: Duration::from_millis(5),
        token_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// [`test_config`] with a Keycloak client pair
pub fn keycloak_config(base_url: &str) -> GatewayConfig {
    GatewayConfig {
        keycloak_client_id: Some(CLIENT_ID.to_string()),
        keycloak_client_secret: Some(SecretString::new(CLIENT_SECRET.to_string())),
        ..test_config(base_url)
    }
}

/// [`test_config`] with a static inference key
pub fn api_key_config(base_url: &str) -> GatewayConfig {
    GatewayConfig {
        inference_api_key: Some(SecretString::new(API_KEY.to_string())),
        ..test_config(base_url)
    }
}

/// Add a speech gateway with its own key
pub fn with_speech(config: GatewayConfig, tts_base_url: &str) -> GatewayConfig {
    GatewayConfig {
        tts_base_url: Some(tts_base_url.to_string()),
        tts_api_key: Some(SecretString::new(TTS_KEY.to_string())),
        ..config
    }
}

/// Narration segments for batch speech tests
pub fn narration(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("Segment number {i} of the narration."))
        .collect()
}

/// Alternating voices, one per segment
pub fn voices(count: usize) -> Vec<String> {
    ["alloy", "echo", "nova"]
        .iter()
        .cycle()
        .take(count)
        .map(|v| (*v).to_string())
        .collect()
}

/// Python snippet used by translation tests
pub const PYTHON_SOURCE: &str = "def add(a, b):\n    return a + b\n";

/// Rust translation wrapped the way models usually answer
pub const FENCED_RUST: &str = "```rust\nfn add(a: i64, b: i64) -> i64 {\n    a + b\n}\n```";
