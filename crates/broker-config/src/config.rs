//! Gateway configuration model.

use crate::error::{ConfigError, ConfigResult};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use url::Url;
use validator::Validate;

/// Complete broker configuration.
///
/// Loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inference gateway base URL; also hosts the Keycloak `/token` endpoint.
    pub base_url: Option<String>,
    /// Embeddings gateway base URL (falls back to `base_url`).
    pub embeddings_base_url: Option<String>,
    /// Text-to-speech gateway base URL.
    pub tts_base_url: Option<String>,
    /// Path segment inserted between the base URL and `/v1` for inference.
    pub inference_model_endpoint: Option<String>,

    /// Keycloak client ID.
    pub keycloak_client_id: Option<String>,
    /// Keycloak client secret.
    pub keycloak_client_secret: Option<SecretString>,
    /// Static API key for inference and embeddings.
    pub inference_api_key: Option<SecretString>,
    /// Static API key for text-to-speech.
    pub tts_api_key: Option<SecretString>,

    /// Chat model name.
    pub model_name: String,
    /// Embedding model name.
    pub embedding_model_name: String,
    /// Speech model name.
    pub tts_model: String,
    /// Default speech voice.
    pub tts_voice: String,
    /// Default speech speed.
    #[validate(range(min = 0.25, max = 4.0))]
    pub tts_speed: f32,

    /// Default sampling temperature.
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    /// Default completion token limit.
    #[validate(range(min = 1))]
    pub max_tokens: u32,
    /// Sampling temperature for code translation.
    #[validate(range(min = 0.0, max = 2.0))]
    pub translation_temperature: f32,
    /// Completion token limit for code translation.
    #[validate(range(min = 1))]
    pub translation_max_tokens: u32,

    /// Total attempts per remote call.
    #[validate(range(min = 1, max = 20))]
    pub max_retries: u32,
    /// Lower bound of the backoff window.
    #[serde(with = "humantime_serde")]
    pub retry_min_wait: Duration,
    /// Upper bound of the backoff window.
    #[serde(with = "humantime_serde")]
    pub retry_max_wait: Duration,
    /// Concurrency cap for batch calls.
    #[validate(range(min = 1, max = 1024))]
    pub max_concurrent_requests: usize,
    /// Inputs per embeddings request.
    #[validate(range(min = 1))]
    pub embedding_batch_size: usize,

    /// Timeout for the Keycloak token exchange.
    #[serde(with = "humantime_serde")]
    pub token_timeout: Duration,
    /// Per-request HTTP timeout for gateway calls.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Skip TLS certificate verification for gateway calls.
    pub tls_insecure: bool,
    /// Accept unauthenticated open mode when no tier is configured.
    pub allow_open_mode: bool,
    /// Treat a partially configured Keycloak pair as an error.
    pub strict_auth: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            embeddings_base_url: None,
            tts_base_url: None,
            inference_model_endpoint: None,
            keycloak_client_id: None,
            keycloak_client_secret: None,
            inference_api_key: None,
            tts_api_key: None,
            model_name: Self::DEFAULT_MODEL.to_string(),
            embedding_model_name: Self::DEFAULT_EMBEDDING_MODEL.to_string(),
            tts_model: Self::DEFAULT_TTS_MODEL.to_string(),
            tts_voice: Self::DEFAULT_TTS_VOICE.to_string(),
            tts_speed: 1.0,
            temperature: 0.7,
            max_tokens: 4096,
            translation_temperature: 0.2,
            translation_max_tokens: 2048,
            max_retries: 3,
            retry_min_wait: Duration::from_secs(4),
            retry_max_wait: Duration::from_secs(10),
            max_concurrent_requests: 5,
            embedding_batch_size: 32,
            token_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            tls_insecure: true,
            allow_open_mode: true,
            strict_auth: false,
        }
    }
}

/// Everything needed to resolve auth and build a client for one service.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    /// Service label used in logs.
    pub service: &'static str,
    /// Base URL of the gateway.
    pub base_url: Option<String>,
    /// Optional path segment placed before `/v1`.
    pub endpoint_segment: Option<String>,
    /// Static key for the API-key tier.
    pub static_key: Option<SecretString>,
}

impl GatewayConfig {
    /// Default chat model.
    pub const DEFAULT_MODEL: &'static str = "codellama/CodeLlama-34b-Instruct-hf";
    /// Default embedding model.
    pub const DEFAULT_EMBEDDING_MODEL: &'static str = "BAAI/bge-base-en-v1.5";
    /// Default speech model.
    pub const DEFAULT_TTS_MODEL: &'static str = "tts-1";
    /// Default speech voice.
    pub const DEFAULT_TTS_VOICE: &'static str = "alloy";

    /// Inputs for the inference (chat) service.
    pub fn inference_endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint {
            service: "inference",
            base_url: self.base_url.clone(),
            endpoint_segment: self.inference_model_endpoint.clone(),
            static_key: self.inference_api_key.clone(),
        }
    }

    /// Inputs for the embeddings service.
    ///
    /// Shares the inference credential; only the base URL differs.
    pub fn embeddings_endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint {
            service: "embeddings",
            base_url: self
                .embeddings_base_url
                .clone()
                .or_else(|| self.base_url.clone()),
            endpoint_segment: None,
            static_key: self.inference_api_key.clone(),
        }
    }

    /// Inputs for the speech service, if a TTS gateway is configured.
    pub fn speech_endpoint(&self) -> Option<ServiceEndpoint> {
        self.tts_base_url.as_ref().map(|base| ServiceEndpoint {
            service: "speech",
            base_url: Some(base.clone()),
            endpoint_segment: None,
            static_key: self.tts_api_key.clone(),
        })
    }

    /// Both Keycloak fields are present and non-empty.
    pub fn has_keycloak_credentials(&self) -> bool {
        self.keycloak_client_id().is_some() && self.keycloak_client_secret().is_some()
    }

    /// Exactly one of the Keycloak fields is present.
    pub fn has_partial_keycloak(&self) -> bool {
        self.keycloak_client_id().is_some() != self.keycloak_client_secret().is_some()
    }

    /// Keycloak client ID, ignoring blank values.
    pub fn keycloak_client_id(&self) -> Option<&str> {
        self.keycloak_client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    /// Keycloak client secret, ignoring blank values.
    pub fn keycloak_client_secret(&self) -> Option<&SecretString> {
        self.keycloak_client_secret
            .as_ref()
            .filter(|secret| !secret.expose_secret().trim().is_empty())
    }

    /// Validate field ranges and cross-field rules.
    ///
    /// # Errors
    /// Returns the first rule violated.
    pub fn validate_config(&self) -> ConfigResult<()> {
        self.validate()?;

        let base_url = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing { field: "BASE_URL" })?;
        check_url("BASE_URL", base_url)?;
        if let Some(url) = &self.embeddings_base_url {
            check_url("EMBEDDINGS_BASE_URL", url)?;
        }
        if let Some(url) = &self.tts_base_url {
            check_url("TTS_BASE_URL", url)?;
        }

        if self.retry_min_wait > self.retry_max_wait {
            return Err(ConfigError::Contradiction(format!(
                "RETRY_MIN_WAIT ({:?}) exceeds RETRY_MAX_WAIT ({:?})",
                self.retry_min_wait, self.retry_max_wait
            )));
        }

        if self.has_partial_keycloak() {
            let message = "only one of KEYCLOAK_CLIENT_ID / KEYCLOAK_CLIENT_SECRET is set; \
                           the Keycloak tier will be skipped";
            if self.strict_auth {
                return Err(ConfigError::Contradiction(message.to_string()));
            }
            warn!("{message}");
        }

        let has_inference_auth =
            self.has_keycloak_credentials() || has_value(self.inference_api_key.as_ref());
        if !has_inference_auth && !self.allow_open_mode {
            return Err(ConfigError::Contradiction(
                "no gateway auth configured and open mode is disabled; set \
                 KEYCLOAK_CLIENT_ID and KEYCLOAK_CLIENT_SECRET or INFERENCE_API_KEY"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> ConfigResult<()> {
    Url::parse(value.trim())
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(field, e.to_string()))
}

fn has_value(secret: Option<&SecretString>) -> bool {
    secret.is_some_and(|s| !s.expose_secret().trim().is_empty())
}
