//! Keycloak client-credentials token exchange.

use async_trait::async_trait;
use broker_core::{AuthMode, BrokerError, BrokerResult};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for the token exchange.
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the token endpoint for a gateway base URL.
pub fn token_endpoint(base_url: &str) -> String {
    format!("{}/token", base_url.trim().trim_end_matches('/'))
}

/// Inputs for one token exchange.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// Full token endpoint URL
    pub token_url: String,
    /// Client ID
    pub client_id: String,
    /// Client secret
    pub client_secret: SecretString,
    /// Request timeout
    pub timeout: Duration,
}

impl TokenRequest {
    /// Create a request against `{base_url}/token`
    pub fn for_base(
        base_url: &str,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            token_url: token_endpoint(base_url),
            client_id: client_id.into(),
            client_secret,
            timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Exchanges client credentials for a bearer token.
///
/// Implementations make exactly one attempt and report every failure as
/// [`BrokerError::AuthTier`] so the caller can fall through to the next tier.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Fetch a bearer token
    async fn fetch_token(&self, request: &TokenRequest) -> BrokerResult<SecretString>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// [`TokenResolver`] backed by a Keycloak `/token` endpoint.
#[derive(Debug, Clone)]
pub struct KeycloakTokenResolver {
    http: reqwest::Client,
}

impl KeycloakTokenResolver {
    /// Create a resolver; `tls_insecure` skips certificate verification
    ///
    /// # Errors
    /// Returns `Config` if the HTTP client cannot be built
    pub fn new(tls_insecure: bool) -> BrokerResult<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(tls_insecure)
            .build()
            .map_err(|e| BrokerError::config(format!("Failed to build token client: {e}")))?;
        Ok(Self { http })
    }

    /// Create a resolver around an existing client
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn tier_error(reason: impl Into<String>) -> BrokerError {
    BrokerError::auth_tier(AuthMode::Keycloak, reason)
}

#[async_trait]
impl TokenResolver for KeycloakTokenResolver {
    async fn fetch_token(&self, request: &TokenRequest) -> BrokerResult<SecretString> {
        debug!(url = %request.token_url, client_id = %request.client_id, "Requesting Keycloak token");

        let response = self
            .http
            .post(&request.token_url)
            .timeout(request.timeout)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", request.client_id.as_str()),
                ("client_secret", request.client_secret.expose_secret().as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tier_error(format!(
                        "token request timed out after {}ms",
                        request.timeout.as_millis()
                    ))
                } else {
                    tier_error(format!("token request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Keycloak token request rejected");
            return Err(tier_error(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| tier_error(format!("unparseable token response: {e}")))?;

        match body.access_token {
            Some(token) if !token.trim().is_empty() => Ok(SecretString::new(token)),
            _ => Err(tier_error("token response has no access_token")),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
