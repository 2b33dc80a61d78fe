//! Building HTTP clients bound to a gateway endpoint and credential.

use broker_config::GatewayConfig;
use broker_core::{AuthDecision, BrokerError, BrokerResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("inference-broker/", env!("CARGO_PKG_VERSION"));

const API_VERSION_SEGMENT: &str = "v1";

/// Normalize a gateway base URL so it ends in exactly one `/v1`.
///
/// The optional endpoint segment is placed before `/v1`. A base that already
/// ends in `/v1` is returned unchanged, which makes the function idempotent.
///
/// # Errors
/// Returns `Config` for an empty or unparseable base URL
pub fn normalize_base_url(base_url: &str, endpoint_segment: Option<&str>) -> BrokerResult<String> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(BrokerError::config("gateway base URL is empty"));
    }

    let mut normalized = base.to_string();
    if !ends_with_segment(&normalized, API_VERSION_SEGMENT) {
        let segment = endpoint_segment
            .map(|s| s.trim().trim_matches('/'))
            .filter(|s| !s.is_empty());
        if let Some(segment) = segment {
            if !ends_with_segment(&normalized, segment) {
                normalized.push('/');
                normalized.push_str(segment);
            }
        }
        if !ends_with_segment(&normalized, API_VERSION_SEGMENT) {
            normalized.push('/');
            normalized.push_str(API_VERSION_SEGMENT);
        }
    }

    Url::parse(&normalized)
        .map_err(|e| BrokerError::config(format!("invalid gateway base URL '{base}': {e}")))?;
    Ok(normalized)
}

fn ends_with_segment(url: &str, segment: &str) -> bool {
    url.strip_suffix(segment)
        .is_some_and(|rest| rest.ends_with('/'))
}

/// An HTTP client bound to one normalized gateway endpoint and credential.
#[derive(Clone)]
pub struct ResolvedClient {
    http: reqwest::Client,
    base_url: String,
    decision: AuthDecision,
    request_timeout: Duration,
}

impl ResolvedClient {
    /// The normalized base URL, ending in `/v1`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The auth decision bound into this client
    pub fn auth_decision(&self) -> &AuthDecision {
        &self.decision
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Underlying transport
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Full URL for an API path such as `chat/completions`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for ResolvedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedClient")
            .field("base_url", &self.base_url)
            .field("auth_mode", &self.decision.mode())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Builds [`ResolvedClient`]s with shared transport settings.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    request_timeout: Duration,
    tls_insecure: bool,
    user_agent: String,
}

impl Default for ClientFactory {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tls_insecure: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientFactory {
    /// Create a factory with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory using the timeout and TLS settings from `config`
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            tls_insecure: config.tls_insecure,
            ..Default::default()
        }
    }

    /// Set the request timeout
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable certificate verification skipping
    #[must_use]
    pub fn tls_insecure(mut self, insecure: bool) -> Self {
        self.tls_insecure = insecure;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build a client for `base_url` authenticated by `decision`
    ///
    /// # Errors
    /// Returns `Config` for a missing or invalid base URL, or a credential
    /// that cannot be sent as a header
    pub fn build(
        &self,
        base_url: Option<&str>,
        endpoint_segment: Option<&str>,
        decision: AuthDecision,
    ) -> BrokerResult<ResolvedClient> {
        let base_url = base_url
            .ok_or_else(|| BrokerError::config("gateway base URL is not configured"))?;
        let normalized = normalize_base_url(base_url, endpoint_segment)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| BrokerError::config(format!("Invalid user agent: {e}")))?,
        );
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", decision.credential()))
            .map_err(|_| BrokerError::config("credential contains characters not allowed in a header"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .danger_accept_invalid_certs(self.tls_insecure)
            .default_headers(headers)
            .build()
            .map_err(|e| BrokerError::config(format!("Failed to create HTTP client: {e}")))?;

        debug!(
            base_url = %normalized,
            mode = %decision.mode(),
            tls_insecure = self.tls_insecure,
            "Gateway client built"
        );

        Ok(ResolvedClient {
            http,
            base_url: normalized,
            decision,
            request_timeout: self.request_timeout,
        })
    }
}
