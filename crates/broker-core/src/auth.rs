//! Authentication decision types.

use crate::error::{BrokerError, BrokerResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Placeholder credential sent in open mode.
///
/// OpenAI-compatible gateways require some bearer value; an open gateway is
/// expected to ignore it.
pub const OPEN_MODE_CREDENTIAL: &str = "no-auth";

/// Authentication tier, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Bearer token obtained through a Keycloak client-credentials exchange.
    Keycloak,
    /// Static API key from configuration.
    ApiKey,
    /// No authentication; a sentinel credential is sent.
    Open,
}

impl AuthMode {
    /// All tiers in the order they are attempted.
    pub const PRIORITY: [Self; 3] = [Self::Keycloak, Self::ApiKey, Self::Open];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keycloak => "keycloak",
            Self::ApiKey => "api_key",
            Self::Open => "open",
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of auth resolution: which tier won and the credential it produced.
#[derive(Debug, Clone)]
pub struct AuthDecision {
    mode: AuthMode,
    credential: SecretString,
}

impl AuthDecision {
    /// Create a decision for a tier.
    ///
    /// # Errors
    /// Returns a configuration error if `credential` is empty.
    pub fn new(mode: AuthMode, credential: impl Into<String>) -> BrokerResult<Self> {
        let credential = credential.into();
        if credential.trim().is_empty() {
            return Err(BrokerError::config(format!(
                "credential for auth mode '{mode}' must not be empty"
            )));
        }
        Ok(Self {
            mode,
            credential: SecretString::new(credential),
        })
    }

    /// Decision for a Keycloak bearer token.
    pub fn keycloak(token: impl Into<String>) -> BrokerResult<Self> {
        Self::new(AuthMode::Keycloak, token)
    }

    /// Decision for a static API key.
    pub fn api_key(key: impl Into<String>) -> BrokerResult<Self> {
        Self::new(AuthMode::ApiKey, key)
    }

    /// Decision for open mode with the sentinel credential.
    pub fn open() -> Self {
        Self {
            mode: AuthMode::Open,
            credential: SecretString::new(OPEN_MODE_CREDENTIAL.to_string()),
        }
    }

    /// The tier that produced this decision.
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// The credential, exposed for binding into request headers.
    pub fn credential(&self) -> &str {
        self.credential.expose_secret()
    }

    /// `true` when a real credential (token or key) is in use.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.mode, AuthMode::Keycloak | AuthMode::ApiKey)
    }
}
