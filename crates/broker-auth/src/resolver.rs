//! Tiered auth resolution.

use crate::token::{KeycloakTokenResolver, TokenRequest, TokenResolver, DEFAULT_TOKEN_TIMEOUT};
use broker_config::{GatewayConfig, ServiceEndpoint};
use broker_core::{AuthDecision, AuthMode, BrokerError, BrokerResult};
use broker_telemetry::auth_tier_span;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn, Instrument};

/// Inputs for resolving auth for one service.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Service label used in logs
    pub service: String,
    /// Gateway base URL; the token endpoint lives under it
    pub base_url: Option<String>,
    /// Keycloak client ID
    pub client_id: Option<String>,
    /// Keycloak client secret
    pub client_secret: Option<SecretString>,
    /// Static API key for this service
    pub static_key: Option<SecretString>,
    /// Token exchange timeout
    pub token_timeout: Duration,
    /// Accept open mode when no tier yields a credential
    pub allow_open_mode: bool,
}

impl AuthSettings {
    /// Settings with nothing configured
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            base_url: None,
            client_id: None,
            client_secret: None,
            static_key: None,
            token_timeout: DEFAULT_TOKEN_TIMEOUT,
            allow_open_mode: true,
        }
    }

    /// Settings for `endpoint`, taking Keycloak fields and limits from `config`
    pub fn from_config(config: &GatewayConfig, endpoint: &ServiceEndpoint) -> Self {
        Self {
            service: endpoint.service.to_string(),
            base_url: endpoint.base_url.clone(),
            client_id: config.keycloak_client_id().map(str::to_string),
            client_secret: config.keycloak_client_secret().cloned(),
            static_key: endpoint.static_key.clone(),
            token_timeout: config.token_timeout,
            allow_open_mode: config.allow_open_mode,
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the Keycloak client pair
    #[must_use]
    pub fn keycloak(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set the static API key
    #[must_use]
    pub fn static_key(mut self, key: impl Into<String>) -> Self {
        self.static_key = Some(SecretString::new(key.into()));
        self
    }

    /// Allow or refuse open mode
    #[must_use]
    pub fn allow_open_mode(mut self, allow: bool) -> Self {
        self.allow_open_mode = allow;
        self
    }

    /// Set the token timeout
    #[must_use]
    pub fn token_timeout(mut self, timeout: Duration) -> Self {
        self.token_timeout = timeout;
        self
    }

    fn base(&self) -> Option<&str> {
        non_blank(self.base_url.as_deref())
    }

    fn keycloak_pair(&self) -> Option<(&str, &SecretString)> {
        let id = non_blank(self.client_id.as_deref())?;
        let secret = self
            .client_secret
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())?;
        Some((id, secret))
    }

    fn key(&self) -> Option<&str> {
        non_blank(self.static_key.as_ref().map(|k| k.expose_secret().as_str()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// What happened when a tier was considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    /// The tier produced the credential in use
    Selected,
    /// The tier was not attempted
    Skipped {
        /// Why it was skipped
        reason: &'static str,
    },
    /// The tier was attempted and failed
    Failed {
        /// Failure description
        reason: String,
    },
}

/// One entry in the resolution trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierAttempt {
    /// The tier considered
    pub tier: AuthMode,
    /// Its outcome
    pub outcome: TierOutcome,
}

impl TierAttempt {
    fn selected(tier: AuthMode) -> Self {
        Self {
            tier,
            outcome: TierOutcome::Selected,
        }
    }

    fn skipped(tier: AuthMode, reason: &'static str) -> Self {
        Self {
            tier,
            outcome: TierOutcome::Skipped { reason },
        }
    }

    fn failed(tier: AuthMode, reason: impl Into<String>) -> Self {
        Self {
            tier,
            outcome: TierOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    /// `true` if the tier made a network call or produced the credential
    pub fn was_attempted(&self) -> bool {
        !matches!(self.outcome, TierOutcome::Skipped { .. })
    }
}

/// The cached decision plus the trail that led to it.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Winning decision
    pub decision: AuthDecision,
    /// Every tier considered, in priority order
    pub attempts: Vec<TierAttempt>,
}

/// Resolves and caches the auth decision for one service.
pub struct AuthResolver {
    settings: AuthSettings,
    tokens: Arc<dyn TokenResolver>,
    resolved: OnceCell<Resolution>,
}

impl fmt::Debug for AuthResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResolver")
            .field("settings", &self.settings)
            .field("resolved", &self.resolved.get().map(|r| r.decision.mode()))
            .finish_non_exhaustive()
    }
}

impl AuthResolver {
    /// Create a resolver using the Keycloak HTTP token exchange
    ///
    /// # Errors
    /// Returns `Config` if the token HTTP client cannot be built
    pub fn new(settings: AuthSettings, tls_insecure: bool) -> BrokerResult<Self> {
        let tokens = KeycloakTokenResolver::new(tls_insecure)?;
        Ok(Self::with_token_resolver(settings, Arc::new(tokens)))
    }

    /// Create a resolver with a custom token source
    pub fn with_token_resolver(settings: AuthSettings, tokens: Arc<dyn TokenResolver>) -> Self {
        Self {
            settings,
            tokens,
            resolved: OnceCell::new(),
        }
    }

    /// The settings this resolver was built with
    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Resolve the decision, computing it on first use
    ///
    /// # Errors
    /// Returns `Config` when open mode is reached but not allowed
    pub async fn resolve(&self) -> BrokerResult<AuthDecision> {
        Ok(self.resolve_traced().await?.decision.clone())
    }

    /// Resolve and return the decision with its tier trail
    ///
    /// # Errors
    /// See [`AuthResolver::resolve`]
    pub async fn resolve_traced(&self) -> BrokerResult<&Resolution> {
        self.resolved.get_or_try_init(|| self.run_tiers()).await
    }

    /// The cached decision, if resolution already ran
    pub fn cached(&self) -> Option<&AuthDecision> {
        self.resolved.get().map(|r| &r.decision)
    }

    async fn run_tiers(&self) -> BrokerResult<Resolution> {
        let service = self.settings.service.as_str();
        let mut attempts = Vec::with_capacity(AuthMode::PRIORITY.len());

        if let Some(decision) = self
            .keycloak_tier(&mut attempts)
            .instrument(auth_tier_span!(service, AuthMode::Keycloak))
            .await
        {
            return Ok(self.finish(decision, attempts));
        }

        let span = auth_tier_span!(service, AuthMode::ApiKey);
        let api_key = span.in_scope(|| self.api_key_tier(&mut attempts));
        if let Some(decision) = api_key {
            return Ok(self.finish(decision, attempts));
        }

        let span = auth_tier_span!(service, AuthMode::Open);
        let _guard = span.enter();
        if !self.settings.allow_open_mode {
            warn!(service, "No credential available and open mode is disabled");
            return Err(BrokerError::config(format!(
                "no authentication configured for {service} and open mode is disabled"
            )));
        }
        warn!(service, "Using open mode; requests are sent without credentials");
        attempts.push(TierAttempt::selected(AuthMode::Open));
        Ok(self.finish(AuthDecision::open(), attempts))
    }

    async fn keycloak_tier(&self, attempts: &mut Vec<TierAttempt>) -> Option<AuthDecision> {
        let Some((client_id, client_secret)) = self.settings.keycloak_pair() else {
            info!("Keycloak credentials not configured, skipping");
            attempts.push(TierAttempt::skipped(
                AuthMode::Keycloak,
                "client id or secret not configured",
            ));
            return None;
        };
        let Some(base_url) = self.settings.base() else {
            info!("Base URL not configured, skipping Keycloak");
            attempts.push(TierAttempt::skipped(AuthMode::Keycloak, "base url not configured"));
            return None;
        };

        let request = TokenRequest::for_base(base_url, client_id, client_secret.clone())
            .with_timeout(self.settings.token_timeout);

        let token = match self.tokens.fetch_token(&request).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Keycloak token exchange failed, falling through");
                attempts.push(TierAttempt::failed(AuthMode::Keycloak, e.to_string()));
                return None;
            }
        };

        match AuthDecision::keycloak(token.expose_secret().as_str()) {
            Ok(decision) => {
                info!("Keycloak token acquired");
                attempts.push(TierAttempt::selected(AuthMode::Keycloak));
                Some(decision)
            }
            Err(e) => {
                warn!(error = %e, "Keycloak returned an unusable token, falling through");
                attempts.push(TierAttempt::failed(AuthMode::Keycloak, e.to_string()));
                None
            }
        }
    }

    fn api_key_tier(&self, attempts: &mut Vec<TierAttempt>) -> Option<AuthDecision> {
        let Some(key) = self.settings.key() else {
            info!("Static API key not configured, skipping");
            attempts.push(TierAttempt::skipped(AuthMode::ApiKey, "api key not configured"));
            return None;
        };

        match AuthDecision::api_key(key) {
            Ok(decision) => {
                info!("Using static API key");
                attempts.push(TierAttempt::selected(AuthMode::ApiKey));
                Some(decision)
            }
            Err(e) => {
                attempts.push(TierAttempt::failed(AuthMode::ApiKey, e.to_string()));
                None
            }
        }
    }

    fn finish(&self, decision: AuthDecision, attempts: Vec<TierAttempt>) -> Resolution {
        info!(
            service = %self.settings.service,
            mode = %decision.mode(),
            "Auth mode resolved"
        );
        Resolution { decision, attempts }
    }
}
