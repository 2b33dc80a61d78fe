//! The broker context: resolved auth and ready gateways for every service.

use crate::factory::ClientFactory;
use crate::gateway::{retry_policy_from_config, GatewaySettings, GenerationGateway};
use broker_auth::{AuthResolver, AuthSettings, KeycloakTokenResolver, Resolution, TokenResolver};
use broker_config::{GatewayConfig, ServiceEndpoint};
use broker_core::{AuthDecision, AuthMode, BrokerError, BrokerResult};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// A gateway service the broker talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Chat completions
    Inference,
    /// Embeddings
    Embeddings,
    /// Text-to-speech
    Speech,
}

impl Service {
    /// Service label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inference => "inference",
            Self::Embeddings => "embeddings",
            Self::Speech => "speech",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to call the configured gateways.
///
/// Built once at startup with [`Broker::connect`] and shared by reference
/// (or in an `Arc`) afterwards.
#[derive(Debug)]
pub struct Broker {
    config: Arc<GatewayConfig>,
    inference_auth: Resolution,
    speech_auth: Option<Resolution>,
    inference: GenerationGateway,
    embeddings: GenerationGateway,
    speech: Option<GenerationGateway>,
}

impl Broker {
    /// Validate `config`, resolve auth and build every configured gateway
    ///
    /// # Errors
    /// Returns `Config` for invalid configuration or when no auth tier is
    /// usable and open mode is disabled
    pub async fn connect(config: GatewayConfig) -> BrokerResult<Self> {
        let tokens = KeycloakTokenResolver::new(config.tls_insecure)?;
        Self::connect_with(config, Arc::new(tokens)).await
    }

    /// [`Broker::connect`] with a custom token source
    ///
    /// # Errors
    /// See [`Broker::connect`]
    pub async fn connect_with(
        config: GatewayConfig,
        tokens: Arc<dyn TokenResolver>,
    ) -> BrokerResult<Self> {
        config.validate_config()?;

        let factory = ClientFactory::from_config(&config);
        let retry = retry_policy_from_config(&config);
        let settings = GatewaySettings::from_config(&config);

        let inference_endpoint = config.inference_endpoint();
        let inference_auth =
            resolve(&config, &inference_endpoint, Arc::clone(&tokens)).await?;

        let inference = GenerationGateway::new(
            Service::Inference.as_str(),
            factory.build(
                inference_endpoint.base_url.as_deref(),
                inference_endpoint.endpoint_segment.as_deref(),
                inference_auth.decision.clone(),
            )?,
            retry.clone(),
            settings.clone(),
        );

        // Embeddings share the inference credential.
        let embeddings_endpoint = config.embeddings_endpoint();
        let embeddings = GenerationGateway::new(
            Service::Embeddings.as_str(),
            factory.build(
                embeddings_endpoint.base_url.as_deref(),
                embeddings_endpoint.endpoint_segment.as_deref(),
                inference_auth.decision.clone(),
            )?,
            retry.clone(),
            settings.clone(),
        );

        let (speech, speech_auth) = match config.speech_endpoint() {
            Some(endpoint) => {
                let auth = resolve(&config, &endpoint, tokens).await?;
                let gateway = GenerationGateway::new(
                    Service::Speech.as_str(),
                    factory.build(
                        endpoint.base_url.as_deref(),
                        endpoint.endpoint_segment.as_deref(),
                        auth.decision.clone(),
                    )?,
                    retry,
                    settings,
                );
                (Some(gateway), Some(auth))
            }
            None => {
                info!("TTS_BASE_URL not set, speech disabled");
                (None, None)
            }
        };

        let broker = Self {
            config: Arc::new(config),
            inference_auth,
            speech_auth,
            inference,
            embeddings,
            speech,
        };
        info!(
            inference_mode = %broker.inference_auth.decision.mode(),
            speech_mode = broker.auth_mode(Service::Speech).map_or("disabled", |m| m.as_str()),
            "Broker connected"
        );
        Ok(broker)
    }

    /// The configuration the broker was built from
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Chat gateway
    pub fn inference(&self) -> &GenerationGateway {
        &self.inference
    }

    /// Embeddings gateway
    pub fn embeddings(&self) -> &GenerationGateway {
        &self.embeddings
    }

    /// Speech gateway
    ///
    /// # Errors
    /// Returns `Config` when no TTS gateway is configured
    pub fn speech(&self) -> BrokerResult<&GenerationGateway> {
        self.speech
            .as_ref()
            .ok_or_else(|| BrokerError::config("speech is not configured; set TTS_BASE_URL"))
    }

    /// Auth decision for `service`, `None` if the service is disabled
    pub fn auth_decision(&self, service: Service) -> Option<&AuthDecision> {
        self.resolution(service).map(|r| &r.decision)
    }

    /// Auth mode for `service`, `None` if the service is disabled
    pub fn auth_mode(&self, service: Service) -> Option<AuthMode> {
        self.auth_decision(service).map(AuthDecision::mode)
    }

    /// Auth decision plus the tier trail for `service`
    pub fn resolution(&self, service: Service) -> Option<&Resolution> {
        match service {
            Service::Inference | Service::Embeddings => Some(&self.inference_auth),
            Service::Speech => self.speech_auth.as_ref(),
        }
    }

    /// `true` when the inference gateway uses a real credential
    pub fn is_authenticated(&self) -> bool {
        self.inference_auth.decision.is_authenticated()
    }
}

async fn resolve(
    config: &GatewayConfig,
    endpoint: &ServiceEndpoint,
    tokens: Arc<dyn TokenResolver>,
) -> BrokerResult<Resolution> {
    let resolver =
        AuthResolver::with_token_resolver(AuthSettings::from_config(config, endpoint), tokens);
    resolver.resolve_traced().await.cloned()
}
