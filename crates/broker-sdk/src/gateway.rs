//! Retrying generation calls against one gateway.

use crate::batch::BatchExecutor;
use crate::factory::ResolvedClient;
use crate::fence::strip_code_fences;
use crate::wire::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};
use broker_config::GatewayConfig;
use broker_core::{AuthDecision, BrokerError, BrokerResult, ChatMessage, GenerationRequest, GenerationResult};
use broker_resilience::{RetryPolicy, RetryPolicyBuilder};
use broker_telemetry::generation_span;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Defaults applied to calls that do not override them.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Chat model
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit
    pub max_tokens: u32,
    /// Temperature for code translation
    pub translation_temperature: f32,
    /// Completion token limit for code translation
    pub translation_max_tokens: u32,
    /// Embedding model
    pub embedding_model: String,
    /// Inputs per embeddings request
    pub embedding_batch_size: usize,
    /// Speech model
    pub tts_model: String,
    /// Speech voice
    pub tts_voice: String,
    /// Speech speed
    pub tts_speed: f32,
    /// Concurrency cap for batch calls
    pub max_concurrent_requests: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

impl GatewaySettings {
    /// Settings taken from `config`
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            translation_temperature: config.translation_temperature,
            translation_max_tokens: config.translation_max_tokens,
            embedding_model: config.embedding_model_name.clone(),
            embedding_batch_size: config.embedding_batch_size.max(1),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
            tts_speed: config.tts_speed,
            max_concurrent_requests: config.max_concurrent_requests.max(1),
        }
    }
}

/// Retry policy described by `config`
pub fn retry_policy_from_config(config: &GatewayConfig) -> RetryPolicy {
    RetryPolicyBuilder::new()
        .max_attempts(config.max_retries)
        .min_delay(config.retry_min_wait)
        .max_delay(config.retry_max_wait)
        .build()
}

/// Issues generation calls through a [`ResolvedClient`] with retry and
/// response validation.
///
/// Cheap to clone; clones share the client and the batch gate.
#[derive(Debug, Clone)]
pub struct GenerationGateway {
    service: &'static str,
    client: Arc<ResolvedClient>,
    retry: RetryPolicy,
    settings: Arc<GatewaySettings>,
    batch: BatchExecutor,
}

impl GenerationGateway {
    /// Create a gateway for `service`
    pub fn new(
        service: &'static str,
        client: ResolvedClient,
        retry: RetryPolicy,
        settings: GatewaySettings,
    ) -> Self {
        let batch = BatchExecutor::new(settings.max_concurrent_requests);
        Self {
            service,
            client: Arc::new(client),
            retry,
            settings: Arc::new(settings),
            batch,
        }
    }

    /// Service label
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// The bound client
    pub fn client(&self) -> &ResolvedClient {
        &self.client
    }

    /// Auth decision in use
    pub fn auth_decision(&self) -> &AuthDecision {
        self.client.auth_decision()
    }

    /// Default settings
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Batch executor sized to `max_concurrent_requests`
    pub fn batch_executor(&self) -> &BatchExecutor {
        &self.batch
    }

    /// Run a chat completion
    ///
    /// A successful response without choices or content, or one that is not
    /// a chat completion at all, yields an empty result.
    ///
    /// # Errors
    /// Returns the terminal error once retries are exhausted, or immediately
    /// for non-retryable failures
    pub async fn chat(&self, request: &GenerationRequest) -> BrokerResult<GenerationResult> {
        let model = request.model.as_deref().unwrap_or(self.settings.model.as_str());
        let span = generation_span!(self.service, "chat", model);
        self.chat_inner(request, model, None).instrument(span).await
    }

    /// Chat completion that stops retrying once `cancel` fires
    ///
    /// # Errors
    /// As [`GenerationGateway::chat`], plus `Cancelled`
    pub async fn chat_cancellable(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> BrokerResult<GenerationResult> {
        let model = request.model.as_deref().unwrap_or(self.settings.model.as_str());
        let span = generation_span!(self.service, "chat", model);
        self.chat_inner(request, model, Some(cancel))
            .instrument(span)
            .await
    }

    async fn chat_inner(
        &self,
        request: &GenerationRequest,
        model: &str,
        cancel: Option<&CancellationToken>,
    ) -> BrokerResult<GenerationResult> {
        let messages = request.to_messages();
        debug!(
            messages = messages.len(),
            estimated_prompt_tokens = request.estimated_prompt_tokens(),
            "Sending chat completion"
        );
        let body = ChatCompletionRequest {
            model,
            messages: &messages,
            max_tokens: request.max_tokens.unwrap_or(self.settings.max_tokens),
            temperature: request.temperature.unwrap_or(self.settings.temperature),
        };

        let response = self
            .send_with_retry("chat/completions", &body, cancel)
            .await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| BrokerError::transient(format!("failed to read chat response: {e}")))?;
        let parsed: ChatCompletionResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, bytes = body.len(), "Chat response has an unexpected shape, returning empty text");
                return Ok(GenerationResult::empty());
            }
        };

        let Some(content) = parsed.first_content() else {
            warn!(
                choices = parsed.choices.len(),
                "Chat response has no choice content, returning empty text"
            );
            return Ok(GenerationResult {
                model: parsed.model,
                usage: parsed.usage,
                ..GenerationResult::empty()
            });
        };

        let mut result = GenerationResult::from_raw(content);
        result.model = parsed.model;
        result.usage = parsed.usage;
        debug!(characters = result.raw_character_count, "Chat completion received");
        Ok(result)
    }

    /// Complete a single user prompt
    ///
    /// # Errors
    /// See [`GenerationGateway::chat`]
    pub async fn complete(&self, prompt: impl Into<String>) -> BrokerResult<String> {
        Ok(self.chat(&GenerationRequest::user(prompt)).await?.text)
    }

    /// Complete an explicit conversation
    ///
    /// # Errors
    /// See [`GenerationGateway::chat`]
    pub async fn chat_complete(&self, messages: Vec<ChatMessage>) -> BrokerResult<String> {
        Ok(self.chat(&GenerationRequest::messages(messages)).await?.text)
    }

    /// Complete a system/user prompt pair
    ///
    /// # Errors
    /// See [`GenerationGateway::chat`]
    pub async fn generate(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> BrokerResult<String> {
        Ok(self
            .chat(&GenerationRequest::with_system(system, user))
            .await?
            .text)
    }

    /// Translate source code between languages; the output is fence-stripped
    ///
    /// # Errors
    /// See [`GenerationGateway::chat`]
    pub async fn translate_code(
        &self,
        source: &str,
        source_language: &str,
        target_language: &str,
    ) -> BrokerResult<GenerationResult> {
        info!(from = source_language, to = target_language, "Translating code");

        let request = GenerationRequest::with_system(
            TRANSLATION_SYSTEM_PROMPT,
            translation_prompt(source, source_language, target_language),
        )
        .temperature(self.settings.translation_temperature)
        .max_tokens(self.settings.translation_max_tokens);
        let result = self.chat(&request).await?.map_text(strip_code_fences);

        info!(characters = result.text.chars().count(), "Code translated");
        Ok(result)
    }

    /// POST `body` to `path` with retry; returns the successful response
    pub(crate) async fn send_with_retry<B>(
        &self,
        path: &str,
        body: &B,
        cancel: Option<&CancellationToken>,
    ) -> BrokerResult<reqwest::Response>
    where
        B: Serialize + Sync,
    {
        let url = self.client.endpoint(path);
        let operation = || self.send_once(&url, body);

        let result = match cancel {
            Some(token) => self.retry.execute_cancellable(token, operation).await,
            None => self.retry.execute(operation).await,
        };

        if let Err(e) = &result {
            error!(service = self.service, url = %url, kind = %e.kind(), error = %e, "Gateway call failed");
        }
        result
    }

    async fn send_once<B>(&self, url: &str, body: &B) -> BrokerResult<reqwest::Response>
    where
        B: Serialize + Sync,
    {
        let response = self
            .client
            .http()
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(&e))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(handle_error_response(response).await)
        }
    }

    fn map_reqwest_error(&self, error: &reqwest::Error) -> BrokerError {
        if error.is_timeout() {
            BrokerError::timeout(self.client.request_timeout().as_millis() as u64)
        } else if error.is_builder() {
            BrokerError::internal(format!("failed to build request: {error}"))
        } else {
            BrokerError::transient(format!("request failed: {error}"))
        }
    }
}

async fn handle_error_response(response: reqwest::Response) -> BrokerError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_error) => api_error.error.message,
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => body,
    };
    BrokerError::from_status(status, message)
}

const TRANSLATION_SYSTEM_PROMPT: &str = "You are a senior software engineer that translates code from one \
     language to another. Preserve logic and structure. Output only the \
     translated code, with no explanations and no markdown formatting.";

fn translation_prompt(source: &str, from: &str, to: &str) -> String {
    format!(
        "Translate the following {from} code to {to}.\n\n\
         Return only the {to} code, without comments or explanations,\n\
         and without markdown code fences.\n\n\
         {from} code:\n```{from}\n{source}\n```"
    )
}
