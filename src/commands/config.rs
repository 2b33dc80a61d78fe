//! Config command - inspect the effective configuration.

use anyhow::Result;
use broker_config::{load_config, GatewayConfig};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::Path;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration with secrets redacted
    Show,

    /// Load and validate the configuration without contacting any gateway
    Validate,
}

/// Redacted configuration summary.
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub base_url: Option<String>,
    pub embeddings_base_url: Option<String>,
    pub tts_base_url: Option<String>,
    pub inference_model_endpoint: Option<String>,
    pub keycloak_client_id: Option<String>,
    pub keycloak_client_secret: &'static str,
    pub inference_api_key: &'static str,
    pub tts_api_key: &'static str,
    pub model_name: String,
    pub embedding_model_name: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub retry_min_wait: String,
    pub retry_max_wait: String,
    pub max_concurrent_requests: usize,
    pub embedding_batch_size: usize,
    pub token_timeout: String,
    pub request_timeout: String,
    pub tls_insecure: bool,
    pub allow_open_mode: bool,
    pub strict_auth: bool,
}

impl From<&GatewayConfig> for ConfigSummary {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            embeddings_base_url: config.embeddings_base_url.clone(),
            tts_base_url: config.tts_base_url.clone(),
            inference_model_endpoint: config.inference_model_endpoint.clone(),
            keycloak_client_id: config.keycloak_client_id().map(String::from),
            keycloak_client_secret: output::redacted(config.keycloak_client_secret().is_some()),
            inference_api_key: output::redacted(config.inference_api_key.is_some()),
            tts_api_key: output::redacted(config.tts_api_key.is_some()),
            model_name: config.model_name.clone(),
            embedding_model_name: config.embedding_model_name.clone(),
            tts_model: config.tts_model.clone(),
            tts_voice: config.tts_voice.clone(),
            tts_speed: config.tts_speed,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_min_wait: output::format_duration(config.retry_min_wait),
            retry_max_wait: output::format_duration(config.retry_max_wait),
            max_concurrent_requests: config.max_concurrent_requests,
            embedding_batch_size: config.embedding_batch_size,
            token_timeout: output::format_duration(config.token_timeout),
            request_timeout: output::format_duration(config.request_timeout),
            tls_insecure: config.tls_insecure,
            allow_open_mode: config.allow_open_mode,
            strict_auth: config.strict_auth,
        }
    }
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs, config_path: Option<&Path>, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    let config = load_config(config_path).await?;

    match args.command {
        ConfigCommand::Show => {
            let summary = ConfigSummary::from(&config);
            match format {
                OutputFormat::Json => CommandResult::success(summary).print(format)?,
                OutputFormat::Text => print_summary(&summary),
            }
        }
        ConfigCommand::Validate => match format {
            OutputFormat::Json => CommandResult::success("valid").print(format)?,
            OutputFormat::Text => {
                output::success("Configuration is valid");
                if config.has_partial_keycloak() {
                    output::warning("only one of KEYCLOAK_CLIENT_ID / KEYCLOAK_CLIENT_SECRET is set");
                }
                if !config.has_keycloak_credentials() && config.inference_api_key.is_none() {
                    output::warning("no credentials configured; inference will run in open mode");
                }
            }
        },
    }
    Ok(())
}

fn print_summary(summary: &ConfigSummary) {
    let unset = || "-".to_string();

    output::section("Endpoints");
    output::key_value("base url", &summary.base_url.clone().unwrap_or_else(unset));
    output::key_value(
        "embeddings base url",
        &summary.embeddings_base_url.clone().unwrap_or_else(unset),
    );
    output::key_value("tts base url", &summary.tts_base_url.clone().unwrap_or_else(unset));
    output::key_value(
        "model endpoint",
        &summary.inference_model_endpoint.clone().unwrap_or_else(unset),
    );

    output::section("Credentials");
    output::key_value(
        "keycloak client id",
        &summary.keycloak_client_id.clone().unwrap_or_else(unset),
    );
    output::key_value("keycloak client secret", summary.keycloak_client_secret);
    output::key_value("inference api key", summary.inference_api_key);
    output::key_value("tts api key", summary.tts_api_key);

    output::section("Models");
    output::key_value("chat", &summary.model_name);
    output::key_value("embeddings", &summary.embedding_model_name);
    output::key_value(
        "speech",
        &format!("{} ({}, {}x)", summary.tts_model, summary.tts_voice, summary.tts_speed),
    );
    output::key_value("temperature", &summary.temperature.to_string());
    output::key_value("max tokens", &summary.max_tokens.to_string());

    output::section("Resilience");
    output::key_value("max retries", &summary.max_retries.to_string());
    output::key_value(
        "retry wait",
        &format!("{} to {}", summary.retry_min_wait, summary.retry_max_wait),
    );
    output::key_value("max concurrent", &summary.max_concurrent_requests.to_string());
    output::key_value("embedding batch", &summary.embedding_batch_size.to_string());
    output::key_value("token timeout", &summary.token_timeout);
    output::key_value("request timeout", &summary.request_timeout);
    output::status("tls verification", !summary.tls_insecure);
    output::status("open mode allowed", summary.allow_open_mode);
    output::status("strict auth", summary.strict_auth);
}
