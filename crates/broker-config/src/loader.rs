//! Configuration loading from files and the environment.

use crate::config::GatewayConfig;
use crate::error::{ConfigError, ConfigResult};
use secrecy::SecretString;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an optional config file.
pub const CONFIG_PATH_ENV: &str = "BROKER_CONFIG";

/// Load configuration from an optional file plus the process environment.
///
/// When `path` is `None`, [`CONFIG_PATH_ENV`] is consulted.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, an environment
/// value is unusable, or validation fails.
pub async fn load_config(path: Option<&Path>) -> ConfigResult<GatewayConfig> {
    load_config_with(path, |key| std::env::var(key).ok()).await
}

/// Load configuration using a custom variable lookup.
///
/// # Errors
/// See [`load_config`].
pub async fn load_config_with<F>(path: Option<&Path>, lookup: F) -> ConfigResult<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env_path = lookup(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty());
    let file = path
        .map(Path::to_path_buf)
        .or_else(|| env_path.map(Into::into));

    let mut config = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            read_file(&path).await?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, &lookup)?;
    config.validate_config()?;

    debug!(
        base_url = config.base_url.as_deref().unwrap_or_default(),
        model = %config.model_name,
        max_retries = config.max_retries,
        max_concurrent_requests = config.max_concurrent_requests,
        "Configuration loaded"
    );
    Ok(config)
}

async fn read_file(path: &Path) -> ConfigResult<GatewayConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parsed = match extension.as_deref() {
        Some("toml") => toml::from_str(&content).map_err(|e| e.to_string()),
        Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Apply environment overrides on top of `config`.
///
/// Empty values are treated as unset.
fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let first = |keys: &[&'static str]| {
        keys.iter()
            .find_map(|key| get(key).map(|value| (*key, value)))
    };

    if let Some(v) = get("BASE_URL") {
        config.base_url = Some(v);
    }
    if let Some(v) = get("EMBEDDINGS_BASE_URL") {
        config.embeddings_base_url = Some(v);
    }
    if let Some(v) = get("TTS_BASE_URL") {
        config.tts_base_url = Some(v);
    }
    if let Some(v) = get("INFERENCE_MODEL_ENDPOINT") {
        config.inference_model_endpoint = Some(v);
    }

    if let Some(v) = get("KEYCLOAK_CLIENT_ID") {
        config.keycloak_client_id = Some(v);
    }
    if let Some(v) = get("KEYCLOAK_CLIENT_SECRET") {
        config.keycloak_client_secret = Some(SecretString::new(v));
    }
    if let Some(v) = get("INFERENCE_API_KEY") {
        config.inference_api_key = Some(SecretString::new(v));
    }
    if let Some(v) = get("TTS_API_KEY") {
        config.tts_api_key = Some(SecretString::new(v));
    }

    if let Some((_, v)) = first(&["INFERENCE_MODEL_NAME", "MODEL_NAME"]) {
        config.model_name = v;
    }
    if let Some(v) = get("EMBEDDING_MODEL_NAME") {
        config.embedding_model_name = v;
    }
    if let Some(v) = get("TTS_MODEL") {
        config.tts_model = v;
    }
    if let Some(v) = get("TTS_VOICE") {
        config.tts_voice = v;
    }
    if let Some(v) = get("TTS_SPEED") {
        config.tts_speed = parse_value("TTS_SPEED", &v)?;
    }

    if let Some((key, v)) = first(&["LLM_TEMPERATURE", "TEMPERATURE"]) {
        config.temperature = parse_value(key, &v)?;
    }
    if let Some((key, v)) = first(&["LLM_MAX_TOKENS", "MAX_TOKENS"]) {
        config.max_tokens = parse_value(key, &v)?;
    }
    if let Some(v) = get("TRANSLATION_TEMPERATURE") {
        config.translation_temperature = parse_value("TRANSLATION_TEMPERATURE", &v)?;
    }
    if let Some(v) = get("TRANSLATION_MAX_TOKENS") {
        config.translation_max_tokens = parse_value("TRANSLATION_MAX_TOKENS", &v)?;
    }

    if let Some(v) = get("MAX_RETRIES") {
        config.max_retries = parse_value("MAX_RETRIES", &v)?;
    }
    if let Some(v) = get("MAX_CONCURRENT_REQUESTS") {
        config.max_concurrent_requests = parse_value("MAX_CONCURRENT_REQUESTS", &v)?;
    }
    if let Some(v) = get("EMBEDDING_BATCH_SIZE") {
        config.embedding_batch_size = parse_value("EMBEDDING_BATCH_SIZE", &v)?;
    }

    if let Some(v) = get("TOKEN_TIMEOUT") {
        config.token_timeout = parse_duration("TOKEN_TIMEOUT", &v)?;
    }
    if let Some(v) = get("REQUEST_TIMEOUT") {
        config.request_timeout = parse_duration("REQUEST_TIMEOUT", &v)?;
    }
    if let Some(v) = get("RETRY_MIN_WAIT") {
        config.retry_min_wait = parse_duration("RETRY_MIN_WAIT", &v)?;
    }
    if let Some(v) = get("RETRY_MAX_WAIT") {
        config.retry_max_wait = parse_duration("RETRY_MAX_WAIT", &v)?;
    }

    if let Some(v) = get("GATEWAY_TLS_INSECURE") {
        config.tls_insecure = parse_bool("GATEWAY_TLS_INSECURE", &v)?;
    }
    if let Some(v) = get("ALLOW_OPEN_MODE") {
        config.allow_open_mode = parse_bool("ALLOW_OPEN_MODE", &v)?;
    }
    if let Some(v) = get("STRICT_AUTH") {
        config.strict_auth = parse_bool("STRICT_AUTH", &v)?;
    }

    Ok(())
}

fn parse_value<T>(field: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(field, e.to_string()))
}

/// Accepts humantime strings (`"10s"`, `"2m"`) or bare seconds.
fn parse_duration(field: &str, value: &str) -> ConfigResult<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            return Ok(Duration::from_secs_f64(secs));
        }
        return Err(ConfigError::invalid(field, "duration must be non-negative"));
    }
    humantime::parse_duration(value).map_err(|e| ConfigError::invalid(field, e.to_string()))
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(
            field,
            format!("expected a boolean, got '{other}'"),
        )),
    }
}
