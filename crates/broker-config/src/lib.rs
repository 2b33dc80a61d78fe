//! # Broker Config
//!
//! Configuration for the Inference Broker.
//!
//! Configuration is layered:
//! 1. Built-in defaults
//! 2. Optional YAML / TOML / JSON file
//! 3. Environment variable overrides (`BASE_URL`, `KEYCLOAK_CLIENT_ID`, ...)
//!
//! The result is validated once at startup; see [`GatewayConfig::validate_config`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod loader;

pub use config::{GatewayConfig, ServiceEndpoint};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_with, CONFIG_PATH_ENV};
