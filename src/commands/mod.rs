//! CLI command implementations.

pub mod auth;
pub mod chat;
pub mod config;
pub mod embed;
pub mod speak;
pub mod translate;

use anyhow::{Context, Result};
use broker_config::load_config;
use broker_sdk::Broker;
use std::io::{self, Read};
use std::path::Path;

/// Load configuration and connect every configured gateway.
pub async fn connect(config_path: Option<&Path>) -> Result<Broker> {
    let config = load_config(config_path)
        .await
        .context("failed to load configuration")?;
    Broker::connect(config)
        .await
        .context("failed to connect to the gateway")
}

/// Use `value` if given, otherwise read all of stdin.
pub fn text_or_stdin(value: Option<String>) -> Result<String> {
    match value {
        Some(text) => Ok(text),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            Ok(input.trim().to_string())
        }
    }
}
