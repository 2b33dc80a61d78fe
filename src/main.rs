//! # Inference Broker
//!
//! Command-line front end for OpenAI-compatible inference, embeddings and
//! speech gateways behind Keycloak, a static API key, or no auth at all.
//!
//! ## Usage
//!
//! ```bash
//! # Show which auth tier wins for each service
//! inference-broker auth
//!
//! # One-shot chat completion
//! inference-broker chat -m "Summarize RFC 6749 in two lines"
//!
//! # Translate a file and write the result
//! inference-broker translate legacy.py --from python --to rust -o legacy.rs
//!
//! # Synthesize several segments with bounded concurrency
//! inference-broker speak "Hello" "World" --voice nova --voice echo -o out/
//! ```

use anyhow::Result;
use broker_telemetry::{init_logging, LoggingConfig};
use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let logging = LoggingConfig::from_verbosity(cli.verbose)
        .with_env()?
        .json(cli.json);
    init_logging(&logging)?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting inference-broker");

    cli.execute().await
}
