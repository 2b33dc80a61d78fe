//! CLI argument definitions using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

/// Inference Broker - tiered-auth client for OpenAI-compatible gateways
#[derive(Parser, Debug)]
#[command(name = "inference-broker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (yaml, toml or json; defaults to $BROKER_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve auth for every configured service
    Auth(commands::auth::AuthArgs),

    /// Send a chat completion request
    Chat(commands::chat::ChatArgs),

    /// Translate source code between languages
    Translate(commands::translate::TranslateArgs),

    /// Embed texts
    Embed(commands::embed::EmbedArgs),

    /// Synthesize speech
    Speak(commands::speak::SpeakArgs),

    /// Inspect the effective configuration
    Config(commands::config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let config = self.config.as_deref();
        match self.command {
            Commands::Auth(args) => commands::auth::execute(args, config, self.json).await,
            Commands::Chat(args) => commands::chat::execute(args, config, self.json).await,
            Commands::Translate(args) => commands::translate::execute(args, config, self.json).await,
            Commands::Embed(args) => commands::embed::execute(args, config, self.json).await,
            Commands::Speak(args) => commands::speak::execute(args, config, self.json).await,
            Commands::Config(args) => commands::config::execute(args, config, self.json).await,
        }
    }
}
