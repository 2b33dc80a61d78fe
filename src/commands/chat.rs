//! Chat command - send chat completion requests.

use anyhow::{bail, Result};
use broker_core::{GenerationRequest, GenerationResult};
use clap::Args;
use std::path::Path;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Message to send (if not provided, reads from stdin)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Model to use (defaults to the configured model)
    #[arg(short = 'M', long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Temperature (0.0 to 2.0)
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Show token usage
    #[arg(long)]
    pub show_usage: bool,
}

impl ChatArgs {
    fn to_request(&self, message: String) -> GenerationRequest {
        let mut request = match &self.system {
            Some(system) => GenerationRequest::with_system(system.clone(), message),
            None => GenerationRequest::user(message),
        };
        if let Some(model) = &self.model {
            request = request.model(model.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.max_tokens(max_tokens);
        }
        request
    }
}

/// Execute the chat command.
pub async fn execute(args: ChatArgs, config: Option<&Path>, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    let message = super::text_or_stdin(args.message.clone())?;
    if message.is_empty() {
        bail!("no message provided");
    }

    let broker = super::connect(config).await?;
    let result = broker.inference().chat(&args.to_request(message)).await?;

    match format {
        OutputFormat::Json => CommandResult::success(result).print(format)?,
        OutputFormat::Text => print_text(&result, args.show_usage),
    }
    Ok(())
}

fn print_text(result: &GenerationResult, show_usage: bool) {
    if result.is_empty() {
        output::warning("the model returned no content");
        return;
    }
    println!("{}", result.text);

    if show_usage {
        if let Some(usage) = result.usage {
            output::section("Usage");
            output::key_value("prompt tokens", &usage.prompt_tokens.to_string());
            output::key_value("completion tokens", &usage.completion_tokens.to_string());
            output::key_value("total tokens", &usage.total_tokens.to_string());
        }
    }
}
