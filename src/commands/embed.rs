//! Embed command - compute embedding vectors.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the embed command.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Texts to embed (reads one text per stdin line when omitted)
    pub texts: Vec<String>,

    /// Print full vectors in text mode
    #[arg(long)]
    pub full: bool,
}

/// Embedding output for JSON.
#[derive(Debug, Serialize)]
pub struct EmbedOutput {
    pub model: String,
    pub dimensions: usize,
    pub vectors: Vec<Vec<f32>>,
}

/// Execute the embed command.
pub async fn execute(args: EmbedArgs, config: Option<&Path>, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    let texts = if args.texts.is_empty() {
        stdin_lines()?
    } else {
        args.texts
    };
    if texts.is_empty() {
        bail!("no texts provided");
    }

    let broker = super::connect(config).await?;
    let gateway = broker.embeddings();
    let vectors = gateway.embed_texts(&texts).await?;
    let dimensions = vectors.first().map_or(0, Vec::len);

    match format {
        OutputFormat::Json => CommandResult::success(EmbedOutput {
            model: gateway.settings().embedding_model.clone(),
            dimensions,
            vectors,
        })
        .print(format)?,
        OutputFormat::Text => {
            output::success(&format!(
                "{} embeddings with {dimensions} dimensions",
                vectors.len()
            ));
            for (text, vector) in texts.iter().zip(&vectors) {
                let shown = if args.full {
                    format!("{vector:?}")
                } else {
                    preview(vector)
                };
                output::key_value(text, &shown);
            }
        }
    }
    Ok(())
}

fn stdin_lines() -> Result<Vec<String>> {
    Ok(super::text_or_stdin(None)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn preview(vector: &[f32]) -> String {
    const SHOWN: usize = 4;
    let head: Vec<String> = vector.iter().take(SHOWN).map(|v| format!("{v:.4}")).collect();
    if vector.len() > SHOWN {
        format!("[{}, ...]", head.join(", "))
    } else {
        format!("[{}]", head.join(", "))
    }
}
