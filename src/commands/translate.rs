//! Translate command - convert source code between languages.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the translate command.
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Source file (reads stdin when omitted)
    pub input: Option<PathBuf>,

    /// Source language
    #[arg(long = "from")]
    pub source_language: String,

    /// Target language
    #[arg(long = "to")]
    pub target_language: String,

    /// Write the translation here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Translation output for JSON.
#[derive(Debug, Serialize)]
pub struct TranslateOutput {
    pub source_language: String,
    pub target_language: String,
    pub code: String,
    pub raw_character_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Execute the translate command.
pub async fn execute(args: TranslateArgs, config: Option<&Path>, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    let source = match &args.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => super::text_or_stdin(None)?,
    };
    if source.trim().is_empty() {
        bail!("no source code provided");
    }

    let broker = super::connect(config).await?;
    let result = broker
        .inference()
        .translate_code(&source, &args.source_language, &args.target_language)
        .await?;

    if let Some(path) = &args.output {
        tokio::fs::write(path, &result.text)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => CommandResult::success(TranslateOutput {
            source_language: args.source_language,
            target_language: args.target_language,
            code: result.text,
            raw_character_count: result.raw_character_count,
            output: args.output,
        })
        .print(format)?,
        OutputFormat::Text => match &args.output {
            Some(path) => output::success(&format!(
                "Translated {} to {} ({} chars) -> {}",
                args.source_language,
                args.target_language,
                result.text.chars().count(),
                path.display()
            )),
            None => println!("{}", result.text),
        },
    }
    Ok(())
}
