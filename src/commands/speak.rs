//! Speak command - synthesize speech to mp3 files.

use anyhow::{bail, Result};
use broker_sdk::available_voices;
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the speak command.
#[derive(Args, Debug)]
pub struct SpeakArgs {
    /// Texts to synthesize; more than one writes numbered segments
    pub texts: Vec<String>,

    /// Voice per text; a single voice applies to all of them
    #[arg(long)]
    pub voice: Vec<String>,

    /// Speaking speed (0.25 to 4.0)
    #[arg(long)]
    pub speed: Option<f32>,

    /// Output file for one text, output directory for several
    #[arg(short, long, default_value = "speech.mp3")]
    pub output: PathBuf,

    /// List the available voices and exit
    #[arg(long)]
    pub list_voices: bool,
}

/// Synthesis output for JSON.
#[derive(Debug, Serialize)]
pub struct SpeakOutput {
    pub files: Vec<PathBuf>,
    pub failed: Vec<SegmentFailure>,
}

/// A segment that could not be synthesized.
#[derive(Debug, Serialize)]
pub struct SegmentFailure {
    pub index: usize,
    pub error: String,
}

/// Execute the speak command.
pub async fn execute(args: SpeakArgs, config: Option<&Path>, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    if args.list_voices {
        return match format {
            OutputFormat::Json => CommandResult::success(available_voices()).print(format),
            OutputFormat::Text => {
                output::section("Voices");
                for voice in available_voices() {
                    println!("  {voice}");
                }
                Ok(())
            }
        };
    }

    let texts = if args.texts.is_empty() {
        vec![super::text_or_stdin(None)?]
    } else {
        args.texts.clone()
    };
    if texts.iter().all(|t| t.trim().is_empty()) {
        bail!("no text provided");
    }

    let broker = super::connect(config).await?;
    let gateway = broker.speech()?;

    let result = if texts.len() == 1 {
        let voice = args.voice.first().map(String::as_str);
        gateway
            .synthesize_to(&texts[0], voice, args.speed, &args.output)
            .await?;
        SpeakOutput {
            files: vec![args.output.clone()],
            failed: Vec::new(),
        }
    } else {
        let voices = expand_voices(&args.voice, texts.len(), &gateway.settings().tts_voice);
        synthesize_segments(gateway, &texts, &voices, args.speed, &args.output).await?
    };

    match format {
        OutputFormat::Json => CommandResult::success(&result).print(format)?,
        OutputFormat::Text => {
            for file in &result.files {
                output::success(&format!("Saved {}", file.display()));
            }
            for failure in &result.failed {
                output::error(&format!("segment {}: {}", failure.index, failure.error));
            }
        }
    }

    if !result.failed.is_empty() {
        bail!(
            "{} of {} segments failed",
            result.failed.len(),
            result.failed.len() + result.files.len()
        );
    }
    Ok(())
}

/// One voice for every text, the configured voice when none is given, or the
/// list as-is.
fn expand_voices(voices: &[String], count: usize, default_voice: &str) -> Vec<String> {
    match voices {
        [] => vec![default_voice.to_string(); count],
        [voice] => vec![voice.clone(); count],
        many => many.to_vec(),
    }
}

async fn synthesize_segments(
    gateway: &broker_sdk::GenerationGateway,
    texts: &[String],
    voices: &[String],
    speed: Option<f32>,
    output_dir: &Path,
) -> Result<SpeakOutput> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let bar = output::progress(texts.len() as u64, "Synthesizing")?;
    let report = gateway
        .synthesize_batch_cancellable(texts, voices, speed, output_dir, &cancel, |_, _| bar.inc(1))
        .await;
    bar.finish_and_clear();

    let mut result = SpeakOutput {
        files: Vec::new(),
        failed: Vec::new(),
    };
    for (index, slot) in report?.into_results().into_iter().enumerate() {
        match slot {
            Ok(path) => result.files.push(path),
            Err(e) => result.failed.push(SegmentFailure {
                index,
                error: e.to_string(),
            }),
        }
    }
    Ok(result)
}
