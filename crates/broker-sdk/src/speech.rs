//! Speech synthesis calls.

use crate::batch::BatchReport;
use crate::gateway::GenerationGateway;
use crate::wire::SpeechRequest;
use broker_core::{BrokerError, BrokerResult};
use broker_telemetry::generation_span;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, Instrument};

/// Voices offered by OpenAI-compatible speech gateways.
pub const AVAILABLE_VOICES: [&str; 6] = ["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Voices offered by OpenAI-compatible speech gateways.
pub fn available_voices() -> &'static [&'static str] {
    &AVAILABLE_VOICES
}

/// File name for batch segment `index`.
pub fn segment_file_name(index: usize) -> String {
    format!("segment_{index:03}.mp3")
}

impl GenerationGateway {
    /// Synthesize speech; `None` falls back to the configured voice and speed
    ///
    /// # Errors
    /// Returns `MalformedResponse` for an empty audio body, otherwise the
    /// terminal gateway error
    pub async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: Option<f32>,
    ) -> BrokerResult<Bytes> {
        self.synthesize_inner(text, voice, speed, None).await
    }

    /// Synthesize speech and write it to `output_path`, creating parent
    /// directories as needed
    ///
    /// # Errors
    /// As [`GenerationGateway::synthesize`], plus `Io` for write failures
    pub async fn synthesize_to(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: Option<f32>,
        output_path: &Path,
    ) -> BrokerResult<Bytes> {
        let audio = self.synthesize_inner(text, voice, speed, None).await?;
        write_audio(output_path, &audio).await?;
        Ok(audio)
    }

    /// Synthesize one segment per text into `output_dir`
    ///
    /// Segment `i` is written to `segment_{i:03}.mp3` using `voices[i]`. At
    /// most `max_concurrent_requests` segments are in flight.
    ///
    /// # Errors
    /// Returns `Config` when `voices` and `texts` differ in length, or `Io`
    /// if the output directory cannot be created. Per-segment failures are
    /// reported in the returned [`BatchReport`].
    pub async fn synthesize_batch(
        &self,
        texts: &[String],
        voices: &[String],
        output_dir: &Path,
    ) -> BrokerResult<BatchReport<PathBuf>> {
        self.synthesize_batch_cancellable(
            texts,
            voices,
            None,
            output_dir,
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
    }

    /// [`GenerationGateway::synthesize_batch`] at `speed` that stops when
    /// `cancel` fires
    ///
    /// `on_segment` is called with the index and outcome of every segment as
    /// it settles, in completion order.
    ///
    /// # Errors
    /// See [`GenerationGateway::synthesize_batch`]
    pub async fn synthesize_batch_cancellable<F>(
        &self,
        texts: &[String],
        voices: &[String],
        speed: Option<f32>,
        output_dir: &Path,
        cancel: &CancellationToken,
        on_segment: F,
    ) -> BrokerResult<BatchReport<PathBuf>>
    where
        F: Fn(usize, &BrokerResult<PathBuf>),
    {
        if texts.len() != voices.len() {
            return Err(BrokerError::config(format!(
                "{} texts but {} voices; every segment needs a voice",
                texts.len(),
                voices.len()
            )));
        }

        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            BrokerError::io(format!("creating output directory {}", output_dir.display()), e)
        })?;

        info!(segments = texts.len(), dir = %output_dir.display(), "Synthesizing speech batch");

        let inputs: Vec<(&str, &str)> = texts
            .iter()
            .map(String::as_str)
            .zip(voices.iter().map(String::as_str))
            .collect();

        let on_segment = &on_segment;
        let report = self
            .batch_executor()
            .run_cancellable(inputs, cancel, |job| async move {
                let (text, voice) = job.input;
                let path = output_dir.join(segment_file_name(job.index));
                let written = self
                    .synthesize_inner(text, Some(voice), speed, Some(cancel))
                    .await;
                let written = match written {
                    Ok(audio) => write_audio(&path, &audio).await.map(|()| path),
                    Err(e) => Err(e),
                };
                on_segment(job.index, &written);
                written
            })
            .await;

        Ok(report)
    }

    async fn synthesize_inner(
        &self,
        text: &str,
        voice: Option<&str>,
        speed: Option<f32>,
        cancel: Option<&CancellationToken>,
    ) -> BrokerResult<Bytes> {
        let settings = self.settings();
        let voice = voice.unwrap_or(settings.tts_voice.as_str());
        let body = SpeechRequest {
            model: settings.tts_model.as_str(),
            voice,
            input: text,
            speed: speed.unwrap_or(settings.tts_speed),
        };
        let span = generation_span!(self.service(), "speech", body.model);

        async {
            info!(voice, characters = text.chars().count(), "Generating speech");
            let response = self.send_with_retry("audio/speech", &body, cancel).await?;
            let audio = response
                .bytes()
                .await
                .map_err(|e| BrokerError::transient(format!("failed to read audio body: {e}")))?;

            if audio.is_empty() {
                return Err(BrokerError::malformed("speech response body is empty"));
            }
            debug!(bytes = audio.len(), "Speech generated");
            Ok(audio)
        }
        .instrument(span)
        .await
    }
}

async fn write_audio(path: &Path, audio: &[u8]) -> BrokerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BrokerError::io(format!("creating {}", parent.display()), e))?;
    }
    tokio::fs::write(path, audio)
        .await
        .map_err(|e| BrokerError::io(format!("writing {}", path.display()), e))?;
    info!(path = %path.display(), "Saved audio");
    Ok(())
}
