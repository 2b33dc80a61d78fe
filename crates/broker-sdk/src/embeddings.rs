//! Embedding calls.

use crate::gateway::GenerationGateway;
use crate::wire::{EmbeddingRequest, EmbeddingResponse};
use broker_core::{BrokerError, BrokerResult};
use broker_telemetry::generation_span;
use tracing::{debug, Instrument};

impl GenerationGateway {
    /// Embed one text
    ///
    /// # Errors
    /// Returns `MalformedResponse` when no vector comes back, otherwise as
    /// [`GenerationGateway::embed_texts`]
    pub async fn embed_text(&self, text: &str) -> BrokerResult<Vec<f32>> {
        self.embed_texts(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| BrokerError::malformed("embeddings response contained no vectors"))
    }

    /// Embed many texts, chunked by the configured batch size
    ///
    /// Vectors are returned in input order.
    ///
    /// # Errors
    /// Returns `MalformedResponse` if a chunk yields fewer vectors than inputs,
    /// or the terminal error of a failed chunk
    pub async fn embed_texts(&self, texts: &[String]) -> BrokerResult<Vec<Vec<f32>>> {
        let model = self.settings().embedding_model.as_str();
        let span = generation_span!(self.service(), "embeddings", model);

        async {
            let mut vectors = Vec::with_capacity(texts.len());
            let chunk_size = self.settings().embedding_batch_size.max(1);
            for (chunk_index, chunk) in texts.chunks(chunk_size).enumerate() {
                debug!(chunk = chunk_index, inputs = chunk.len(), "Requesting embeddings");
                let body = EmbeddingRequest { model, input: chunk };

                let response = self.send_with_retry("embeddings", &body, None).await?;
                let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
                    BrokerError::malformed(format!("unparseable embeddings response: {e}"))
                })?;

                let chunk_vectors = parsed.into_vectors();
                if chunk_vectors.len() < chunk.len() {
                    return Err(BrokerError::malformed(format!(
                        "expected {} embeddings, got {}",
                        chunk.len(),
                        chunk_vectors.len()
                    )));
                }
                vectors.extend(chunk_vectors.into_iter().take(chunk.len()));
            }
            Ok(vectors)
        }
        .instrument(span)
        .await
    }
}
