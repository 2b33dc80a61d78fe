//! Generation result types.

use serde::{Deserialize, Serialize};

/// Token usage statistics reported by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Total tokens.
    #[serde(default)]
    pub total_tokens: u32,
}

/// Text produced by a completion-style call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Final text (after any post-processing).
    pub text: String,
    /// Character count of the raw model output before post-processing.
    pub raw_character_count: usize,
    /// Model reported by the gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Token usage, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl GenerationResult {
    /// Result whose text is the raw output.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let text = raw.into();
        Self {
            raw_character_count: text.chars().count(),
            text,
            model: None,
            usage: None,
        }
    }

    /// Empty result used when the gateway returned no choice.
    pub fn empty() -> Self {
        Self::from_raw(String::new())
    }

    /// Replace the text while keeping the raw character count.
    #[must_use]
    pub fn map_text(mut self, f: impl FnOnce(&str) -> String) -> Self {
        self.text = f(&self.text);
        self
    }

    /// `true` when no text was produced.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
