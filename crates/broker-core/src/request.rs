//! Generation request types.

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message that sets the behavior of the assistant.
    System,
    /// User message.
    User,
    /// Assistant (model) message.
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: MessageRole,
    /// Content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a new message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// What the model is asked: a prompt pair or a full conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Optional system prompt plus a user prompt.
    Single {
        /// System prompt.
        system: Option<String>,
        /// User prompt.
        user: String,
    },
    /// Explicit conversation history.
    Messages(Vec<ChatMessage>),
}

/// A single generation request.
///
/// Unset sampling fields fall back to the gateway defaults from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Prompt or conversation.
    pub prompt: Prompt,
    /// Model override.
    pub model: Option<String>,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
    /// Max tokens override.
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Request with a single user prompt.
    pub fn user(prompt: impl Into<String>) -> Self {
        Self::from_prompt(Prompt::Single {
            system: None,
            user: prompt.into(),
        })
    }

    /// Request with a system prompt and a user prompt.
    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::from_prompt(Prompt::Single {
            system: Some(system.into()),
            user: user.into(),
        })
    }

    /// Request with an explicit conversation.
    pub fn messages(messages: Vec<ChatMessage>) -> Self {
        Self::from_prompt(Prompt::Messages(messages))
    }

    fn from_prompt(prompt: Prompt) -> Self {
        Self {
            prompt,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Rough token count of every message in the prompt.
    pub fn estimated_prompt_tokens(&self) -> usize {
        self.to_messages()
            .iter()
            .map(|m| estimate_tokens(&m.content))
            .sum()
    }

    /// Flatten the prompt into the wire message list.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        match &self.prompt {
            Prompt::Single { system, user } => {
                let mut messages = Vec::with_capacity(2);
                if let Some(system) = system {
                    messages.push(ChatMessage::system(system.clone()));
                }
                messages.push(ChatMessage::user(user.clone()));
                messages
            }
            Prompt::Messages(messages) => messages.clone(),
        }
    }
}

/// Rough token count for `text`: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}
