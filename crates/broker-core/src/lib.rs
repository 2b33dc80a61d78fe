//! # Broker Core
//!
//! Core types and error handling for the Inference Broker.
//!
//! This crate provides the foundational types shared by every other crate:
//! - Authentication decisions and modes
//! - Generation request and result types
//! - The error taxonomy and result alias

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use auth::{AuthDecision, AuthMode, OPEN_MODE_CREDENTIAL};
pub use error::{BrokerError, BrokerResult, ErrorKind};
pub use request::{estimate_tokens, ChatMessage, GenerationRequest, MessageRole, Prompt};
pub use response::{GenerationResult, Usage};
