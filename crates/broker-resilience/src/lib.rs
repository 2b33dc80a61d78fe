//! # Broker Resilience
//!
//! Resilience patterns for the Inference Broker:
//! - Retry policy with exponential backoff clamped to a wait window
//! - Concurrency gate bounding in-flight remote calls

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod gate;
pub mod retry;

pub use gate::{ConcurrencyGate, GatePermit, GateStats};
pub use retry::{RetryConfig, RetryPolicy, RetryPolicyBuilder};
