//! # Broker Telemetry
//!
//! Structured logging for the Inference Broker.
//!
//! All crates log through `tracing`; this crate installs the subscriber and
//! provides span macros for the auth tiers and generation calls.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingError};
