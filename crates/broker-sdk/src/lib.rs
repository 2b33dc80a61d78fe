//! # Broker SDK
//!
//! Clients for OpenAI-compatible inference, embeddings and speech gateways.
//!
//! - [`ClientFactory`] binds a normalized `/v1` base URL and a resolved
//!   credential into a [`ResolvedClient`]
//! - [`GenerationGateway`] issues chat, embeddings and speech calls with
//!   retry and response validation
//! - [`BatchExecutor`] fans jobs out under a fixed concurrency limit
//! - [`Broker`] wires all of it together from a [`GatewayConfig`]
//!
//! ```rust,no_run
//! use broker_config::load_config;
//! use broker_sdk::Broker;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config(None).await?;
//! let broker = Broker::connect(config).await?;
//!
//! let answer = broker.inference().complete("Say hello").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! [`GatewayConfig`]: broker_config::GatewayConfig

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod broker;
pub mod embeddings;
pub mod factory;
pub mod fence;
pub mod gateway;
pub mod speech;
mod wire;

pub use batch::{BatchExecutor, BatchJob, BatchReport};
pub use broker::{Broker, Service};
pub use factory::{normalize_base_url, ClientFactory, ResolvedClient};
pub use fence::strip_code_fences;
pub use gateway::{retry_policy_from_config, GatewaySettings, GenerationGateway};
pub use speech::{available_voices, segment_file_name, AVAILABLE_VOICES};
