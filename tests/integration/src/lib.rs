//! Integration tests for the Inference Broker
//!
//! Every test runs against wiremock gateways and covers:
//! - Keycloak token exchange and tier fallthrough
//! - Retry behavior of generation calls
//! - Bounded batch speech synthesis
//! - End-to-end `Broker` flows

pub mod fixtures;
pub mod helpers;
pub mod mock_gateway;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;
pub use mock_gateway::*;

#[cfg(test)]
mod auth_tests;
#[cfg(test)]
mod batch_tests;
#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod gateway_tests;
