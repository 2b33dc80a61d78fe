//! # Broker Auth
//!
//! Decides how the broker authenticates against a gateway.
//!
//! Tiers are tried in a fixed order:
//! 1. Keycloak client-credentials exchange
//! 2. Static API key
//! 3. Open mode with the `"no-auth"` sentinel
//!
//! The first tier that yields a credential wins, and the decision is cached for
//! the lifetime of the [`AuthResolver`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod resolver;
pub mod token;

pub use resolver::{AuthResolver, AuthSettings, Resolution, TierAttempt, TierOutcome};
pub use token::{token_endpoint, KeycloakTokenResolver, TokenRequest, TokenResolver};
