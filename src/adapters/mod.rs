//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe` - Stripe gateway adapter (plus a configurable mock)
//! - `memory` - In-memory checkout sessions and a static integration registry

pub mod memory;
pub mod stripe;

pub use memory::{InMemoryCheckoutSessions, StaticIntegrationResolver};
pub use stripe::{MockGatewayAdapter, StripeConfig, StripeGatewayAdapter};
