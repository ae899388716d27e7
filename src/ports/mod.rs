//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway Ports
//!
//! - `GatewayAdapter` - A billing provider integration with discoverable capabilities
//! - `SupportsChangePreview` - Read-only change previews
//! - `SupportsSubscriptionChanges` - Subscription mutations
//! - `IntegrationResolver` - Per-organization adapter lookup
//!
//! ## Persistence Ports
//!
//! - `CheckoutSessionRepository` - Checkout session reads and metadata appends

mod checkout_session_repository;
mod gateway_adapter;
mod integration_resolver;

pub use checkout_session_repository::CheckoutSessionRepository;
pub use gateway_adapter::{
    CommitRequest, GatewayAdapter, GatewayError, GatewayErrorCode, SupportsChangePreview,
    SupportsSubscriptionChanges,
};
pub use integration_resolver::IntegrationResolver;
