//! In-memory adapters.
//!
//! Process-local implementations of the persistence and integration ports,
//! for tests, development and single-tenant embedding.

mod in_memory_checkout_sessions;
mod static_integration_resolver;

pub use in_memory_checkout_sessions::InMemoryCheckoutSessions;
pub use static_integration_resolver::StaticIntegrationResolver;
