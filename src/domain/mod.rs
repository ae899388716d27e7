//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `checkout` - Checkout session and line items read by the engine
//! - `subscription_change` - Signals, timing policy, previews and commit results

pub mod checkout;
pub mod foundation;
pub mod subscription_change;
