//! Stripe gateway adapter.
//!
//! Implements the `GatewayAdapter` capabilities for Stripe, including:
//! - Classification of checkouts against live subscriptions
//! - Proration previews from the upcoming invoice
//! - Idempotent subscription creation and updates
//!
//! # Security
//!
//! - API keys are handled via `secrecy::SecretString`
//! - Every mutating request carries an `Idempotency-Key` header
//!
//! # Configuration
//!
//! Loaded from `CHANGE_ENGINE__PAYMENT__STRIPE_API_KEY` (and optionally
//! `CHANGE_ENGINE__PAYMENT__STRIPE_API_BASE_URL`) through `AppConfig`.

mod api_types;
mod classifier;
mod mock_gateway_adapter;
mod stripe_adapter;

pub use api_types::{
    StripeApiError, StripeErrorEnvelope, StripeInvoice, StripeInvoiceLine, StripeList,
    StripePrice, StripeSubscription, StripeSubscriptionItem,
};
pub use classifier::{classify, ChangePlan, ALREADY_MATCHES_REASON};
pub use mock_gateway_adapter::{MethodCall, MockGatewayAdapter};
pub use stripe_adapter::{
    StripeConfig, StripeGatewayAdapter, DEFAULT_API_BASE_URL, NO_SUBSCRIPTION_REASON,
    SCHEDULED_CHANGE_REASON,
};
