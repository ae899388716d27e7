//! Checkout domain module.
//!
//! The checkout session is created and persisted by the checkout flow. The
//! change engine only reads it, except for `metadata`, which the commit step
//! appends to.

mod intent;
mod line_item;
mod session;

pub use intent::CheckoutIntent;
pub use line_item::CheckoutLineItem;
pub use session::{CheckoutSession, SessionMetadata};
