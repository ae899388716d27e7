//! Checkout line items.

use serde::{Deserialize, Serialize};

/// A price the customer is checking out, with quantity and unit amount.
///
/// Amounts are in minor currency units (cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    /// Gateway price identifier.
    pub price_id: String,

    pub quantity: u32,

    /// Unit amount in minor currency units.
    pub unit_amount: i64,
}

impl CheckoutLineItem {
    pub fn new(price_id: impl Into<String>, quantity: u32, unit_amount: i64) -> Self {
        Self {
            price_id: price_id.into(),
            quantity,
            unit_amount,
        }
    }

    /// Returns `unit_amount × quantity`.
    pub fn amount(&self) -> i64 {
        self.unit_amount.saturating_mul(i64::from(self.quantity))
    }
}
