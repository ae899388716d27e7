//! Stripe API objects used by the subscription change adapter.
//!
//! Only the fields the adapter reads are modelled; everything else in the
//! Stripe payloads is ignored.

use serde::Deserialize;

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

/// A Stripe list envelope (`{"object": "list", "data": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    pub customer: String,

    /// Status (active, trialing, past_due, canceled, incomplete, ...).
    pub status: String,

    /// Three-letter ISO currency code, lowercase.
    pub currency: Option<String>,

    #[serde(default)]
    pub items: StripeList<StripeSubscriptionItem>,

    pub trial_end: Option<i64>,
}

impl StripeSubscription {
    pub fn is_trialing(&self) -> bool {
        self.status == "trialing"
    }

    /// Whether the subscription can no longer be changed.
    pub fn is_terminated(&self) -> bool {
        matches!(self.status.as_str(), "canceled" | "incomplete_expired")
    }
}

/// An item (price × quantity) of a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    /// Subscription item identifier (si_...).
    pub id: String,

    pub price: StripePrice,

    pub quantity: Option<u32>,
}

/// Stripe Price object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    /// Price identifier (price_...).
    pub id: String,

    /// Amount per unit in minor units. Absent for tiered prices.
    pub unit_amount: Option<i64>,

    pub currency: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Invoices
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe upcoming Invoice object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub amount_due: i64,

    pub currency: String,

    #[serde(default)]
    pub lines: StripeList<StripeInvoiceLine>,
}

/// A line of an upcoming invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoiceLine {
    pub description: Option<String>,

    /// Signed amount in minor units; credits for unused time are negative.
    pub amount: i64,

    #[serde(default)]
    pub proration: bool,

    pub quantity: Option<u32>,

    pub price: Option<StripePrice>,
}

impl StripeInvoice {
    /// Sum of the proration lines, i.e. what an immediate invoice would charge.
    pub fn proration_total(&self) -> i64 {
        self.lines
            .data
            .iter()
            .filter(|line| line.proration)
            .map(|line| line.amount)
            .sum()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════════

/// Body of a non-2xx Stripe response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeApiError,
}

/// Stripe error object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    /// Error type (card_error, invalid_request_error, api_error, ...).
    #[serde(rename = "type")]
    pub error_type: String,

    /// Short machine-readable code (e.g. "resource_missing", "card_declined").
    pub code: Option<String>,

    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trialing_subscription() {
        let json = r#"{
            "id": "sub_1",
            "object": "subscription",
            "customer": "cus_1",
            "status": "trialing",
            "currency": "usd",
            "trial_end": 1700600000,
            "items": {
                "object": "list",
                "data": [
                    { "id": "si_1", "price": { "id": "price_seat", "unit_amount": 1000, "currency": "usd" }, "quantity": 3 }
                ]
            }
        }"#;

        let sub: StripeSubscription = serde_json::from_str(json).unwrap();
        assert!(sub.is_trialing());
        assert!(!sub.is_terminated());
        assert_eq!(sub.items.data[0].price.unit_amount, Some(1000));
        assert_eq!(sub.items.data[0].quantity, Some(3));
    }

    #[test]
    fn proration_total_ignores_regular_lines() {
        let json = r#"{
            "amount_due": 2500,
            "currency": "usd",
            "lines": { "data": [
                { "description": "Unused time on Basic", "amount": -500, "proration": true },
                { "description": "Remaining time on Pro", "amount": 1000, "proration": true },
                { "description": "Pro", "amount": 2000, "proration": false }
            ] }
        }"#;

        let invoice: StripeInvoice = serde_json::from_str(json).unwrap();
        assert_eq!(invoice.proration_total(), 500);
    }

    #[test]
    fn parses_error_envelope() {
        let json = r#"{ "error": { "type": "card_error", "code": "card_declined", "message": "Your card was declined." } }"#;
        let envelope: StripeErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.error_type, "card_error");
        assert_eq!(envelope.error.code.as_deref(), Some("card_declined"));
    }
}
