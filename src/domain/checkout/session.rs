//! Checkout session as seen by the change engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CheckoutIntent, CheckoutLineItem};
use crate::domain::foundation::{CheckoutSessionId, OfferId, OrganizationId};
use crate::domain::subscription_change::ChangeAction;

/// Free-form metadata owned by a checkout session.
pub type SessionMetadata = BTreeMap<String, serde_json::Value>;

/// An in-progress or recently completed checkout.
///
/// Everything except `metadata` is read-only for the engine. Metadata is
/// only ever appended to, key by key, after a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: CheckoutSessionId,
    pub organization_id: OrganizationId,
    pub offer_id: OfferId,
    pub intent: CheckoutIntent,

    /// Existing gateway subscription, if the customer already has one.
    pub subscription: Option<String>,

    /// Gateway customer the subscription belongs to (or will be created for).
    pub customer: Option<String>,

    /// ISO 4217 currency code, lowercase.
    pub currency: String,

    pub line_items: Vec<CheckoutLineItem>,

    /// Trial length the offer grants to new subscribers.
    pub trial_period_days: Option<u32>,

    /// Preview variant the customer picked (e.g. `skip_trial`).
    pub requested_action: Option<ChangeAction>,

    /// Explicit effective date requested for the change.
    pub effective_date: Option<String>,

    metadata: SessionMetadata,
}

impl CheckoutSession {
    /// Creates a checkout with no subscription, no line items and empty metadata.
    pub fn new(
        id: CheckoutSessionId,
        organization_id: OrganizationId,
        offer_id: OfferId,
        intent: CheckoutIntent,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id,
            organization_id,
            offer_id,
            intent,
            subscription: None,
            customer: None,
            currency: currency.into().to_lowercase(),
            line_items: Vec::new(),
            trial_period_days: None,
            requested_action: None,
            effective_date: None,
            metadata: SessionMetadata::new(),
        }
    }

    pub fn with_subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription = Some(subscription_id.into());
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer = Some(customer_id.into());
        self
    }

    pub fn with_line_item(mut self, item: CheckoutLineItem) -> Self {
        self.line_items.push(item);
        self
    }

    pub fn with_trial_period_days(mut self, days: u32) -> Self {
        self.trial_period_days = Some(days);
        self
    }

    pub fn with_requested_action(mut self, action: ChangeAction) -> Self {
        self.requested_action = Some(action);
        self
    }

    pub fn with_effective_date(mut self, date: impl Into<String>) -> Self {
        self.effective_date = Some(date.into());
        self
    }

    /// Seeds metadata written by the checkout flow before the engine sees it.
    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sum of all line item amounts, in minor units.
    pub fn total_amount(&self) -> i64 {
        self.line_items
            .iter()
            .fold(0i64, |acc, item| acc.saturating_add(item.amount()))
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Appends entries to the metadata map.
    ///
    /// Keys present in `entries` replace their previous value; every other
    /// key is left untouched.
    pub fn append_metadata(&mut self, entries: SessionMetadata) {
        self.metadata.extend(entries);
    }
}
