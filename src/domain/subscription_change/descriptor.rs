//! Commit descriptor - gateway instructions produced by a preview.
//!
//! The engine never interprets a descriptor beyond carrying it from the
//! preview to the commit call of the same adapter.

use serde::{Deserialize, Serialize};

use super::ChangeAction;

/// A single proposed subscription-item mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ItemOperation {
    /// Add a new item for `price_id`.
    Add { price_id: String, quantity: u32 },

    /// Change the quantity (and optionally the price) of an existing item.
    Update {
        item_id: String,
        price_id: String,
        quantity: u32,
    },

    /// Remove an existing item.
    Remove { item_id: String },
}

/// How the gateway should bill partial periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProrationBehavior {
    /// Create proration line items on the next invoice (default).
    #[default]
    CreateProrations,

    /// Don't create prorations.
    None,

    /// Create prorations and invoice them immediately.
    AlwaysInvoice,
}

impl ProrationBehavior {
    /// Convert to the gateway API string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateProrations => "create_prorations",
            Self::None => "none",
            Self::AlwaysInvoice => "always_invoice",
        }
    }
}

/// Instructions a commit replays against the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDescriptor {
    /// Subscription to mutate; `None` creates a new subscription.
    pub subscription_id: Option<String>,

    /// Customer a new subscription is created for.
    pub customer: Option<String>,

    pub items: Vec<ItemOperation>,

    pub proration_behavior: ProrationBehavior,

    /// Snapshot of "now" at preview time (Unix seconds).
    pub proration_date: i64,

    /// Trial end to set (Unix seconds). A value at or before
    /// `proration_date` ends the trial immediately.
    pub trial_end: Option<i64>,

    /// Variant this descriptor realizes.
    pub action: Option<ChangeAction>,
}

impl CommitDescriptor {
    /// Whether this descriptor creates a subscription rather than mutating one.
    pub fn creates_subscription(&self) -> bool {
        self.subscription_id.is_none()
    }

    /// Whether applying this descriptor ends a running trial immediately.
    pub fn ends_trial_now(&self) -> bool {
        matches!(self.trial_end, Some(end) if end <= self.proration_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> CommitDescriptor {
        CommitDescriptor {
            subscription_id: Some("sub_1".to_string()),
            customer: None,
            items: vec![ItemOperation::Update {
                item_id: "si_1".to_string(),
                price_id: "price_seat".to_string(),
                quantity: 5,
            }],
            proration_behavior: ProrationBehavior::AlwaysInvoice,
            proration_date: 1_700_000_000,
            trial_end: None,
            action: None,
        }
    }

    #[test]
    fn item_operations_serialize_with_op_tag() {
        let json = serde_json::to_value(ItemOperation::Remove {
            item_id: "si_old".to_string(),
        })
        .unwrap();
        assert_eq!(json["op"], "remove");
        assert_eq!(json["item_id"], "si_old");
    }

    #[test]
    fn proration_behavior_strings() {
        assert_eq!(ProrationBehavior::default().as_str(), "create_prorations");
        assert_eq!(ProrationBehavior::None.as_str(), "none");
        assert_eq!(ProrationBehavior::AlwaysInvoice.as_str(), "always_invoice");
    }

    #[test]
    fn creates_subscription_when_no_subscription_id() {
        let mut d = descriptor();
        assert!(!d.creates_subscription());
        d.subscription_id = None;
        assert!(d.creates_subscription());
    }

    #[test]
    fn ends_trial_now_only_for_past_trial_end() {
        let mut d = descriptor();
        assert!(!d.ends_trial_now());
        d.trial_end = Some(d.proration_date);
        assert!(d.ends_trial_now());
        d.trial_end = Some(d.proration_date + 86_400);
        assert!(!d.ends_trial_now());
    }
}
