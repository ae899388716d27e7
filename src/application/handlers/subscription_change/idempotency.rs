//! Idempotency keys for subscription mutations.

use serde_json::json;
use sha2::{Digest, Sha256};

use crate::domain::foundation::CheckoutSessionId;
use crate::domain::subscription_change::CommitDescriptor;

/// Derives the gateway idempotency key for committing `descriptor` on a session.
///
/// Every descriptor field is hashed, so a key never stands for two different
/// request bodies. A rebuilt preview with a new `proration_date` or
/// `trial_end` gets a new key.
pub fn idempotency_key(session_id: &CheckoutSessionId, descriptor: &CommitDescriptor) -> String {
    // serde_json's default map is ordered, so this rendering is canonical.
    let canonical = json!({
        "subscription_id": descriptor.subscription_id,
        "customer": descriptor.customer,
        "items": descriptor.items,
        "proration_behavior": descriptor.proration_behavior,
        "proration_date": descriptor.proration_date,
        "trial_end": descriptor.trial_end,
        "action": descriptor.action,
    });

    let mut hasher = Sha256::new();
    hasher.update(session_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(canonical.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription_change::{ChangeAction, ItemOperation, ProrationBehavior};

    fn descriptor(quantity: u32, proration_date: i64) -> CommitDescriptor {
        CommitDescriptor {
            subscription_id: Some("sub_1".to_string()),
            customer: Some("cus_1".to_string()),
            items: vec![ItemOperation::Update {
                item_id: "si_1".to_string(),
                price_id: "price_seat".to_string(),
                quantity,
            }],
            proration_behavior: ProrationBehavior::AlwaysInvoice,
            proration_date,
            trial_end: None,
            action: Some(ChangeAction::ExpandNow),
        }
    }

    #[test]
    fn key_is_hex_sha256() {
        let key = idempotency_key(&CheckoutSessionId::new(), &descriptor(2, 1_700_000_000));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identical_request_gets_identical_key() {
        let session = CheckoutSessionId::new();
        assert_eq!(
            idempotency_key(&session, &descriptor(2, 1_700_000_000)),
            idempotency_key(&session, &descriptor(2, 1_700_000_000))
        );
    }

    #[test]
    fn new_proration_date_gets_new_key() {
        let session = CheckoutSessionId::new();
        assert_ne!(
            idempotency_key(&session, &descriptor(2, 1_700_000_000)),
            idempotency_key(&session, &descriptor(2, 1_700_000_001))
        );
    }

    #[test]
    fn new_trial_end_gets_new_key() {
        let session = CheckoutSessionId::new();
        let keep_trial = descriptor(2, 1_700_000_000);
        let end_trial = CommitDescriptor {
            trial_end: Some(1_700_000_000),
            ..keep_trial.clone()
        };
        assert_ne!(
            idempotency_key(&session, &keep_trial),
            idempotency_key(&session, &end_trial)
        );
    }

    #[test]
    fn key_differs_between_sessions() {
        let d = descriptor(2, 1_700_000_000);
        assert_ne!(
            idempotency_key(&CheckoutSessionId::new(), &d),
            idempotency_key(&CheckoutSessionId::new(), &d)
        );
    }

    #[test]
    fn key_differs_between_changes() {
        let session = CheckoutSessionId::new();
        assert_ne!(
            idempotency_key(&session, &descriptor(2, 1_700_000_000)),
            idempotency_key(&session, &descriptor(3, 1_700_000_000))
        );
    }
}
