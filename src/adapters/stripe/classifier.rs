//! Classifies a checkout against a live Stripe subscription.
//!
//! Rules, in order:
//!
//! - Same set of prices: a quantity increase is `Expansion`, a decrease is
//!   `Contraction`. No difference at all is only committable as a trial
//!   conversion (`Convert`, when the customer asked to skip the trial).
//! - Different prices on a trialing subscription: `Switch`.
//! - Different prices otherwise: compared by recurring total. Higher is
//!   `Upgrade`, lower is `Downgrade`, equal is `Switch`.

use std::collections::{BTreeSet, VecDeque};

use super::api_types::{StripeSubscription, StripeSubscriptionItem};
use crate::domain::checkout::CheckoutLineItem;
use crate::domain::subscription_change::{ChangeAction, ItemOperation, Signal};

/// Reason returned when the checkout asks for exactly what is already subscribed.
pub const ALREADY_MATCHES_REASON: &str = "Subscription already matches this checkout";

/// Outcome of comparing a subscription with a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePlan {
    pub signal: Signal,
    pub operations: Vec<ItemOperation>,

    /// Recurring amount per period before the change, in minor units.
    pub current_amount: i64,

    /// Recurring amount per period after the change, in minor units.
    pub desired_amount: i64,
}

/// Classifies the change from `subscription` to `desired`.
///
/// Returns the reason the change cannot be previewed when there is nothing
/// to commit.
pub fn classify(
    subscription: &StripeSubscription,
    desired: &[CheckoutLineItem],
    requested: Option<ChangeAction>,
) -> Result<ChangePlan, String> {
    if desired.is_empty() {
        return Err("Checkout has no line items".to_string());
    }

    let current = &subscription.items.data;
    let operations = diff_items(current, desired);

    let current_amount: i64 = current
        .iter()
        .map(|item| item.price.unit_amount.unwrap_or(0) * i64::from(quantity_of(item)))
        .sum();
    let desired_amount: i64 = desired.iter().map(CheckoutLineItem::amount).sum();

    let current_prices: BTreeSet<&str> = current.iter().map(|i| i.price.id.as_str()).collect();
    let desired_prices: BTreeSet<&str> = desired.iter().map(|i| i.price_id.as_str()).collect();

    let signal = if current_prices == desired_prices {
        if operations.is_empty() {
            if subscription.is_trialing() && requested == Some(ChangeAction::SkipTrial) {
                Signal::Convert
            } else {
                return Err(ALREADY_MATCHES_REASON.to_string());
            }
        } else {
            let current_qty: i64 = current.iter().map(|i| i64::from(quantity_of(i))).sum();
            let desired_qty: i64 = desired.iter().map(|i| i64::from(i.quantity)).sum();
            match desired_qty.cmp(&current_qty) {
                std::cmp::Ordering::Greater => Signal::Expansion,
                std::cmp::Ordering::Less => Signal::Contraction,
                std::cmp::Ordering::Equal if desired_amount >= current_amount => Signal::Expansion,
                std::cmp::Ordering::Equal => Signal::Contraction,
            }
        }
    } else if subscription.is_trialing() {
        Signal::Switch
    } else {
        match desired_amount.cmp(&current_amount) {
            std::cmp::Ordering::Greater => Signal::Upgrade,
            std::cmp::Ordering::Less => Signal::Downgrade,
            std::cmp::Ordering::Equal => Signal::Switch,
        }
    };

    Ok(ChangePlan {
        signal,
        operations,
        current_amount,
        desired_amount,
    })
}

fn quantity_of(item: &StripeSubscriptionItem) -> u32 {
    item.quantity.unwrap_or(1)
}

/// Item mutations turning `current` into `desired`.
///
/// Items whose price disappears are reused for new prices before anything is
/// added, so a plan change stays a single item update.
fn diff_items(current: &[StripeSubscriptionItem], desired: &[CheckoutLineItem]) -> Vec<ItemOperation> {
    let mut spare: VecDeque<&StripeSubscriptionItem> = current
        .iter()
        .filter(|item| !desired.iter().any(|d| d.price_id == item.price.id))
        .collect();

    let mut operations = Vec::new();
    for wanted in desired {
        match current.iter().find(|item| item.price.id == wanted.price_id) {
            Some(existing) => {
                if quantity_of(existing) != wanted.quantity {
                    operations.push(ItemOperation::Update {
                        item_id: existing.id.clone(),
                        price_id: wanted.price_id.clone(),
                        quantity: wanted.quantity,
                    });
                }
            }
            None => match spare.pop_front() {
                Some(replaced) => operations.push(ItemOperation::Update {
                    item_id: replaced.id.clone(),
                    price_id: wanted.price_id.clone(),
                    quantity: wanted.quantity,
                }),
                None => operations.push(ItemOperation::Add {
                    price_id: wanted.price_id.clone(),
                    quantity: wanted.quantity,
                }),
            },
        }
    }

    operations.extend(spare.into_iter().map(|item| ItemOperation::Remove {
        item_id: item.id.clone(),
    }));

    operations
}
