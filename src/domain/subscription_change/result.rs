//! Commit outcomes.

use serde::{Deserialize, Serialize};

use super::{ChangeAction, Signal};
use crate::domain::checkout::CheckoutSession;

/// What the gateway reports after applying a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPayload {
    pub subscription_id: String,

    /// Amount charged (or scheduled) by the mutation, in minor units.
    pub applied_amount: i64,

    pub currency: String,

    /// When the change takes effect (Unix seconds).
    pub effective_at: i64,

    /// Gateway subscription status after the mutation.
    pub status: Option<String>,

    /// Variant the gateway actually applied.
    pub applied_action: Option<ChangeAction>,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeResult {
    pub success: bool,
    pub message: String,
    pub signal: Signal,
    pub result: CommitPayload,

    /// The checkout whose metadata was updated.
    pub checkout_session: CheckoutSession,
}
