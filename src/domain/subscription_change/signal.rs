//! Signal taxonomy.
//!
//! Every preview is classified into exactly one of seven signals. The
//! signal is recorded verbatim into checkout metadata on commit and drives
//! the user-facing success message.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ChangeAction;
use crate::domain::foundation::ValidationError;

/// Business meaning of a subscription change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// A brand new subscription.
    Acquisition,

    /// A trialing subscription converts to paid.
    Convert,

    /// A trialing subscription moves to a different plan.
    Switch,

    /// Price replaced by a more expensive one.
    Upgrade,

    /// Price replaced by a cheaper one.
    Downgrade,

    /// Same price, higher quantity.
    Expansion,

    /// Same price, lower quantity.
    Contraction,
}

impl Signal {
    pub const ALL: [Signal; 7] = [
        Signal::Acquisition,
        Signal::Convert,
        Signal::Switch,
        Signal::Upgrade,
        Signal::Downgrade,
        Signal::Expansion,
        Signal::Contraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Acquisition => "acquisition",
            Signal::Convert => "convert",
            Signal::Switch => "switch",
            Signal::Upgrade => "upgrade",
            Signal::Downgrade => "downgrade",
            Signal::Expansion => "expansion",
            Signal::Contraction => "contraction",
        }
    }

    /// Canonical success message for this signal.
    pub fn message(&self, action: Option<ChangeAction>) -> &'static str {
        message_for(*self, action)
    }
}

/// Resolves the canonical user-facing message for a committed change.
///
/// Total over `Signal`: adding a variant without a message is a compile error.
pub fn message_for(signal: Signal, action: Option<ChangeAction>) -> &'static str {
    match signal {
        Signal::Acquisition => "New subscription created successfully",
        Signal::Convert => "Trial conversion completed successfully",
        Signal::Switch => "Plan switch completed successfully",
        Signal::Upgrade => "Subscription upgrade completed successfully",
        Signal::Downgrade => "Subscription downgrade completed successfully",
        Signal::Expansion => match action {
            Some(ChangeAction::ExpandAtTrialEnd) => "Trial expansion completed successfully",
            Some(ChangeAction::StartTrial)
            | Some(ChangeAction::SkipTrial)
            | Some(ChangeAction::ExpandNow)
            | None => "Subscription expansion completed successfully",
        },
        Signal::Contraction => "Subscription contraction completed successfully",
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Signal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signal::ALL
            .into_iter()
            .find(|signal| signal.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("signal", format!("unknown signal '{}'", s)))
    }
}
