//! Preview action variants.

use serde::{Deserialize, Serialize};

/// A named alternative way of realizing a change.
///
/// A preview may offer several; the descriptor is built for exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// New subscription begins with a free trial.
    StartTrial,

    /// New subscription is charged immediately, no trial.
    SkipTrial,

    /// Quantity increase on a trialing subscription, billed now.
    ExpandNow,

    /// Quantity increase on a trialing subscription, billed when the trial ends.
    ExpandAtTrialEnd,
}

impl ChangeAction {
    pub const ALL: [ChangeAction; 4] = [
        ChangeAction::StartTrial,
        ChangeAction::SkipTrial,
        ChangeAction::ExpandNow,
        ChangeAction::ExpandAtTrialEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::StartTrial => "start_trial",
            ChangeAction::SkipTrial => "skip_trial",
            ChangeAction::ExpandNow => "expand_now",
            ChangeAction::ExpandAtTrialEnd => "expand_at_trial_end",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
