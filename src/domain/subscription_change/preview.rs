//! Change preview - a read-only projection of what a commit would do.
//!
//! Timing fields and the descriptor's `proration_date` are snapshots taken
//! when the preview was built. A preview is therefore valid for a single
//! decision point and is never carried into a commit; the committer always
//! rebuilds one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ChangeAction, CommitDescriptor, EffectiveTiming, ItemOperation, Signal, TimingStrategy};

/// Amounts due if the preview were committed now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTotals {
    /// Amount charged immediately, in minor units.
    pub due_now: i64,
    pub currency: String,
}

/// One line of the projected invoice or change summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewLine {
    pub description: String,
    pub price_id: Option<String>,
    pub quantity: Option<u32>,
    /// Signed amount in minor units (credits are negative).
    pub amount: i64,
    pub proration: bool,
}

/// Figures for one action variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewAction {
    pub due_now: i64,
    /// When the variant takes effect (Unix seconds).
    pub effective_at: i64,
    pub strategy: TimingStrategy,
    pub trial_end: Option<i64>,
}

/// Read-only projection of a subscription change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePreview {
    pub enabled: bool,

    /// Present only when enabled.
    pub signal: Option<Signal>,

    pub totals: PreviewTotals,

    pub lines: Vec<PreviewLine>,

    pub operations: Vec<ItemOperation>,

    /// Opaque instructions for the adapter's commit step.
    pub commit_descriptor: Option<CommitDescriptor>,

    pub actions: BTreeMap<ChangeAction, PreviewAction>,

    /// Variant the descriptor was built for.
    pub selected_action: Option<ChangeAction>,

    /// When the descriptor's change takes effect.
    pub timing: Option<EffectiveTiming>,

    /// Present only when disabled.
    pub reason: Option<String>,
}

impl ChangePreview {
    /// A preview that cannot be committed, with a renderable reason.
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            enabled: false,
            signal: None,
            totals: PreviewTotals {
                due_now: 0,
                currency: String::new(),
            },
            lines: Vec::new(),
            operations: Vec::new(),
            commit_descriptor: None,
            actions: BTreeMap::new(),
            selected_action: None,
            timing: None,
            reason: Some(reason.into()),
        }
    }

    /// An enabled preview for `signal`; fill in the rest with the `with_*` builders.
    pub fn enabled(signal: Signal, totals: PreviewTotals, descriptor: CommitDescriptor) -> Self {
        Self {
            enabled: true,
            signal: Some(signal),
            selected_action: descriptor.action,
            operations: descriptor.items.clone(),
            commit_descriptor: Some(descriptor),
            totals,
            lines: Vec::new(),
            actions: BTreeMap::new(),
            timing: None,
            reason: None,
        }
    }

    pub fn with_timing(mut self, timing: EffectiveTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn with_lines(mut self, lines: Vec<PreviewLine>) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_action(mut self, action: ChangeAction, figures: PreviewAction) -> Self {
        self.actions.insert(action, figures);
        self
    }

    /// Reason text for a disabled preview, empty when enabled.
    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or_default()
    }

    /// Extracts what a commit needs, or the reason the preview cannot be committed.
    pub fn commit_plan(&self) -> Result<(Signal, &CommitDescriptor), String> {
        if !self.enabled {
            return Err(self.reason_text().to_string());
        }
        let signal = self
            .signal
            .ok_or_else(|| "Preview did not classify the change".to_string())?;
        let descriptor = self
            .commit_descriptor
            .as_ref()
            .ok_or_else(|| "Preview has no commit instructions".to_string())?;
        Ok((signal, descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription_change::ProrationBehavior;

    fn descriptor(action: Option<ChangeAction>) -> CommitDescriptor {
        CommitDescriptor {
            subscription_id: Some("sub_1".to_string()),
            customer: None,
            items: vec![ItemOperation::Add {
                price_id: "price_pro".to_string(),
                quantity: 1,
            }],
            proration_behavior: ProrationBehavior::CreateProrations,
            proration_date: 1_700_000_000,
            trial_end: None,
            action,
        }
    }

    fn totals(due_now: i64) -> PreviewTotals {
        PreviewTotals {
            due_now,
            currency: "usd".to_string(),
        }
    }

    #[test]
    fn disabled_preview_has_reason_and_no_signal() {
        let preview = ChangePreview::disabled("No subscription found");
        assert!(!preview.enabled);
        assert!(preview.signal.is_none());
        assert_eq!(preview.reason_text(), "No subscription found");
        assert_eq!(preview.commit_plan().unwrap_err(), "No subscription found");
    }

    #[test]
    fn enabled_preview_mirrors_descriptor() {
        let preview = ChangePreview::enabled(
            Signal::Upgrade,
            totals(500),
            descriptor(Some(ChangeAction::ExpandNow)),
        );
        assert!(preview.enabled);
        assert!(preview.reason.is_none());
        assert_eq!(preview.selected_action, Some(ChangeAction::ExpandNow));
        assert_eq!(preview.operations.len(), 1);

        let (signal, d) = preview.commit_plan().unwrap();
        assert_eq!(signal, Signal::Upgrade);
        assert_eq!(d.subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn enabled_preview_without_descriptor_cannot_commit() {
        let mut preview = ChangePreview::enabled(Signal::Upgrade, totals(0), descriptor(None));
        preview.commit_descriptor = None;
        assert_eq!(
            preview.commit_plan().unwrap_err(),
            "Preview has no commit instructions"
        );
    }

    #[test]
    fn actions_serialize_keyed_by_variant_name() {
        let preview = ChangePreview::enabled(Signal::Acquisition, totals(0), descriptor(None))
            .with_action(
                ChangeAction::StartTrial,
                PreviewAction {
                    due_now: 0,
                    effective_at: 1_700_000_000,
                    strategy: TimingStrategy::AtTrialEnd,
                    trial_end: Some(1_700_000_000),
                },
            );

        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["actions"]["start_trial"]["due_now"], 0);
        assert_eq!(json["actions"]["start_trial"]["strategy"], "at_trial_end");
        assert_eq!(json["signal"], "acquisition");
    }
}
