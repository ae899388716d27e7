//! Mock gateway adapter for testing.
//!
//! Provides a configurable implementation of both change capabilities for
//! unit and integration tests. Supports:
//! - Pre-configured previews and commit payloads
//! - Error injection per method
//! - Capability toggles
//! - Call tracking and commit concurrency tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::checkout::{CheckoutIntent, CheckoutSession};
use crate::domain::foundation::Timestamp;
use crate::domain::subscription_change::{
    ChangeAction, ChangePreview, CommitDescriptor, CommitPayload, EffectiveTiming, ItemOperation,
    PreviewAction, PreviewTotals, ProrationBehavior, Signal, TimingStrategy,
};
use crate::ports::{
    CommitRequest, GatewayAdapter, GatewayError, SupportsChangePreview,
    SupportsSubscriptionChanges,
};

/// Mock gateway adapter for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockGatewayAdapter::new();
///
/// // Configure responses
/// mock.set_preview(MockGatewayAdapter::upgrade_preview("sub_1", 500));
///
/// // Inject errors
/// mock.set_method_error("commit_change", GatewayError::provider("boom"));
/// ```
#[derive(Default)]
pub struct MockGatewayAdapter {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    preview_disabled: bool,
    commits_disabled: bool,

    /// Preview returned by every `preview_change` call.
    preview: Option<ChangePreview>,

    /// Payload returned by every `commit_change` call.
    commit_payload: Option<CommitPayload>,

    /// Specific errors by method name.
    method_errors: HashMap<String, GatewayError>,

    preview_delay: Option<Duration>,
    commit_delay: Option<Duration>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    descriptors: Vec<CommitDescriptor>,
    idempotency_keys: Vec<String>,

    commits_in_flight: usize,
    max_commits_in_flight: usize,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockGatewayAdapter {
    /// Create a new mock adapter supporting both capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`disable_change_preview`](Self::disable_change_preview).
    pub fn without_change_preview(self) -> Self {
        self.disable_change_preview();
        self
    }

    /// Builder form of [`disable_subscription_changes`](Self::disable_subscription_changes).
    pub fn without_subscription_changes(self) -> Self {
        self.disable_subscription_changes();
        self
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn disable_change_preview(&self) {
        self.inner.lock().unwrap().preview_disabled = true;
    }

    pub fn disable_subscription_changes(&self) {
        self.inner.lock().unwrap().commits_disabled = true;
    }

    /// Set the preview returned for existing subscriptions.
    pub fn set_preview(&self, preview: ChangePreview) {
        self.inner.lock().unwrap().preview = Some(preview);
    }

    /// Set the payload returned by commits. Derived from the request when unset.
    pub fn set_commit_payload(&self, payload: CommitPayload) {
        self.inner.lock().unwrap().commit_payload = Some(payload);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.inner
            .lock()
            .unwrap()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        self.inner.lock().unwrap().method_errors.clear();
    }

    pub fn set_preview_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().preview_delay = Some(delay);
    }

    pub fn set_commit_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().commit_delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Preview Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    /// An enabled `Upgrade` preview charging `due_now` immediately.
    pub fn upgrade_preview(subscription_id: &str, due_now: i64) -> ChangePreview {
        let now = Timestamp::now();
        let descriptor = CommitDescriptor {
            subscription_id: Some(subscription_id.to_string()),
            customer: None,
            items: vec![ItemOperation::Update {
                item_id: "si_mock".to_string(),
                price_id: "price_upgrade".to_string(),
                quantity: 1,
            }],
            proration_behavior: ProrationBehavior::AlwaysInvoice,
            proration_date: now.as_unix_secs(),
            trial_end: None,
            action: None,
        };

        ChangePreview::enabled(
            Signal::Upgrade,
            PreviewTotals {
                due_now,
                currency: "usd".to_string(),
            },
            descriptor,
        )
        .with_timing(EffectiveTiming {
            timestamp: now,
            strategy: TimingStrategy::AtDate,
        })
    }

    /// An enabled `Expansion` preview on a trialing subscription offering
    /// both `expand_now` and `expand_at_trial_end`, built for `selected`.
    pub fn trial_expansion_preview(subscription_id: &str, selected: ChangeAction) -> ChangePreview {
        let now = Timestamp::now();
        let trial_end = now.add_days(7);

        let expand_now = PreviewAction {
            due_now: 2_000,
            effective_at: now.as_unix_secs(),
            strategy: TimingStrategy::AtDate,
            trial_end: Some(now.as_unix_secs()),
        };
        let expand_at_trial_end = PreviewAction {
            due_now: 0,
            effective_at: trial_end.as_unix_secs(),
            strategy: TimingStrategy::AtTrialEnd,
            trial_end: Some(trial_end.as_unix_secs()),
        };

        let (due_now, timing, descriptor_trial_end) = match selected {
            ChangeAction::ExpandNow => (
                expand_now.due_now,
                EffectiveTiming {
                    timestamp: now,
                    strategy: TimingStrategy::AtDate,
                },
                Some(now.as_unix_secs()),
            ),
            _ => (
                0,
                EffectiveTiming {
                    timestamp: trial_end,
                    strategy: TimingStrategy::AtTrialEnd,
                },
                Some(trial_end.as_unix_secs()),
            ),
        };

        let descriptor = CommitDescriptor {
            subscription_id: Some(subscription_id.to_string()),
            customer: None,
            items: vec![ItemOperation::Update {
                item_id: "si_mock".to_string(),
                price_id: "price_seat".to_string(),
                quantity: 2,
            }],
            proration_behavior: ProrationBehavior::None,
            proration_date: now.as_unix_secs(),
            trial_end: descriptor_trial_end,
            action: Some(selected),
        };

        ChangePreview::enabled(
            Signal::Expansion,
            PreviewTotals {
                due_now,
                currency: "usd".to_string(),
            },
            descriptor,
        )
        .with_timing(timing)
        .with_action(ChangeAction::ExpandNow, expand_now)
        .with_action(ChangeAction::ExpandAtTrialEnd, expand_at_trial_end)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Descriptor of the most recent commit.
    pub fn last_descriptor(&self) -> Option<CommitDescriptor> {
        self.inner.lock().unwrap().descriptors.last().cloned()
    }

    /// Idempotency keys of all commits, in call order.
    pub fn idempotency_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().idempotency_keys.clone()
    }

    /// Highest number of commits observed in flight at once.
    pub fn max_concurrent_commits(&self) -> usize {
        self.inner.lock().unwrap().max_commits_in_flight
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.inner.lock().unwrap().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), GatewayError> {
        match self.inner.lock().unwrap().method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Clone for MockGatewayAdapter {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl GatewayAdapter for MockGatewayAdapter {
    fn provider(&self) -> &str {
        "mock"
    }

    fn change_preview(&self) -> Option<&dyn SupportsChangePreview> {
        if self.inner.lock().unwrap().preview_disabled {
            None
        } else {
            Some(self)
        }
    }

    fn subscription_changes(&self) -> Option<&dyn SupportsSubscriptionChanges> {
        if self.inner.lock().unwrap().commits_disabled {
            None
        } else {
            Some(self)
        }
    }
}

#[async_trait]
impl SupportsChangePreview for MockGatewayAdapter {
    async fn preview_change(
        &self,
        session: &CheckoutSession,
        intent: CheckoutIntent,
    ) -> Result<ChangePreview, GatewayError> {
        self.record_call(
            "preview_change",
            vec![session.id.to_string(), intent.as_str().to_string()],
        );

        let delay = self.inner.lock().unwrap().preview_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_error("preview_change")?;

        let preview = self.inner.lock().unwrap().preview.clone();
        Ok(preview.unwrap_or_else(|| ChangePreview::disabled("No preview configured")))
    }
}

#[async_trait]
impl SupportsSubscriptionChanges for MockGatewayAdapter {
    async fn commit_change(&self, request: CommitRequest<'_>) -> Result<CommitPayload, GatewayError> {
        self.record_call(
            "commit_change",
            vec![
                request.session.id.to_string(),
                request.idempotency_key.to_string(),
            ],
        );

        let delay = {
            let mut state = self.inner.lock().unwrap();
            state.descriptors.push(request.descriptor.clone());
            state.idempotency_keys.push(request.idempotency_key.to_string());
            state.commits_in_flight += 1;
            state.max_commits_in_flight = state.max_commits_in_flight.max(state.commits_in_flight);
            state.commit_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.inner.lock().unwrap().commits_in_flight -= 1;

        self.check_error("commit_change")?;

        if let Some(payload) = self.inner.lock().unwrap().commit_payload.clone() {
            return Ok(payload);
        }

        let descriptor = request.descriptor;
        let preview = request.preview;
        let subscription_id = descriptor.subscription_id.clone().unwrap_or_else(|| {
            format!("sub_mock_{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
        });
        let status = match descriptor.trial_end {
            Some(_) if !descriptor.ends_trial_now() => "trialing",
            _ => "active",
        };

        Ok(CommitPayload {
            subscription_id,
            applied_amount: descriptor
                .action
                .and_then(|action| preview.actions.get(&action))
                .map(|figures| figures.due_now)
                .unwrap_or(preview.totals.due_now),
            currency: request.session.currency.clone(),
            effective_at: preview
                .timing
                .map(|timing| timing.unix_secs())
                .unwrap_or(descriptor.proration_date),
            status: Some(status.to_string()),
            applied_action: descriptor.action,
        })
    }
}
