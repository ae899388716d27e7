//! ChangePreviewBuilder - Read-only projection of a checkout's subscription change.
//!
//! Two paths:
//!
//! - No existing subscription: classified locally as `Acquisition` with a
//!   trial-first preview. The gateway is never asked to prorate.
//! - Existing subscription: delegated to the adapter's
//!   `SupportsChangePreview` capability.
//!
//! Never fails. Anything that goes wrong becomes a disabled preview with a
//! reason the checkout UI can render.

use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::domain::checkout::CheckoutSession;
use crate::domain::foundation::Timestamp;
use crate::domain::subscription_change::{
    ChangeAction, ChangePreview, CommitDescriptor, EffectiveTiming, ItemOperation, PreviewAction,
    PreviewLine, PreviewTotals, ProrationBehavior, Signal, TimingStrategy,
};
use crate::ports::{GatewayAdapter, GatewayError, IntegrationResolver};

/// Reason given when the organization's integration cannot preview changes.
pub const UNSUPPORTED_PREVIEW_REASON: &str = "Integration does not support change previews";

/// Builds change previews for checkout sessions.
#[derive(Clone)]
pub struct ChangePreviewBuilder {
    resolver: Arc<dyn IntegrationResolver>,
    gateway_timeout: Duration,
    default_trial_days: u32,
}

impl ChangePreviewBuilder {
    pub fn new(resolver: Arc<dyn IntegrationResolver>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            resolver,
            gateway_timeout: defaults.gateway_timeout(),
            default_trial_days: defaults.default_trial_days,
        }
    }

    pub fn from_config(resolver: Arc<dyn IntegrationResolver>, config: &EngineConfig) -> Self {
        Self {
            resolver,
            gateway_timeout: config.gateway_timeout(),
            default_trial_days: config.default_trial_days,
        }
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn with_default_trial_days(mut self, days: u32) -> Self {
        self.default_trial_days = days;
        self
    }

    pub(crate) fn resolver(&self) -> &Arc<dyn IntegrationResolver> {
        &self.resolver
    }

    /// Builds a preview for `session`. Performs only read-only gateway calls.
    pub async fn preview(&self, session: &CheckoutSession) -> ChangePreview {
        let adapter = match self.resolve_adapter(session).await {
            Ok(adapter) => adapter,
            Err(preview) => return preview,
        };

        let Some(capability) = adapter.change_preview() else {
            tracing::debug!(
                checkout_session_id = %session.id,
                organization_id = %session.organization_id,
                provider = adapter.provider(),
                "Integration lacks change preview capability"
            );
            return ChangePreview::disabled(UNSUPPORTED_PREVIEW_REASON);
        };

        let Some(subscription_id) = session.subscription.as_deref() else {
            return self.acquisition_preview(session, Timestamp::now());
        };

        let outcome =
            tokio::time::timeout(self.gateway_timeout, capability.preview_change(session, session.intent))
                .await;

        match outcome {
            Ok(Ok(preview)) => preview,
            Ok(Err(err)) => {
                tracing::warn!(
                    checkout_session_id = %session.id,
                    organization_id = %session.organization_id,
                    subscription_id,
                    provider = adapter.provider(),
                    error_code = %err.code,
                    error = %err.message,
                    "Gateway change preview failed"
                );
                ChangePreview::disabled(err.message)
            }
            Err(_) => {
                tracing::warn!(
                    checkout_session_id = %session.id,
                    organization_id = %session.organization_id,
                    subscription_id,
                    provider = adapter.provider(),
                    timeout_ms = self.gateway_timeout.as_millis() as u64,
                    "Gateway change preview timed out"
                );
                ChangePreview::disabled(GatewayError::timeout(self.gateway_timeout).message)
            }
        }
    }

    async fn resolve_adapter(
        &self,
        session: &CheckoutSession,
    ) -> Result<Arc<dyn GatewayAdapter>, ChangePreview> {
        match self.resolver.resolve(&session.organization_id).await {
            Ok(Some(adapter)) => Ok(adapter),
            Ok(None) => Err(ChangePreview::disabled(UNSUPPORTED_PREVIEW_REASON)),
            Err(err) => {
                tracing::warn!(
                    checkout_session_id = %session.id,
                    organization_id = %session.organization_id,
                    error = %err,
                    "Failed to resolve billing integration"
                );
                Err(ChangePreview::disabled(err.message))
            }
        }
    }

    /// Trial-first preview for a checkout with no subscription yet.
    fn acquisition_preview(&self, session: &CheckoutSession, now: Timestamp) -> ChangePreview {
        if session.line_items.is_empty() {
            return ChangePreview::disabled("Checkout has no line items");
        }

        let trial_days = session.trial_period_days.unwrap_or(self.default_trial_days);
        let trial_end_at = now.add_days(i64::from(trial_days));
        let trial_end = trial_end_at.as_unix_secs();
        let first_charge = session.total_amount();

        let start_trial = PreviewAction {
            due_now: 0,
            effective_at: trial_end,
            strategy: TimingStrategy::AtTrialEnd,
            trial_end: Some(trial_end),
        };
        let skip_trial = PreviewAction {
            due_now: first_charge,
            effective_at: now.as_unix_secs(),
            strategy: TimingStrategy::AtDate,
            trial_end: None,
        };

        let (selected, timing) = match session.requested_action {
            Some(ChangeAction::SkipTrial) => (
                ChangeAction::SkipTrial,
                EffectiveTiming {
                    timestamp: now,
                    strategy: TimingStrategy::AtDate,
                },
            ),
            _ => (
                ChangeAction::StartTrial,
                EffectiveTiming {
                    timestamp: trial_end_at,
                    strategy: TimingStrategy::AtTrialEnd,
                },
            ),
        };

        let descriptor = CommitDescriptor {
            subscription_id: None,
            customer: session.customer.clone(),
            items: session
                .line_items
                .iter()
                .map(|item| ItemOperation::Add {
                    price_id: item.price_id.clone(),
                    quantity: item.quantity,
                })
                .collect(),
            proration_behavior: ProrationBehavior::None,
            proration_date: now.as_unix_secs(),
            trial_end: match selected {
                ChangeAction::StartTrial => Some(trial_end),
                _ => None,
            },
            action: Some(selected),
        };

        let lines = session
            .line_items
            .iter()
            .map(|item| PreviewLine {
                description: format!("{} × {}", item.quantity, item.price_id),
                price_id: Some(item.price_id.clone()),
                quantity: Some(item.quantity),
                amount: item.amount(),
                proration: false,
            })
            .collect();

        ChangePreview::enabled(
            Signal::Acquisition,
            PreviewTotals {
                due_now: 0,
                currency: session.currency.clone(),
            },
            descriptor,
        )
        .with_lines(lines)
        .with_timing(timing)
        .with_action(ChangeAction::StartTrial, start_trial)
        .with_action(ChangeAction::SkipTrial, skip_trial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::StaticIntegrationResolver;
    use crate::adapters::stripe::MockGatewayAdapter;
    use crate::domain::checkout::{CheckoutIntent, CheckoutLineItem};
    use crate::domain::foundation::{
        CheckoutSessionId, DomainError, ErrorCode, OfferId, OrganizationId,
    };
    use async_trait::async_trait;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Helpers
    // ════════════════════════════════════════════════════════════════════════════

    struct FailingResolver;

    #[async_trait]
    impl IntegrationResolver for FailingResolver {
        async fn resolve(
            &self,
            _organization_id: &OrganizationId,
        ) -> Result<Option<Arc<dyn GatewayAdapter>>, DomainError> {
            Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Integration registry unavailable",
            ))
        }
    }

    fn org() -> OrganizationId {
        OrganizationId::new("org_test").unwrap()
    }

    fn new_checkout() -> CheckoutSession {
        CheckoutSession::new(
            CheckoutSessionId::new(),
            org(),
            OfferId::new("offer_pro").unwrap(),
            CheckoutIntent::Upgrade,
            "usd",
        )
        .with_customer("cus_1")
        .with_line_item(CheckoutLineItem::new("price_pro", 2, 1_500))
    }

    fn builder_with(adapter: MockGatewayAdapter) -> ChangePreviewBuilder {
        let resolver = StaticIntegrationResolver::new().with_adapter(org(), Arc::new(adapter));
        ChangePreviewBuilder::new(Arc::new(resolver))
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Capability Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn disabled_when_no_integration_configured() {
        let builder = ChangePreviewBuilder::new(Arc::new(StaticIntegrationResolver::new()));

        let preview = builder.preview(&new_checkout()).await;

        assert!(!preview.enabled);
        assert_eq!(preview.reason_text(), UNSUPPORTED_PREVIEW_REASON);
    }

    #[tokio::test]
    async fn disabled_when_integration_lacks_preview_capability() {
        let adapter = MockGatewayAdapter::new().without_change_preview();
        let builder = builder_with(adapter);

        let preview = builder.preview(&new_checkout()).await;

        assert!(!preview.enabled);
        assert_eq!(preview.reason_text(), UNSUPPORTED_PREVIEW_REASON);
    }

    #[tokio::test]
    async fn disabled_when_resolver_fails() {
        let builder = ChangePreviewBuilder::new(Arc::new(FailingResolver));

        let preview = builder.preview(&new_checkout()).await;

        assert!(!preview.enabled);
        assert_eq!(preview.reason_text(), "Integration registry unavailable");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Acquisition Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn new_subscription_is_trial_first_acquisition() {
        let adapter = MockGatewayAdapter::new();
        let builder = builder_with(adapter.clone());

        let preview = builder.preview(&new_checkout()).await;

        assert!(preview.enabled);
        assert_eq!(preview.signal, Some(Signal::Acquisition));
        assert_eq!(preview.totals.due_now, 0);
        assert_eq!(preview.totals.currency, "usd");
        assert!(preview.actions.contains_key(&ChangeAction::StartTrial));
        assert!(preview.actions.contains_key(&ChangeAction::SkipTrial));
        assert_eq!(preview.actions[&ChangeAction::SkipTrial].due_now, 3_000);
        assert_eq!(preview.actions[&ChangeAction::StartTrial].due_now, 0);
        assert!(!adapter.was_called("preview_change"));
    }

    #[tokio::test]
    async fn new_subscription_uses_offer_trial_length() {
        let builder = builder_with(MockGatewayAdapter::new()).with_default_trial_days(30);
        let session = new_checkout().with_trial_period_days(7);

        let before = Timestamp::now();
        let preview = builder.preview(&session).await;

        let start_trial = &preview.actions[&ChangeAction::StartTrial];
        let expected = before.add_days(7).as_unix_secs();
        assert!((start_trial.effective_at - expected).abs() <= 1);
        assert_eq!(start_trial.strategy, TimingStrategy::AtTrialEnd);
    }

    #[tokio::test]
    async fn new_subscription_descriptor_follows_requested_variant() {
        let builder = builder_with(MockGatewayAdapter::new());

        let trial = builder.preview(&new_checkout()).await;
        let d = trial.commit_descriptor.as_ref().unwrap();
        assert!(d.creates_subscription());
        assert_eq!(d.customer.as_deref(), Some("cus_1"));
        assert_eq!(d.action, Some(ChangeAction::StartTrial));
        assert!(d.trial_end.is_some());

        let skip = builder
            .preview(&new_checkout().with_requested_action(ChangeAction::SkipTrial))
            .await;
        let d = skip.commit_descriptor.as_ref().unwrap();
        assert_eq!(d.action, Some(ChangeAction::SkipTrial));
        assert!(d.trial_end.is_none());
        assert_eq!(skip.totals.due_now, 0);
    }

    #[tokio::test]
    async fn new_subscription_without_line_items_is_disabled() {
        let builder = builder_with(MockGatewayAdapter::new());
        let mut session = new_checkout();
        session.line_items.clear();

        let preview = builder.preview(&session).await;

        assert!(!preview.enabled);
        assert_eq!(preview.reason_text(), "Checkout has no line items");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Delegated Preview Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn existing_subscription_delegates_to_gateway() {
        let adapter = MockGatewayAdapter::new();
        adapter.set_preview(MockGatewayAdapter::upgrade_preview("sub_1", 500));
        let builder = builder_with(adapter.clone());

        let preview = builder.preview(&new_checkout().with_subscription("sub_1")).await;

        assert!(preview.enabled);
        assert_eq!(preview.signal, Some(Signal::Upgrade));
        assert_eq!(preview.totals.due_now, 500);
        assert_eq!(adapter.call_count("preview_change"), 1);
        assert_eq!(adapter.call_count("commit_change"), 0);
    }

    #[tokio::test]
    async fn gateway_error_becomes_disabled_preview() {
        let adapter = MockGatewayAdapter::new();
        adapter.set_method_error("preview_change", GatewayError::authentication("Invalid API key"));
        let builder = builder_with(adapter);

        let preview = builder.preview(&new_checkout().with_subscription("sub_1")).await;

        assert!(!preview.enabled);
        assert_eq!(preview.reason_text(), "Invalid API key");
    }

    #[tokio::test]
    async fn slow_gateway_becomes_disabled_preview() {
        let adapter = MockGatewayAdapter::new();
        adapter.set_preview(MockGatewayAdapter::upgrade_preview("sub_1", 500));
        adapter.set_preview_delay(Duration::from_millis(200));
        let builder = builder_with(adapter).with_gateway_timeout(Duration::from_millis(20));

        let preview = builder.preview(&new_checkout().with_subscription("sub_1")).await;

        assert!(!preview.enabled);
        assert_eq!(preview.reason_text(), "Gateway request timed out after 20ms");
    }
}
