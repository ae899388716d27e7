//! Stripe gateway adapter.
//!
//! Implements both change capabilities against the Stripe REST API.
//!
//! - **Preview**: `GET /v1/subscriptions/{id}`, plus `GET /v1/invoices/upcoming`
//!   when the change is billed immediately. Never mutates.
//! - **Commit**: a single `POST /v1/subscriptions` (new subscription) or
//!   `POST /v1/subscriptions/{id}` carrying an `Idempotency-Key` header.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripeGatewayAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::PaymentConfig;
use crate::domain::checkout::{CheckoutIntent, CheckoutSession};
use crate::domain::foundation::Timestamp;
use crate::domain::subscription_change::{
    parse_explicit_date, resolve_effective_timestamp_at, ChangeAction, ChangePreview,
    CommitDescriptor, CommitPayload, EffectiveTiming, ItemOperation, PreviewAction, PreviewLine,
    PreviewTotals, ProrationBehavior, Signal, TimingStrategy,
};
use crate::ports::{
    CommitRequest, GatewayAdapter, GatewayError, GatewayErrorCode, SupportsChangePreview,
    SupportsSubscriptionChanges,
};

use super::api_types::{StripeErrorEnvelope, StripeInvoice, StripeSubscription};
use super::classifier::{classify, ChangePlan};

/// Default Stripe API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Reason given when the checkout's subscription cannot be found.
pub const NO_SUBSCRIPTION_REASON: &str = "No subscription found";

/// Reason given when the checkout asks for a change at a future date.
pub const SCHEDULED_CHANGE_REASON: &str = "Scheduled changes are not supported";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Create configuration from the loaded payment settings.
    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        let stripe = Self::new(config.stripe_api_key.clone());
        match &config.stripe_api_base_url {
            Some(url) => stripe.with_base_url(url.clone()),
            None => stripe,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

/// Stripe gateway adapter.
pub struct StripeGatewayAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGatewayAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<StripeSubscription>, GatewayError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(error_from_response("get_subscription", response).await);
        }

        parse_json(response).await.map(Some)
    }

    async fn fetch_upcoming_invoice(
        &self,
        subscription: &StripeSubscription,
        operations: &[ItemOperation],
        proration_date: i64,
    ) -> Result<StripeInvoice, GatewayError> {
        let url = format!("{}/v1/invoices/upcoming", self.config.api_base_url);

        let mut params = vec![
            ("subscription".to_string(), subscription.id.clone()),
            (
                "subscription_proration_behavior".to_string(),
                ProrationBehavior::AlwaysInvoice.as_str().to_string(),
            ),
            (
                "subscription_proration_date".to_string(),
                proration_date.to_string(),
            ),
        ];
        params.extend(item_params("subscription_items", operations));

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .query(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response("upcoming_invoice", response).await);
        }

        parse_json(response).await
    }

    async fn post_subscription(
        &self,
        url: String,
        params: Vec<(String, String)>,
        idempotency_key: &str,
    ) -> Result<StripeSubscription, GatewayError> {
        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response("commit_subscription", response).await);
        }

        parse_json(response).await
    }
}

impl GatewayAdapter for StripeGatewayAdapter {
    fn provider(&self) -> &str {
        "stripe"
    }

    fn change_preview(&self) -> Option<&dyn SupportsChangePreview> {
        Some(self)
    }

    fn subscription_changes(&self) -> Option<&dyn SupportsSubscriptionChanges> {
        Some(self)
    }
}

#[async_trait]
impl SupportsChangePreview for StripeGatewayAdapter {
    async fn preview_change(
        &self,
        session: &CheckoutSession,
        intent: CheckoutIntent,
    ) -> Result<ChangePreview, GatewayError> {
        let Some(subscription_id) = session.subscription.as_deref() else {
            return Ok(ChangePreview::disabled(NO_SUBSCRIPTION_REASON));
        };

        let Some(subscription) = self.fetch_subscription(subscription_id).await? else {
            return Ok(ChangePreview::disabled(NO_SUBSCRIPTION_REASON));
        };

        if subscription.is_terminated() {
            return Ok(ChangePreview::disabled("Subscription is no longer active"));
        }

        let now = Timestamp::now();
        if is_scheduled(session, now) {
            return Ok(ChangePreview::disabled(SCHEDULED_CHANGE_REASON));
        }

        let plan = match classify(&subscription, &session.line_items, session.requested_action) {
            Ok(plan) => plan,
            Err(reason) => return Ok(ChangePreview::disabled(reason)),
        };

        tracing::debug!(
            checkout_session_id = %session.id,
            subscription_id,
            intent = intent.as_str(),
            signal = %plan.signal,
            operations = plan.operations.len(),
            "Classified subscription change"
        );

        let invoice = if bills_immediately(&subscription, plan.signal) {
            Some(
                self.fetch_upcoming_invoice(&subscription, &plan.operations, now.as_unix_secs())
                    .await?,
            )
        } else {
            None
        };

        Ok(build_preview(session, &subscription, plan, invoice.as_ref(), now))
    }
}

#[async_trait]
impl SupportsSubscriptionChanges for StripeGatewayAdapter {
    async fn commit_change(&self, request: CommitRequest<'_>) -> Result<CommitPayload, GatewayError> {
        let descriptor = request.descriptor;

        let (url, params) = match &descriptor.subscription_id {
            None => {
                let customer = descriptor.customer.as_deref().ok_or_else(|| {
                    GatewayError::invalid_request("Checkout has no customer to subscribe")
                })?;
                (
                    format!("{}/v1/subscriptions", self.config.api_base_url),
                    create_params(request, customer),
                )
            }
            Some(subscription_id) => (
                format!(
                    "{}/v1/subscriptions/{}",
                    self.config.api_base_url, subscription_id
                ),
                update_params(request),
            ),
        };

        let subscription = self
            .post_subscription(url, params, request.idempotency_key)
            .await?;

        tracing::info!(
            checkout_session_id = %request.session.id,
            subscription_id = %subscription.id,
            status = %subscription.status,
            "Stripe subscription updated"
        );

        let preview = request.preview;
        let applied_action = descriptor.action;
        let applied_amount = applied_action
            .and_then(|action| preview.actions.get(&action))
            .map(|figures| figures.due_now)
            .unwrap_or(preview.totals.due_now);

        Ok(CommitPayload {
            subscription_id: subscription.id,
            applied_amount,
            currency: subscription
                .currency
                .unwrap_or_else(|| request.session.currency.clone()),
            effective_at: preview
                .timing
                .map(|timing| timing.unix_secs())
                .unwrap_or(descriptor.proration_date),
            status: Some(subscription.status),
            applied_action,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Preview Construction
// ════════════════════════════════════════════════════════════════════════════════

/// Whether the checkout asks for the change at a future date. A single
/// subscription update always applies immediately, so such a date cannot be
/// honoured.
fn is_scheduled(session: &CheckoutSession, now: Timestamp) -> bool {
    session
        .effective_date
        .as_deref()
        .and_then(parse_explicit_date)
        .map_or(false, |at| at.is_after(&now))
}

/// Whether the change is invoiced at once, so the upcoming invoice is needed.
fn bills_immediately(subscription: &StripeSubscription, signal: Signal) -> bool {
    !subscription.is_trialing() && matches!(signal, Signal::Upgrade | Signal::Expansion)
}

/// Turns a classified change into a preview.
///
/// Every change is applied by the single commit request, so the reported
/// timing is when that request takes effect:
///
/// - Active subscriptions change now. Upgrades and expansions are invoiced
///   with prorations; downgrades and contractions are not credited, so the
///   lower amount shows from the next invoice on.
/// - Trialing subscriptions keep their trial (the request pins `trial_end`),
///   so nothing is billed before the trial ends unless the customer ends it.
fn build_preview(
    session: &CheckoutSession,
    subscription: &StripeSubscription,
    plan: ChangePlan,
    invoice: Option<&StripeInvoice>,
    now: Timestamp,
) -> ChangePreview {
    let trialing = subscription.is_trialing();
    let immediate = resolve_effective_timestamp_at(now, None, None, None);
    let after_trial =
        resolve_effective_timestamp_at(now, None, subscription.trial_end.filter(|_| trialing), None);
    let kept_trial_end = Some(after_trial.unix_secs())
        .filter(|_| after_trial.strategy == TimingStrategy::AtTrialEnd);
    let currency = subscription
        .currency
        .clone()
        .unwrap_or_else(|| session.currency.clone());
    let now_secs = now.as_unix_secs();

    let descriptor = |proration_behavior: ProrationBehavior,
                      trial_end_at: Option<i64>,
                      action: Option<ChangeAction>| CommitDescriptor {
        subscription_id: Some(subscription.id.clone()),
        customer: Some(subscription.customer.clone()),
        items: plan.operations.clone(),
        proration_behavior,
        proration_date: now_secs,
        trial_end: trial_end_at,
        action,
    };

    let checkout_lines: Vec<PreviewLine> = session
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

    let totals = |due_now: i64| PreviewTotals {
        due_now,
        currency: currency.clone(),
    };

    let unbilled = |signal: Signal, timing: EffectiveTiming, trial_end_at: Option<i64>| {
        ChangePreview::enabled(
            signal,
            totals(0),
            descriptor(ProrationBehavior::None, trial_end_at, None),
        )
        .with_lines(checkout_lines.clone())
        .with_timing(timing)
    };

    match plan.signal {
        Signal::Upgrade | Signal::Expansion if !trialing => {
            let (due_now, lines) = match invoice {
                Some(invoice) => (invoice.proration_total().max(0), invoice_lines(invoice)),
                None => (0, checkout_lines),
            };
            ChangePreview::enabled(
                plan.signal,
                totals(due_now),
                descriptor(ProrationBehavior::AlwaysInvoice, None, None),
            )
            .with_lines(lines)
            .with_timing(immediate)
        }
        Signal::Expansion => {
            let expand_now = PreviewAction {
                due_now: plan.desired_amount,
                effective_at: now_secs,
                strategy: TimingStrategy::AtDate,
                trial_end: Some(now_secs),
            };
            let expand_at_trial_end = PreviewAction {
                due_now: 0,
                effective_at: after_trial.unix_secs(),
                strategy: after_trial.strategy,
                trial_end: kept_trial_end,
            };

            let (selected, timing, due_now, trial_end_field) = match session.requested_action {
                Some(ChangeAction::ExpandNow) => (
                    ChangeAction::ExpandNow,
                    immediate,
                    expand_now.due_now,
                    Some(now_secs),
                ),
                _ => (ChangeAction::ExpandAtTrialEnd, after_trial, 0, kept_trial_end),
            };

            ChangePreview::enabled(
                Signal::Expansion,
                totals(due_now),
                descriptor(ProrationBehavior::None, trial_end_field, Some(selected)),
            )
            .with_lines(checkout_lines)
            .with_timing(timing)
            .with_action(ChangeAction::ExpandNow, expand_now)
            .with_action(ChangeAction::ExpandAtTrialEnd, expand_at_trial_end)
        }
        Signal::Downgrade | Signal::Contraction | Signal::Switch if trialing => {
            unbilled(plan.signal, after_trial, kept_trial_end)
        }
        Signal::Downgrade | Signal::Contraction => unbilled(plan.signal, immediate, None),
        Signal::Upgrade | Signal::Switch => ChangePreview::enabled(
            plan.signal,
            totals(0),
            descriptor(ProrationBehavior::CreateProrations, None, None),
        )
        .with_lines(checkout_lines)
        .with_timing(immediate),
        Signal::Convert => ChangePreview::enabled(
            Signal::Convert,
            totals(plan.current_amount),
            descriptor(ProrationBehavior::None, Some(now_secs), None),
        )
        .with_lines(checkout_lines)
        .with_timing(immediate),
        Signal::Acquisition => ChangePreview::disabled("Checkout already has a subscription"),
    }
}

fn invoice_lines(invoice: &StripeInvoice) -> Vec<PreviewLine> {
    invoice
        .lines
        .data
        .iter()
        .filter(|line| line.proration)
        .map(|line| PreviewLine {
            description: line.description.clone().unwrap_or_default(),
            price_id: line.price.as_ref().map(|price| price.id.clone()),
            quantity: line.quantity,
            amount: line.amount,
            proration: true,
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Request Encoding
// ════════════════════════════════════════════════════════════════════════════════

fn item_params(prefix: &str, operations: &[ItemOperation]) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for (i, operation) in operations.iter().enumerate() {
        match operation {
            ItemOperation::Add { price_id, quantity } => {
                params.push((format!("{}[{}][price]", prefix, i), price_id.clone()));
                params.push((format!("{}[{}][quantity]", prefix, i), quantity.to_string()));
            }
            ItemOperation::Update {
                item_id,
                price_id,
                quantity,
            } => {
                params.push((format!("{}[{}][id]", prefix, i), item_id.clone()));
                params.push((format!("{}[{}][price]", prefix, i), price_id.clone()));
                params.push((format!("{}[{}][quantity]", prefix, i), quantity.to_string()));
            }
            ItemOperation::Remove { item_id } => {
                params.push((format!("{}[{}][id]", prefix, i), item_id.clone()));
                params.push((format!("{}[{}][deleted]", prefix, i), "true".to_string()));
            }
        }
    }
    params
}

fn create_params(request: CommitRequest<'_>, customer: &str) -> Vec<(String, String)> {
    let descriptor = request.descriptor;
    let mut params = vec![("customer".to_string(), customer.to_string())];
    params.extend(item_params("items", &descriptor.items));
    if let Some(trial_end) = descriptor.trial_end {
        params.push(("trial_end".to_string(), trial_end.to_string()));
    }
    params.extend(metadata_params(request));
    params
}

fn update_params(request: CommitRequest<'_>) -> Vec<(String, String)> {
    let descriptor = request.descriptor;
    let mut params = item_params("items", &descriptor.items);
    params.push((
        "proration_behavior".to_string(),
        descriptor.proration_behavior.as_str().to_string(),
    ));
    if descriptor.proration_behavior != ProrationBehavior::None {
        params.push((
            "proration_date".to_string(),
            descriptor.proration_date.to_string(),
        ));
    }
    if let Some(trial_end) = descriptor.trial_end {
        let value = if descriptor.ends_trial_now() {
            "now".to_string()
        } else {
            trial_end.to_string()
        };
        params.push(("trial_end".to_string(), value));
    }
    params.extend(metadata_params(request));
    params
}

fn metadata_params(request: CommitRequest<'_>) -> Vec<(String, String)> {
    let mut params = vec![(
        "metadata[checkout_session_id]".to_string(),
        request.session.id.to_string(),
    )];
    if let Some(signal) = request.preview.signal {
        params.push(("metadata[change_signal]".to_string(), signal.to_string()));
    }
    params
}

// ════════════════════════════════════════════════════════════════════════════════
// Response Decoding
// ════════════════════════════════════════════════════════════════════════════════

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    response.json().await.map_err(|e| {
        GatewayError::malformed_response(format!("Failed to parse Stripe response: {}", e))
    })
}

async fn error_from_response(operation: &'static str, response: reqwest::Response) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let api_error = serde_json::from_str::<StripeErrorEnvelope>(&body)
        .ok()
        .map(|envelope| envelope.error);

    let key_conflict = api_error
        .as_ref()
        .map_or(false, |e| e.error_type == "idempotency_error");

    // A reused idempotency key says nothing about whether the first request applied.
    let code = match status.as_u16() {
        _ if key_conflict => GatewayErrorCode::ProviderError,
        401 | 403 => GatewayErrorCode::AuthenticationError,
        404 => GatewayErrorCode::NotFound,
        429 => GatewayErrorCode::RateLimitExceeded,
        400 | 402 | 409 => GatewayErrorCode::InvalidRequest,
        _ => GatewayErrorCode::ProviderError,
    };

    let message = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("Stripe API error: {}", status));

    let mut error = GatewayError::new(code, message);
    if let Some(provider_code) = api_error.and_then(|e| e.code) {
        error = error.with_provider_code(provider_code);
    }

    tracing::error!(
        operation,
        status = status.as_u16(),
        error_code = %error.code,
        provider_code = ?error.provider_code,
        error = %error.message,
        "Stripe request failed"
    );

    error
}
