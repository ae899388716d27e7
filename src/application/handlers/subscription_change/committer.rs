//! ChangeCommitter - Applies a subscription change through the gateway.
//!
//! Flow:
//! 1. Serialize on the checkout session
//! 2. Rebuild the preview (a caller-supplied preview is never trusted)
//! 3. Re-resolve the commit capability
//! 4. Exactly one mutating gateway call, bounded by the commit timeout
//! 5. Append `change_signal` / `change_result` to the session metadata

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::commit_locks::CommitLocks;
use super::errors::ChangeError;
use super::idempotency::idempotency_key;
use super::preview_builder::ChangePreviewBuilder;
use crate::config::EngineConfig;
use crate::domain::checkout::{CheckoutSession, SessionMetadata};
use crate::domain::foundation::Timestamp;
use crate::domain::subscription_change::{
    message_for, ChangeAction, ChangeResult, CommitPayload, Signal,
};
use crate::ports::{
    CheckoutSessionRepository, CommitRequest, GatewayAdapter, GatewayError, IntegrationResolver,
};

/// Metadata key holding the committed signal.
pub const CHANGE_SIGNAL_KEY: &str = "change_signal";

/// Metadata key holding the gateway's commit result.
pub const CHANGE_RESULT_KEY: &str = "change_result";

/// Commits previewed subscription changes.
#[derive(Clone)]
pub struct ChangeCommitter {
    previews: ChangePreviewBuilder,
    sessions: Arc<dyn CheckoutSessionRepository>,
    locks: CommitLocks,
    commit_timeout: Duration,
}

impl ChangeCommitter {
    pub fn new(previews: ChangePreviewBuilder, sessions: Arc<dyn CheckoutSessionRepository>) -> Self {
        Self {
            previews,
            sessions,
            locks: CommitLocks::new(),
            commit_timeout: EngineConfig::default().commit_timeout(),
        }
    }

    pub fn from_config(
        resolver: Arc<dyn IntegrationResolver>,
        sessions: Arc<dyn CheckoutSessionRepository>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            previews: ChangePreviewBuilder::from_config(resolver, config),
            sessions,
            locks: CommitLocks::new(),
            commit_timeout: config.commit_timeout(),
        }
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    /// Shares a lock registry with other committers in this process.
    pub fn with_locks(mut self, locks: CommitLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn preview_builder(&self) -> &ChangePreviewBuilder {
        &self.previews
    }

    /// Commits the change currently implied by `session`.
    ///
    /// On success the session's metadata has `change_signal` and
    /// `change_result` appended, both in `session` and in the repository.
    pub async fn commit(&self, session: &mut CheckoutSession) -> Result<ChangeResult, ChangeError> {
        let _guard = self.locks.acquire(session.id).await;

        let preview = self.previews.preview(session).await;
        let (signal, descriptor) = preview.commit_plan().map_err(|reason| {
            tracing::info!(
                checkout_session_id = %session.id,
                organization_id = %session.organization_id,
                reason = %reason,
                "Subscription change preview is not available"
            );
            ChangeError::preview_unavailable(reason)
        })?;

        let adapter = self.resolve_adapter(session).await?;
        let capability = adapter
            .subscription_changes()
            .ok_or(ChangeError::UnsupportedIntegration)?;

        let key = idempotency_key(&session.id, descriptor);
        let request = CommitRequest {
            session: &*session,
            preview: &preview,
            descriptor,
            idempotency_key: &key,
        };

        let payload = match tokio::time::timeout(self.commit_timeout, capability.commit_change(request))
            .await
        {
            Ok(Ok(payload)) => payload,
            Ok(Err(err)) => {
                tracing::error!(
                    checkout_session_id = %session.id,
                    organization_id = %session.organization_id,
                    subscription_id = ?session.subscription,
                    provider = adapter.provider(),
                    signal = %signal,
                    error_code = %err.code,
                    error = %err.message,
                    "Subscription change commit failed"
                );
                return Err(ChangeError::Gateway(err));
            }
            Err(_) => {
                let err = GatewayError::timeout(self.commit_timeout);
                tracing::error!(
                    checkout_session_id = %session.id,
                    organization_id = %session.organization_id,
                    subscription_id = ?session.subscription,
                    provider = adapter.provider(),
                    signal = %signal,
                    idempotency_key = %key,
                    "Subscription change commit timed out; outcome unknown"
                );
                return Err(ChangeError::Gateway(err));
            }
        };

        let action = payload.applied_action.or(preview.selected_action);
        let message = message_for(signal, action);

        let entries = change_metadata(signal, action, &payload);
        session.append_metadata(entries.clone());

        if let Err(err) = self.sessions.append_metadata(&session.id, entries).await {
            tracing::error!(
                checkout_session_id = %session.id,
                organization_id = %session.organization_id,
                subscription_id = %payload.subscription_id,
                signal = %signal,
                applied_amount = payload.applied_amount,
                currency = %payload.currency,
                error = %err,
                "Subscription changed but checkout metadata was not saved"
            );
            return Err(ChangeError::Persistence(err.message));
        }

        tracing::info!(
            checkout_session_id = %session.id,
            organization_id = %session.organization_id,
            subscription_id = %payload.subscription_id,
            signal = %signal,
            action = action.map(|a| a.as_str()),
            applied_amount = payload.applied_amount,
            "Subscription change committed"
        );

        Ok(ChangeResult {
            success: true,
            message: message.to_string(),
            signal,
            result: payload,
            checkout_session: session.clone(),
        })
    }

    async fn resolve_adapter(
        &self,
        session: &CheckoutSession,
    ) -> Result<Arc<dyn GatewayAdapter>, ChangeError> {
        match self.previews.resolver().resolve(&session.organization_id).await {
            Ok(Some(adapter)) => Ok(adapter),
            Ok(None) => Err(ChangeError::UnsupportedIntegration),
            Err(err) => Err(ChangeError::preview_unavailable(err.message)),
        }
    }
}

fn change_metadata(
    signal: Signal,
    action: Option<ChangeAction>,
    payload: &CommitPayload,
) -> SessionMetadata {
    let mut entries = SessionMetadata::new();
    entries.insert(CHANGE_SIGNAL_KEY.to_string(), json!(signal.as_str()));
    entries.insert(
        CHANGE_RESULT_KEY.to_string(),
        json!({
            "subscription_id": payload.subscription_id,
            "applied_amount": payload.applied_amount,
            "currency": payload.currency,
            "effective_at": payload.effective_at,
            "status": payload.status,
            "action": action.map(|a| a.as_str()),
            "committed_at": Timestamp::now().as_unix_secs(),
        }),
    );
    entries
}
