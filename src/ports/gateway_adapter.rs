//! Gateway adapter port for billing provider integrations.
//!
//! Defines the capability contract a billing gateway (e.g., Stripe) must
//! satisfy for the change engine. Capabilities are discovered at runtime:
//! an adapter advertises what it supports by returning `Some` from the
//! matching accessor on [`GatewayAdapter`].
//!
//! # Design
//!
//! - **Gateway agnostic**: proration and timing math live in the adapter
//! - **Read/write split**: previews never mutate; a commit mutates exactly once
//! - **No automatic retries**: mutating calls are attempted once

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::checkout::{CheckoutIntent, CheckoutSession};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription_change::{ChangePreview, CommitDescriptor, CommitPayload};

/// A billing provider integration configured for an organization.
pub trait GatewayAdapter: Send + Sync {
    /// Provider name for logs (e.g. "stripe").
    fn provider(&self) -> &str;

    /// Read-only change previews, if supported.
    fn change_preview(&self) -> Option<&dyn SupportsChangePreview> {
        None
    }

    /// Subscription mutations, if supported.
    fn subscription_changes(&self) -> Option<&dyn SupportsSubscriptionChanges> {
        None
    }
}

/// Capability: compute a change preview against live gateway state.
#[async_trait]
pub trait SupportsChangePreview: Send + Sync {
    /// Builds a preview for an existing subscription.
    ///
    /// Must be side-effect free. Expected "not possible" states (no
    /// subscription, nothing to change) are returned as a disabled preview;
    /// `Err` is reserved for transport and gateway failures.
    async fn preview_change(
        &self,
        session: &CheckoutSession,
        intent: CheckoutIntent,
    ) -> Result<ChangePreview, GatewayError>;
}

/// Capability: apply a previewed change.
#[async_trait]
pub trait SupportsSubscriptionChanges: Send + Sync {
    /// Performs exactly one subscription mutation.
    async fn commit_change(&self, request: CommitRequest<'_>) -> Result<CommitPayload, GatewayError>;
}

/// Everything an adapter needs to apply a freshly built preview.
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest<'a> {
    pub session: &'a CheckoutSession,
    pub preview: &'a ChangePreview,
    pub descriptor: &'a CommitDescriptor,

    /// Key for this session and exact descriptor; sent to the gateway so a
    /// duplicated request is applied at most once.
    pub idempotency_key: &'a str,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether a read operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::MalformedResponse, message)
    }

    /// The gateway did not answer in time. The outcome of a mutating call
    /// is unknown.
    pub fn timeout(after: Duration) -> Self {
        let elapsed = if after.subsec_nanos() == 0 {
            format!("{}s", after.as_secs())
        } else {
            format!("{}ms", after.as_millis())
        };
        Self::new(
            GatewayErrorCode::Timeout,
            format!("Gateway request timed out after {}", elapsed),
        )
    }

    /// Whether the call may have been applied despite the error.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self.code,
            GatewayErrorCode::Timeout | GatewayErrorCode::NetworkError | GatewayErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let code = match err.code {
            GatewayErrorCode::Timeout => ErrorCode::GatewayTimeout,
            GatewayErrorCode::InvalidRequest => ErrorCode::ValidationFailed,
            _ => ErrorCode::GatewayError,
        };

        DomainError::new(code, err.message)
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// The gateway rejected the request parameters.
    InvalidRequest,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// No response within the configured deadline.
    Timeout,

    /// Provider API error (5xx or unexpected status).
    ProviderError,

    /// Response body could not be understood.
    MalformedResponse,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::InvalidRequest => "invalid_request",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::MalformedResponse => "malformed_response",
        };
        write!(f, "{}", s)
    }
}
