//! Errors returned by subscription change commits.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{GatewayError, GatewayErrorCode};

/// Why a commit did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeError {
    /// The freshly built preview was disabled.
    #[error("Subscription change preview is not available: {reason}")]
    PreviewUnavailable { reason: String },

    /// The organization's integration cannot mutate subscriptions.
    #[error("Integration does not support subscription changes")]
    UnsupportedIntegration,

    /// The gateway rejected or failed the mutation. Carried untouched.
    #[error(transparent)]
    Gateway(GatewayError),

    /// The gateway applied the change but the session metadata was not saved.
    #[error("Subscription change applied but checkout metadata was not saved: {0}")]
    Persistence(String),
}

impl ChangeError {
    pub fn preview_unavailable(reason: impl Into<String>) -> Self {
        Self::PreviewUnavailable {
            reason: reason.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ChangeError::PreviewUnavailable { .. } => ErrorCode::PreviewUnavailable,
            ChangeError::UnsupportedIntegration => ErrorCode::UnsupportedIntegration,
            ChangeError::Gateway(err) if err.code == GatewayErrorCode::Timeout => {
                ErrorCode::GatewayTimeout
            }
            ChangeError::Gateway(_) => ErrorCode::GatewayError,
            ChangeError::Persistence(_) => ErrorCode::DatabaseError,
        }
    }

    /// HTTP status a transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ChangeError::PreviewUnavailable { .. } => 409,
            ChangeError::UnsupportedIntegration => 422,
            ChangeError::Gateway(_) => 502,
            ChangeError::Persistence(_) => 500,
        }
    }

    /// Whether the mutation may have been applied even though an error was returned.
    pub fn is_ambiguous(&self) -> bool {
        match self {
            ChangeError::Gateway(err) => err.is_ambiguous(),
            ChangeError::Persistence(_) => true,
            _ => false,
        }
    }

    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            ChangeError::Gateway(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GatewayError> for ChangeError {
    fn from(err: GatewayError) -> Self {
        ChangeError::Gateway(err)
    }
}

impl From<ChangeError> for DomainError {
    fn from(err: ChangeError) -> Self {
        let code = err.code();
        match err {
            ChangeError::Gateway(gateway) => DomainError::from(gateway),
            other => DomainError::new(code, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn preview_unavailable_message_includes_reason() {
        let err = ChangeError::preview_unavailable("No subscription found");
        assert_eq!(
            err.to_string(),
            "Subscription change preview is not available: No subscription found"
        );
        assert_eq!(err.code(), ErrorCode::PreviewUnavailable);
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn unsupported_integration_message() {
        let err = ChangeError::UnsupportedIntegration;
        assert_eq!(
            err.to_string(),
            "Integration does not support subscription changes"
        );
        assert_eq!(err.http_status(), 422);
        assert!(!err.is_ambiguous());
    }

    #[test]
    fn gateway_error_display_is_untouched() {
        let gateway = GatewayError::invalid_request("No such price: 'price_x'");
        let err = ChangeError::from(gateway.clone());
        assert_eq!(err.to_string(), gateway.to_string());
        assert_eq!(err.gateway_error(), Some(&gateway));
        assert_eq!(err.code(), ErrorCode::GatewayError);
    }

    #[test]
    fn commit_timeout_is_ambiguous() {
        let err = ChangeError::Gateway(GatewayError::timeout(Duration::from_secs(30)));
        assert_eq!(err.code(), ErrorCode::GatewayTimeout);
        assert!(err.is_ambiguous());
    }

    #[test]
    fn converts_to_domain_error() {
        let domain: DomainError = ChangeError::UnsupportedIntegration.into();
        assert_eq!(domain.code, ErrorCode::UnsupportedIntegration);
        assert_eq!(
            domain.message(),
            "Integration does not support subscription changes"
        );
    }
}
