//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid gateway timeout (must be 1..=120 seconds)")]
    InvalidGatewayTimeout,

    #[error("Invalid commit timeout (must be 1..=300 seconds)")]
    InvalidCommitTimeout,

    #[error("Default trial length exceeds 730 days")]
    TrialTooLong,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Stripe API base URL must use HTTPS in production")]
    StripeBaseUrlMustBeHttps,
}
