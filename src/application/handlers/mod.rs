//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod subscription_change;

pub use subscription_change::{
    idempotency_key, ChangeCommitter, ChangeError, ChangePreviewBuilder, CommitGuard, CommitLocks,
    CHANGE_RESULT_KEY, CHANGE_SIGNAL_KEY, UNSUPPORTED_PREVIEW_REASON,
};
