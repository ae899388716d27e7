//! Subscription change handlers.
//!
//! Two-phase flow for checkout-driven subscription changes:
//!
//! ## Preview
//! - `ChangePreviewBuilder` - Read-only projection of a change, never fails
//!
//! ## Commit
//! - `ChangeCommitter` - Rebuilds the preview and applies it exactly once
//! - `CommitLocks` - Per-session commit serialization

mod commit_locks;
mod committer;
mod errors;
mod idempotency;
mod preview_builder;

pub use commit_locks::{CommitGuard, CommitLocks};
pub use committer::{ChangeCommitter, CHANGE_RESULT_KEY, CHANGE_SIGNAL_KEY};
pub use errors::ChangeError;
pub use idempotency::idempotency_key;
pub use preview_builder::{ChangePreviewBuilder, UNSUPPORTED_PREVIEW_REASON};
