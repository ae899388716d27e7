//! Application layer - Preview and commit handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Previews are queries (read-only gateway calls); commits are the only
//! command and perform exactly one gateway mutation.

pub mod handlers;

pub use handlers::{
    ChangeCommitter, ChangeError, ChangePreviewBuilder, CommitLocks, CHANGE_RESULT_KEY,
    CHANGE_SIGNAL_KEY,
};
