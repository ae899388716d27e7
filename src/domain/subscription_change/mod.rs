//! Subscription change domain module.
//!
//! # Module Structure
//!
//! - `signal` - The closed set of business signals and their messages
//! - `action` - Named variants a preview can offer (start/skip trial, ...)
//! - `timing` - Effective timestamp resolution (explicit date, trial end, period end)
//! - `preview` - Read-only projection of a change
//! - `descriptor` - Gateway instructions produced by a preview, consumed by a commit
//! - `result` - Outcome of a committed change

mod action;
mod descriptor;
mod preview;
mod result;
mod signal;
mod timing;

pub use action::ChangeAction;
pub use descriptor::{CommitDescriptor, ItemOperation, ProrationBehavior};
pub use preview::{ChangePreview, PreviewAction, PreviewLine, PreviewTotals};
pub use result::{ChangeResult, CommitPayload};
pub use signal::{message_for, Signal};
pub use timing::{
    parse_explicit_date, resolve_effective_timestamp, resolve_effective_timestamp_at,
    EffectiveTiming, TimingStrategy,
};
