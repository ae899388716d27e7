//! Checkout session repository port.
//!
//! The checkout flow owns session persistence. The change engine needs
//! read access and the ability to append metadata after a commit.
//!
//! # Design
//!
//! - **Append-only metadata**: implementations merge entries key by key and
//!   never replace the whole map
//! - **Status untouched**: appending metadata does not alter checkout status

use async_trait::async_trait;

use crate::domain::checkout::{CheckoutSession, SessionMetadata};
use crate::domain::foundation::{CheckoutSessionId, DomainError};

/// Repository port for the checkout session fields the engine touches.
#[async_trait]
pub trait CheckoutSessionRepository: Send + Sync {
    /// Find a checkout session by ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &CheckoutSessionId)
        -> Result<Option<CheckoutSession>, DomainError>;

    /// Merge `entries` into the session's metadata.
    ///
    /// # Errors
    ///
    /// - `CheckoutSessionNotFound` if the session doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn append_metadata(
        &self,
        id: &CheckoutSessionId,
        entries: SessionMetadata,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_session_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn CheckoutSessionRepository) {}
    }
}
