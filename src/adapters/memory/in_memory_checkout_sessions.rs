//! In-Memory Checkout Session Adapter
//!
//! Stores checkout sessions in memory.
//! Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::checkout::{CheckoutSession, SessionMetadata};
use crate::domain::foundation::{CheckoutSessionId, DomainError, ErrorCode};
use crate::ports::CheckoutSessionRepository;

/// In-memory storage for checkout sessions
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckoutSessions {
    sessions: Arc<RwLock<HashMap<CheckoutSessionId, CheckoutSession>>>,
}

impl InMemoryCheckoutSessions {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session
    pub async fn save(&self, session: CheckoutSession) {
        self.sessions.write().await.insert(session.id, session);
    }

    /// Get the number of stored sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl CheckoutSessionRepository for InMemoryCheckoutSessions {
    async fn find_by_id(
        &self,
        id: &CheckoutSessionId,
    ) -> Result<Option<CheckoutSession>, DomainError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn append_metadata(
        &self,
        id: &CheckoutSessionId,
        entries: SessionMetadata,
    ) -> Result<(), DomainError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::CheckoutSessionNotFound,
                format!("Checkout session {} not found", id),
            )
        })?;
        session.append_metadata(entries);
        Ok(())
    }
}
