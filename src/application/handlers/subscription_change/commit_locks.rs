//! Per-session commit serialization.
//!
//! Commits for the same checkout session run one at a time within this
//! process. Sessions never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::CheckoutSessionId;

type SessionLock = Arc<AsyncMutex<()>>;

/// Registry of per-session commit locks.
#[derive(Debug, Clone, Default)]
pub struct CommitLocks {
    sessions: Arc<Mutex<HashMap<CheckoutSessionId, SessionLock>>>,
}

impl CommitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other commit holds `session_id`, then holds it until
    /// the returned guard is dropped.
    pub async fn acquire(&self, session_id: CheckoutSessionId) -> CommitGuard {
        let lock = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map holds these: their waiters gave up before locking.
            sessions.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(sessions.entry(session_id).or_default())
        };

        let guard = lock.lock_owned().await;

        CommitGuard {
            session_id,
            locks: self.clone(),
            guard: Some(guard),
        }
    }

    /// Number of sessions with a commit in flight or waiting.
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Holds a session's commit lock.
#[derive(Debug)]
pub struct CommitGuard {
    session_id: CheckoutSessionId,
    locks: CommitLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CommitGuard {
    pub fn session_id(&self) -> &CheckoutSessionId {
        &self.session_id
    }
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        let mut sessions = self
            .locks
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Map entry plus this guard's handle: nobody else is waiting.
        let idle = sessions
            .get(&self.session_id)
            .map_or(false, |lock| Arc::strong_count(lock) <= 2);
        if idle {
            sessions.remove(&self.session_id);
        }

        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_waits_for_release() {
        let locks = CommitLocks::new();
        let session = CheckoutSessionId::new();

        let first = locks.acquire(session).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.acquire(session).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_sessions_do_not_block() {
        let locks = CommitLocks::new();

        let _a = locks.acquire(CheckoutSessionId::new()).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(CheckoutSessionId::new()),
        )
        .await;

        assert!(b.is_ok());
        assert_eq!(locks.active_sessions(), 2);
    }

    #[tokio::test]
    async fn released_sessions_are_forgotten() {
        let locks = CommitLocks::new();
        let session = CheckoutSessionId::new();

        let guard = locks.acquire(session).await;
        assert_eq!(guard.session_id(), &session);
        assert_eq!(locks.active_sessions(), 1);

        drop(guard);
        assert_eq!(locks.active_sessions(), 0);
    }

    #[tokio::test]
    async fn abandoned_waiter_entry_is_swept() {
        let locks = CommitLocks::new();
        let session = CheckoutSessionId::new();

        let first = locks.acquire(session).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.acquire(session).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Release while the waiter is queued, then cancel it before it runs.
        drop(first);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(locks.active_sessions(), 1);

        drop(locks.acquire(CheckoutSessionId::new()).await);
        assert_eq!(locks.active_sessions(), 0);
    }
}
