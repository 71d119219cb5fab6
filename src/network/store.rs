//! Session Storage
//!
//! Persistence seam for sessions. The manager only talks to the
//! [`SessionStore`] trait; the in-memory implementation is the default
//! backend. Reads return owned snapshots, so no lock is held across an
//! await point.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::game::state::{GameSession, SessionId};

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A session with this id already exists.
    #[error("session {0} already exists")]
    AlreadyExists(SessionId),

    /// No session with this id.
    #[error("session {0} not found")]
    NotFound(SessionId),
}

/// Session persistence.
pub trait SessionStore: Send + Sync {
    /// Insert a new session.
    fn create(&self, session: GameSession) -> Result<(), StoreError>;

    /// Snapshot of a session.
    fn get(&self, id: &str) -> Option<GameSession>;

    /// Replace an existing session, stamping `updated_at`.
    fn update(&self, session: GameSession) -> Result<(), StoreError>;

    /// Remove a session. Returns whether it existed.
    fn delete(&self, id: &str) -> bool;

    /// Number of stored sessions.
    fn len(&self) -> usize;

    /// True when nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of sessions not updated since `cutoff`.
    fn idle_since(&self, cutoff: DateTime<Utc>) -> Vec<SessionId>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<BTreeMap<SessionId, GameSession>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, session: GameSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&session.session_id) {
            return Err(StoreError::AlreadyExists(session.session_id));
        }
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<GameSession> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.get(id).cloned()
    }

    fn update(&self, mut session: GameSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get_mut(&session.session_id) {
            Some(slot) => {
                session.updated_at = Utc::now();
                *slot = session;
                Ok(())
            }
            None => Err(StoreError::NotFound(session.session_id)),
        }
    }

    fn delete(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(id).is_some()
    }

    fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn idle_since(&self, cutoff: DateTime<Utc>) -> Vec<SessionId> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .values()
            .filter(|s| s.updated_at < cutoff)
            .map(|s| s.session_id.clone())
            .collect()
    }
}
