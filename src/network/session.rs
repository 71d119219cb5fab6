//! Game Session Management
//!
//! Orchestrates the session lifecycle on top of a [`SessionStore`]:
//! start, turn, state, reveal, verify, end. Turns on the same session are
//! serialized through a per-session lock; different sessions never contend.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::game::rules::GameConfig;
use crate::game::state::{GameSession, SessionId, TurnError, TurnRecord};
use crate::network::protocol::ErrorCode;
use crate::network::store::{InMemorySessionStore, SessionStore, StoreError};
use crate::proof::commitment::CommitmentError;
use crate::proof::reveal::ProvenanceReveal;
use crate::proof::verify::{verify_fairness, VerificationError, VerificationReport, VerifyRequest};
use crate::core::seed::effective_client_seed;

// =============================================================================
// RESULTS & ERRORS
// =============================================================================

/// Result of starting a session.
#[derive(Debug, Clone)]
pub struct SessionStart {
    /// The new session.
    pub session: GameSession,
    /// Commitment published to the player.
    pub commitment_hash: String,
    /// Client value that went into the seed (the default when none given).
    pub client_value_used: String,
}

/// Result of resolving a turn.
#[derive(Debug, Clone)]
pub struct TurnResolution {
    /// Session after the turn.
    pub session: GameSession,
    /// The turn that was resolved.
    pub record: TurnRecord,
    /// Outcome text including the session's standing.
    pub final_outcome: String,
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Unknown session id.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// Provenance requested before the game ended.
    #[error("Game must be completed before revealing provenance")]
    RevealBeforeCompletion(SessionId),

    /// Turn rejected by the state machine.
    #[error(transparent)]
    Turn(#[from] TurnError),

    /// Verification input rejected.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Commitment could not be produced.
    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}

impl SessionError {
    /// Protocol error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::SessionNotFound(_) => ErrorCode::SessionNotFound,
            SessionError::RevealBeforeCompletion(_) => ErrorCode::RevealBeforeCompletion,
            SessionError::Turn(TurnError::SessionTerminal(_)) => ErrorCode::SessionTerminal,
            SessionError::Turn(TurnError::TurnLimitExceeded { .. }) => {
                ErrorCode::TurnLimitExceeded
            }
            SessionError::Turn(TurnError::InvalidChoice { .. }) => ErrorCode::InvalidChoice,
            SessionError::Turn(TurnError::InsuranceNotAllowed(_)) => {
                ErrorCode::InsuranceNotAllowed
            }
            SessionError::Verification(
                VerificationError::MissingField(_) | VerificationError::WrongType { .. },
            ) => {
                ErrorCode::VerificationInputMalformed
            }
            SessionError::Store(StoreError::NotFound(_)) => ErrorCode::SessionNotFound,
            SessionError::Verification(VerificationError::Commitment(_))
            | SessionError::Store(StoreError::AlreadyExists(_))
            | SessionError::Commitment(_) => ErrorCode::InternalError,
        }
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Manages all active sessions.
pub struct SessionManager {
    /// Session persistence.
    store: Arc<dyn SessionStore>,
    /// Rules for new sessions.
    config: GameConfig,
    /// Per-session turn locks.
    locks: RwLock<BTreeMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionManager {
    /// Create a manager over a store.
    pub fn new(store: Arc<dyn SessionStore>, config: GameConfig) -> Self {
        Self {
            store,
            config,
            locks: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a manager over a fresh in-memory store.
    pub fn in_memory(config: GameConfig) -> Self {
        Self::new(Arc::new(InMemorySessionStore::new()), config)
    }

    /// Rules new sessions are created with.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Start a new session: secret, seed, plan and commitment, stored together.
    #[instrument(skip(self, client_value))]
    pub async fn start_session(
        &self,
        player_name: String,
        client_value: Option<String>,
    ) -> Result<SessionStart, SessionError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let client_value_used = effective_client_seed(client_value.as_deref()).to_string();

        let session = GameSession::new(session_id.clone(), player_name, client_value, self.config)?;
        let commitment_hash = session.provenance.commitment_hash.clone();

        self.store.create(session.clone())?;
        self.locks
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(())));

        info!(%session_id, commitment = %commitment_hash, "Session started");

        Ok(SessionStart {
            session,
            commitment_hash,
            client_value_used,
        })
    }

    /// Resolve one turn. Serialized per session.
    #[instrument(skip(self))]
    pub async fn take_turn(
        &self,
        session_id: &str,
        slot_id: u32,
        insurance: bool,
    ) -> Result<TurnResolution, SessionError> {
        let lock = self
            .lock_for(session_id)
            .await
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        let _guard = lock.lock().await;

        let mut session = self
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;

        let record = match session.take_turn(slot_id, insurance) {
            Ok(record) => record,
            Err(e) => {
                debug!(%session_id, error = %e, "Turn rejected");
                return Err(e.into());
            }
        };

        self.store.update(session.clone())?;

        let final_outcome = session
            .last_outcome_summary()
            .unwrap_or_else(|| record.outcome.clone());

        if session.is_completed {
            info!(
                %session_id,
                status = %session.status,
                rewards = session.accumulated_reward,
                "Session completed"
            );
        }

        Ok(TurnResolution {
            session,
            record,
            final_outcome,
        })
    }

    /// Snapshot of a session.
    pub async fn get_session(&self, session_id: &str) -> Result<GameSession, SessionError> {
        self.store
            .get(session_id)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }

    /// Reveal provenance of a completed session.
    #[instrument(skip(self))]
    pub async fn reveal(&self, session_id: &str) -> Result<ProvenanceReveal, SessionError> {
        let session = self.get_session(session_id).await?;
        if !session.is_completed {
            return Err(SessionError::RevealBeforeCompletion(session_id.to_string()));
        }

        info!(%session_id, "Provenance revealed");
        Ok(ProvenanceReveal::from_session(&session))
    }

    /// Stateless fairness check.
    pub fn verify(&self, request: &VerifyRequest) -> Result<VerificationReport, SessionError> {
        let report = verify_fairness(request, self.config.max_turns)?;
        if !report.game_is_fair {
            warn!(
                session_id = request.session_id.as_deref().unwrap_or_default(),
                plan_matches = report.plan_matches,
                commitment_matches = report.commitment_matches,
                "Verification failed"
            );
        }
        Ok(report)
    }

    /// Delete a session. Returns whether it existed.
    #[instrument(skip(self))]
    pub async fn end_session(&self, session_id: &str) -> bool {
        let existed = self.store.delete(session_id);
        self.locks.write().await.remove(session_id);
        if existed {
            info!(%session_id, "Session ended");
        }
        existed
    }

    /// Remove sessions idle longer than `ttl`. Returns how many were removed.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let idle = self.store.idle_since(cutoff);

        let mut locks = self.locks.write().await;
        let mut removed = 0;
        for id in &idle {
            if self.store.delete(id) {
                removed += 1;
            }
            locks.remove(id);
        }
        // Drop locks whose sessions are gone for any other reason
        locks.retain(|id, _| self.store.get(id).is_some());

        if removed > 0 {
            info!(removed, "Evicted idle sessions");
        }
        removed
    }

    /// Number of stored sessions.
    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Lock for a session, created on demand for sessions present in the store.
    async fn lock_for(&self, session_id: &str) -> Option<Arc<Mutex<()>>> {
        if let Some(lock) = self.locks.read().await.get(session_id) {
            return Some(lock.clone());
        }

        self.store.get(session_id)?;
        let mut locks = self.locks.write().await;
        Some(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        )
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::in_memory(GameConfig::default())
    }
}
