//! Game Session State
//!
//! The session aggregate and its turn-resolution state machine:
//!
//! ```text
//! InProgress(turn 1) ──safe / insured trap──► InProgress(turn n+1)
//!        │                                         │
//!        └──uninsured trap──► Lost      turn > max └──► Won
//! ```
//!
//! The outcome plan is frozen at creation; turns only read it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::seed::generate_server_secret;
use crate::game::path::{GameOutcomePlan, PathCategory, PathOption, TurnOutcomeSet};
use crate::game::rules::{insurance_denial, GameConfig, InsuranceDenial};
use crate::proof::commitment::{CommitmentError, ProvenanceRecord};

/// Session identifier (hyphenated UUID text; it is hashed into the seed).
pub type SessionId = String;

// =============================================================================
// SESSION STATUS
// =============================================================================

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Turns remain and the player is alive.
    InProgress,
    /// Survived every turn.
    Won,
    /// Hit a trap without insurance.
    Lost,
}

impl SessionStatus {
    /// Whether no further turns can be taken.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SessionStatus::InProgress => "in progress",
            SessionStatus::Won => "won",
            SessionStatus::Lost => "lost",
        })
    }
}

// =============================================================================
// TURN RECORD
// =============================================================================

/// The option a player took, trap flag disclosed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChosenPath {
    /// Slot within its turn.
    #[serde(rename = "id")]
    pub slot_id: u32,
    /// Category.
    #[serde(rename = "type")]
    pub category: PathCategory,
    /// Reward.
    pub reward: f64,
    /// "Low", "Medium" or "High".
    pub risk_level: String,
    /// "15%", "30%" or "50%".
    pub trap_chance: String,
    /// Whether it was a trap.
    pub is_trap: bool,
}

impl From<&PathOption> for ChosenPath {
    fn from(option: &PathOption) -> Self {
        let category = option.category();
        Self {
            slot_id: option.slot_id(),
            category,
            reward: option.reward(),
            risk_level: category.risk_level().to_string(),
            trap_chance: category.trap_chance_label().to_string(),
            is_trap: option.is_trap(),
        }
    }
}

/// Immutable log entry for one resolved turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Turn number (1-based).
    pub turn: u32,
    /// The chosen option.
    pub choice: ChosenPath,
    /// Insurance was requested and applied.
    pub insurance_used: bool,
    /// Premium charged (0 when not insured).
    pub insurance_cost: f64,
    /// The chosen option was a trap.
    pub trap_hit: bool,
    /// Player alive after the turn.
    pub survived: bool,
    /// Human-readable outcome.
    pub outcome: String,
}

/// Turn resolution errors. A rejected turn leaves the session untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TurnError {
    /// Session already won or lost.
    #[error("game already ended ({0})")]
    SessionTerminal(SessionStatus),

    /// Turn counter is past the plan.
    #[error("maximum turns exceeded (turn {turn} of {max_turns})")]
    TurnLimitExceeded {
        /// Current turn.
        turn: u32,
        /// Configured maximum.
        max_turns: u32,
    },

    /// No option with that slot id this turn.
    #[error("invalid path choice {slot_id} for turn {turn}")]
    InvalidChoice {
        /// Requested slot.
        slot_id: u32,
        /// Current turn.
        turn: u32,
    },

    /// Insurance requested but not allowed.
    #[error(transparent)]
    InsuranceNotAllowed(#[from] InsuranceDenial),
}

// =============================================================================
// GAME SESSION
// =============================================================================

/// A single player's game: frozen plan, provenance, and progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Unique session identifier.
    pub session_id: SessionId,
    /// Display name.
    pub player_name: String,
    /// Current turn (1-based, at most `max_turns + 1`).
    pub current_turn: u32,
    /// Rewards collected so far.
    pub accumulated_reward: f64,
    /// False only after an uninsured trap.
    pub is_alive: bool,
    /// True once won or lost.
    pub is_completed: bool,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Resolved turns, append-only.
    pub turn_history: Vec<TurnRecord>,
    /// Rules frozen at creation.
    pub config: GameConfig,
    /// Pre-generated outcomes for every turn.
    pub plan: GameOutcomePlan,
    /// Secret, seeds and commitment.
    pub provenance: ProvenanceRecord,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last successful write.
    pub updated_at: DateTime<Utc>,
}

impl GameSession {
    /// Create a session with a freshly generated server secret.
    pub fn new(
        session_id: SessionId,
        player_name: String,
        client_value: Option<String>,
        config: GameConfig,
    ) -> Result<Self, CommitmentError> {
        Self::with_secret(
            session_id,
            player_name,
            generate_server_secret(),
            client_value,
            config,
        )
    }

    /// Create a session from a known server secret.
    ///
    /// Seed, plan and commitment are all fixed here, before any turn.
    pub fn with_secret(
        session_id: SessionId,
        player_name: String,
        server_secret: String,
        client_value: Option<String>,
        config: GameConfig,
    ) -> Result<Self, CommitmentError> {
        let (plan, provenance) =
            ProvenanceRecord::establish(server_secret, client_value, &session_id, config.max_turns)?;
        let now = Utc::now();

        Ok(Self {
            session_id,
            player_name,
            current_turn: 1,
            accumulated_reward: 0.0,
            is_alive: true,
            is_completed: false,
            status: SessionStatus::InProgress,
            turn_history: Vec::new(),
            config,
            plan,
            provenance,
            created_at: now,
            updated_at: now,
        })
    }

    /// Options for the current turn, if the session is still in progress.
    pub fn current_options(&self) -> Option<&TurnOutcomeSet> {
        if self.status.is_terminal() {
            return None;
        }
        self.plan.turn(self.current_turn)
    }

    /// Resolve one turn.
    ///
    /// All preconditions are checked before anything is written, so an
    /// `Err` leaves the session exactly as it was.
    pub fn take_turn(
        &mut self,
        slot_id: u32,
        insurance_requested: bool,
    ) -> Result<TurnRecord, TurnError> {
        if self.status.is_terminal() {
            return Err(TurnError::SessionTerminal(self.status));
        }

        let turn = self.current_turn;
        let max_turns = self.config.max_turns;
        if turn > max_turns {
            return Err(TurnError::TurnLimitExceeded { turn, max_turns });
        }

        let chosen = self
            .plan
            .turn(turn)
            .and_then(|options| options.option(slot_id))
            .cloned()
            .ok_or(TurnError::InvalidChoice { slot_id, turn })?;

        if insurance_requested {
            if let Some(denial) = insurance_denial(turn, chosen.category(), self.accumulated_reward) {
                return Err(denial.into());
            }
        }

        // Validated: from here on the turn always resolves.
        let insurance_cost = if insurance_requested {
            self.config.premium(self.accumulated_reward)
        } else {
            0.0
        };

        let outcome = if chosen.is_trap() {
            if insurance_requested {
                self.accumulated_reward -= insurance_cost;
                format!(
                    "Trap! But insurance saved you! Insurance cost: -{insurance_cost:.2} tokens."
                )
            } else {
                self.accumulated_reward = 0.0;
                self.is_alive = false;
                format!("Trap! You died on turn {turn}. All rewards lost!")
            }
        } else {
            self.accumulated_reward += chosen.reward();
            let mut text = format!("Safe! Found {:.2} tokens.", chosen.reward());
            if insurance_requested {
                self.accumulated_reward -= insurance_cost;
                text.push_str(&format!(" Insurance cost: -{insurance_cost:.2} tokens."));
            }
            text
        };

        if self.is_alive {
            self.current_turn += 1;
            if self.current_turn > max_turns {
                self.status = SessionStatus::Won;
                self.is_completed = true;
            }
        } else {
            self.status = SessionStatus::Lost;
            self.is_completed = true;
        }

        let record = TurnRecord {
            turn,
            trap_hit: chosen.is_trap(),
            choice: ChosenPath::from(&chosen),
            insurance_used: insurance_requested,
            insurance_cost,
            survived: self.is_alive,
            outcome,
        };
        self.turn_history.push(record.clone());

        Ok(record)
    }

    /// Outcome text for the most recent turn, with the session's standing.
    pub fn last_outcome_summary(&self) -> Option<String> {
        let record = self.turn_history.last()?;
        let suffix = match self.status {
            SessionStatus::InProgress => format!("(Turn {} complete)", record.turn),
            SessionStatus::Won => format!(
                "Victory! You completed all {} turns!",
                self.config.max_turns
            ),
            SessionStatus::Lost => "Game over!".to_string(),
        };
        Some(format!("{} {}", record.outcome, suffix))
    }

    /// Number of turns actually resolved.
    #[inline]
    pub fn turns_played(&self) -> usize {
        self.turn_history.len()
    }
}
