//! Provenance Disclosure
//!
//! What a completed session publishes so a third party can verify it.

use serde::{Deserialize, Serialize};

use crate::game::state::{GameSession, TurnRecord};
use crate::proof::commitment::{canonicalize, CanonicalTurn};
use crate::proof::verify::VerifyRequest;

/// Fixed instructions shipped with every reveal.
pub const VERIFICATION_STEPS: [&str; 4] = [
    "Use the server_secret and client_value to regenerate the combined_seed",
    "Use combined_seed to regenerate all game paths",
    "Compare regenerated paths with revealed paths - they should match exactly",
    "Verify that commitment_hash matches hash of revealed data + server_secret",
];

/// Secret material and the canonical plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceDisclosure {
    /// Server secret, now public.
    pub server_secret: String,
    /// Client value as supplied.
    pub client_value: Option<String>,
    /// Seed that generated the plan.
    pub combined_seed: String,
    /// Commitment published at start.
    pub commitment_hash: String,
    /// Canonical plan, every turn.
    pub revealed_plan: Vec<CanonicalTurn>,
}

/// How the game went.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Player display name.
    pub player: String,
    /// Final accumulated reward.
    pub final_rewards: f64,
    /// Alive at the end.
    pub survived: bool,
    /// Resolved turn count.
    pub turns_played: usize,
    /// Full turn history.
    pub history: Vec<TurnRecord>,
}

/// Full reveal document for a completed session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceReveal {
    /// Session id.
    pub session_id: String,
    /// Secrets and plan.
    pub provenance: ProvenanceDisclosure,
    /// Outcome summary.
    pub game_summary: GameSummary,
    /// How to verify.
    pub verification_instructions: Vec<String>,
}

impl ProvenanceReveal {
    /// Build the reveal document. Callers gate on completion.
    pub fn from_session(session: &GameSession) -> Self {
        let record = &session.provenance;

        Self {
            session_id: session.session_id.clone(),
            provenance: ProvenanceDisclosure {
                server_secret: record.server_secret.clone(),
                client_value: record.client_value.clone(),
                combined_seed: record.combined_seed.clone(),
                commitment_hash: record.commitment_hash.clone(),
                revealed_plan: canonicalize(&session.plan),
            },
            game_summary: GameSummary {
                player: session.player_name.clone(),
                final_rewards: session.accumulated_reward,
                survived: session.is_alive,
                turns_played: session.turns_played(),
                history: session.turn_history.clone(),
            },
            verification_instructions: VERIFICATION_STEPS
                .iter()
                .map(|step| step.to_string())
                .collect(),
        }
    }

    /// The verification request a third party would submit for this reveal.
    pub fn to_verify_request(&self) -> Result<VerifyRequest, serde_json::Error> {
        Ok(VerifyRequest {
            server_secret: Some(self.provenance.server_secret.clone()),
            client_value: self.provenance.client_value.clone(),
            session_id: Some(self.session_id.clone()),
            revealed_plan: Some(serde_json::to_value(&self.provenance.revealed_plan)?),
            commitment_hash: Some(self.provenance.commitment_hash.clone()),
        })
    }
}
