//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a JSON object tagged by `"type"`.

use serde::{Deserialize, Serialize};

use crate::game::view::SessionView;
use crate::proof::reveal::ProvenanceReveal;
use crate::proof::verify::{VerificationReport, VerifyRequest};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a new game.
    StartGame(StartGameRequest),

    /// Choose a path for the current turn.
    TakeTurn(TakeTurnRequest),

    /// Fetch the current state without acting.
    GetState {
        /// Target session.
        session_id: String,
    },

    /// Reveal provenance of a completed game.
    Reveal {
        /// Target session.
        session_id: String,
    },

    /// Verify a revealed game.
    Verify(VerifyRequest),

    /// Delete a session.
    EndSession {
        /// Target session.
        session_id: String,
    },

    /// Server health.
    Health,

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Start game request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGameRequest {
    /// Display name.
    pub player_name: String,
    /// Optional client contribution to the seed.
    #[serde(default, alias = "seed")]
    pub client_value: Option<String>,
}

/// Turn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeTurnRequest {
    /// Target session.
    pub session_id: String,
    /// Chosen option's slot id.
    #[serde(alias = "chosen_path_id")]
    pub slot_id: u32,
    /// Buy insurance for this turn.
    #[serde(default)]
    pub insurance: bool,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A game was created.
    GameStarted(GameStartedInfo),

    /// Current or updated game state.
    GameState(SessionView),

    /// Provenance of a completed game.
    Reveal(ProvenanceReveal),

    /// Fairness check result.
    Verification(VerificationReport),

    /// Session deleted.
    SessionEnded {
        /// Deleted session.
        session_id: String,
    },

    /// Server health.
    Health(HealthInfo),

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        client_timestamp: u64,
        /// Server time (unix millis).
        server_time: i64,
    },

    /// Error response.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Why.
        reason: String,
    },
}

/// Game start payload: initial view plus the published commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStartedInfo {
    /// Initial state.
    pub state: SessionView,
    /// Commitment details.
    pub provenance: StartProvenance,
}

/// Provenance published at game start (no secrets).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartProvenance {
    /// Commitment to the full plan.
    pub commitment_hash: String,
    /// Client value that went into the seed.
    pub client_value_used: String,
    /// Session id that went into the seed.
    pub session_id: String,
}

/// Health payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthInfo {
    /// Always "healthy" when answered.
    pub status: String,
    /// Stored sessions.
    pub active_sessions: usize,
    /// Dev mode exposes trap flags.
    pub dev_mode: bool,
    /// Always true.
    pub provably_fair: bool,
    /// Server version.
    pub version: String,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unknown session id.
    SessionNotFound,
    /// Session already won or lost.
    SessionTerminal,
    /// Turn counter past the plan.
    TurnLimitExceeded,
    /// No such option this turn.
    InvalidChoice,
    /// Insurance refused.
    InsuranceNotAllowed,
    /// Reveal requested before completion.
    RevealBeforeCompletion,
    /// Verification input missing a required field.
    VerificationInputMalformed,
    /// Message could not be parsed.
    InvalidMessage,
    /// Connection limit reached.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Build an error message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError {
            code,
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_json_roundtrip() {
        let msg = ClientMessage::TakeTurn(TakeTurnRequest {
            session_id: "abc".into(),
            slot_id: 2,
            insurance: true,
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"take_turn""#));
        assert_eq!(ClientMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_start_game_defaults() {
        let msg = ClientMessage::from_json(r#"{"type":"start_game","player_name":"ada"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::StartGame(StartGameRequest {
                player_name: "ada".into(),
                client_value: None,
            })
        );

        let msg =
            ClientMessage::from_json(r#"{"type":"start_game","player_name":"ada","seed":"x"}"#)
                .unwrap();
        match msg {
            ClientMessage::StartGame(req) => assert_eq!(req.client_value.as_deref(), Some("x")),
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_take_turn_aliases() {
        let msg = ClientMessage::from_json(
            r#"{"type":"take_turn","session_id":"s","chosen_path_id":1}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::TakeTurn(TakeTurnRequest {
                session_id: "s".into(),
                slot_id: 1,
                insurance: false,
            })
        );
    }

    #[test]
    fn test_unit_variants() {
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"health"}"#).unwrap(),
            ClientMessage::Health
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"ping","timestamp":7}"#).unwrap(),
            ClientMessage::Ping { timestamp: 7 }
        );
    }

    #[test]
    fn test_verify_message() {
        let msg = ClientMessage::from_json(
            r#"{"type":"verify","server_seed":"s","session_id":"id","commitment_hash":"h"}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Verify(req) => {
                assert_eq!(req.server_secret.as_deref(), Some("s"));
                assert!(req.revealed_plan.is_none());
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_error_serialization() {
        let msg = ServerMessage::error(ErrorCode::InsuranceNotAllowed, "no rewards to insure");
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains("insurance_not_allowed"));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_health_shape() {
        let msg = ServerMessage::Health(HealthInfo {
            status: "healthy".into(),
            active_sessions: 3,
            dev_mode: false,
            provably_fair: true,
            version: "0.1.0".into(),
        });
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "health");
        assert_eq!(value["active_sessions"], 3);
        assert_eq!(value["provably_fair"], true);
    }
}
