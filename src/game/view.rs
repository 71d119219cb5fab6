//! Client-Facing Session View
//!
//! Response projection of a session. Per-response flags (insurance
//! availability, previews) are computed here; the stored plan never
//! carries them. Trap flags of upcoming options are only exposed in dev
//! mode.

use serde::{Deserialize, Serialize};

use crate::game::path::{round_to_cents, PathCategory, PathOption};
use crate::game::rules::insurance_denial;
use crate::game::state::{GameSession, SessionStatus, TurnRecord};

/// One selectable option as shown to the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionView {
    /// Slot to send back in a turn request.
    #[serde(rename = "id")]
    pub slot_id: u32,
    /// Category.
    #[serde(rename = "type")]
    pub category: PathCategory,
    /// Reward, 2 decimals.
    pub reward: f64,
    /// "Low", "Medium" or "High".
    pub risk_level: String,
    /// "15%", "30%" or "50%".
    pub trap_chance: String,
    /// Insurance may be requested with this option.
    pub allows_insurance: bool,
    /// Only present in dev mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trap: Option<bool>,
}

impl OptionView {
    fn project(option: &PathOption, session: &GameSession, dev_mode: bool) -> Self {
        let category = option.category();
        Self {
            slot_id: option.slot_id(),
            category,
            reward: round_to_cents(option.reward()),
            risk_level: category.risk_level().to_string(),
            trap_chance: category.trap_chance_label().to_string(),
            allows_insurance: insurance_denial(
                session.current_turn,
                category,
                session.accumulated_reward,
            )
            .is_none(),
            is_trap: dev_mode.then(|| option.is_trap()),
        }
    }
}

/// Snapshot of a session as returned to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    /// Session id.
    pub session_id: String,
    /// Player display name.
    pub player_name: String,
    /// Current turn.
    pub turn: u32,
    /// Turns per game.
    pub max_turns: u32,
    /// Accumulated reward, 2 decimals.
    pub rewards: f64,
    /// Player alive.
    pub alive: bool,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Insurance could be bought this turn for some option.
    pub can_use_insurance: bool,
    /// Premium if insurance were bought now.
    pub insurance_cost_preview: Option<f64>,
    /// Options for the current turn (empty once terminal).
    pub path_options: Vec<OptionView>,
    /// Outcome text of the latest action.
    pub last_outcome: String,
    /// Resolved turns.
    pub history: Vec<TurnRecord>,
}

impl SessionView {
    /// Project a session.
    pub fn build(session: &GameSession, last_outcome: impl Into<String>, dev_mode: bool) -> Self {
        let can_use_insurance = session.current_turn > 1
            && session.status == SessionStatus::InProgress
            && session.accumulated_reward > 0.0;

        let insurance_cost_preview = can_use_insurance
            .then(|| round_to_cents(session.config.premium(session.accumulated_reward)));

        let path_options = session
            .current_options()
            .map(|set| {
                set.options()
                    .iter()
                    .map(|o| OptionView::project(o, session, dev_mode))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            session_id: session.session_id.clone(),
            player_name: session.player_name.clone(),
            turn: session.current_turn,
            max_turns: session.config.max_turns,
            rewards: round_to_cents(session.accumulated_reward),
            alive: session.is_alive,
            status: session.status,
            can_use_insurance,
            insurance_cost_preview,
            path_options,
            last_outcome: last_outcome.into(),
            history: session.turn_history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::GameConfig;

    const SECRET: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
    const SESSION: &str = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";

    fn session() -> GameSession {
        GameSession::with_secret(
            SESSION.into(),
            "ada".into(),
            SECRET.into(),
            None,
            GameConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_first_turn_view() {
        let view = SessionView::build(&session(), "Welcome", false);

        assert_eq!(view.turn, 1);
        assert_eq!(view.max_turns, 6);
        assert_eq!(view.rewards, 0.0);
        assert!(!view.can_use_insurance);
        assert_eq!(view.insurance_cost_preview, None);
        assert_eq!(view.path_options.len(), 3);
        assert!(view.path_options.iter().all(|o| !o.allows_insurance));
        assert!(view.path_options.iter().all(|o| o.is_trap.is_none()));
        assert_eq!(view.path_options[2].risk_level, "High");
        assert_eq!(view.path_options[2].trap_chance, "50%");
    }

    #[test]
    fn test_insurance_flags_after_reward() {
        let mut session = session();
        for slot in [0, 0, 1, 0, 0] {
            session.take_turn(slot, false).unwrap();
        }
        let view = SessionView::build(&session, "", false);

        assert!(view.can_use_insurance);
        assert_eq!(
            view.insurance_cost_preview,
            Some(round_to_cents(0.3 * session.accumulated_reward))
        );
        // t6: [std .18, hrhr .59, std .13]
        let flags: Vec<bool> = view.path_options.iter().map(|o| o.allows_insurance).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn test_dev_mode_exposes_traps() {
        let view = SessionView::build(&session(), "", true);
        let traps: Vec<Option<bool>> = view.path_options.iter().map(|o| o.is_trap).collect();
        assert_eq!(traps, vec![Some(false), Some(false), Some(true)]);
    }

    #[test]
    fn test_terminal_view_has_no_options() {
        let mut session = session();
        session.take_turn(2, false).unwrap();
        let view = SessionView::build(&session, "done", false);

        assert_eq!(view.status, SessionStatus::Lost);
        assert!(!view.alive);
        assert!(view.path_options.is_empty());
        assert!(!view.can_use_insurance);
        assert_eq!(view.history.len(), 1);
    }

    #[test]
    fn test_option_wire_shape() {
        let view = SessionView::build(&session(), "", false);
        let json = serde_json::to_value(&view.path_options[0]).unwrap();

        assert_eq!(json["id"], 0);
        assert_eq!(json["type"], "standard");
        assert_eq!(json["reward"], 0.12);
        assert!(json.get("is_trap").is_none());
    }
}
