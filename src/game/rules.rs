//! Game Rules
//!
//! Session-wide configuration and the insurance eligibility rule.

use serde::{Deserialize, Serialize};

use crate::game::path::PathCategory;

/// Default number of turns per session.
pub const DEFAULT_MAX_TURNS: u32 = 6;

/// Default insurance premium as a fraction of the accumulated reward.
pub const DEFAULT_INSURANCE_RATE: f64 = 0.30;

/// Rules a session is played under.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Turns in a plan; surviving all of them wins.
    pub max_turns: u32,
    /// Premium rate charged on the accumulated reward.
    pub insurance_rate: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            insurance_rate: DEFAULT_INSURANCE_RATE,
        }
    }
}

impl GameConfig {
    /// Premium charged for insuring a given accumulated reward.
    #[inline]
    pub fn premium(&self, accumulated_reward: f64) -> f64 {
        self.insurance_rate * accumulated_reward
    }
}

/// Why an insurance request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceDenial {
    /// Insurance is never offered on turn 1.
    #[error("insurance not available on turn 1")]
    FirstTurn,

    /// High-risk paths cannot be insured.
    #[error("insurance not available for high risk high reward paths")]
    HighRiskPath,

    /// Nothing has been accumulated yet.
    #[error("no rewards to insure")]
    NothingToInsure,
}

/// Check insurance eligibility, reporting the first failed condition.
///
/// Conditions are checked in order: turn, category, reward.
pub fn insurance_denial(
    current_turn: u32,
    category: PathCategory,
    accumulated_reward: f64,
) -> Option<InsuranceDenial> {
    if current_turn <= 1 {
        Some(InsuranceDenial::FirstTurn)
    } else if !category.is_insurable() {
        Some(InsuranceDenial::HighRiskPath)
    } else if accumulated_reward <= 0.0 {
        Some(InsuranceDenial::NothingToInsure)
    } else {
        None
    }
}
