//! Path Options and Outcome Plans
//!
//! The immutable outcome data a session is committed to: one option per
//! choosable path, grouped per turn, grouped per game.

use serde::{Deserialize, Serialize};

// =============================================================================
// PATH CATEGORY
// =============================================================================

/// Risk tier of a path option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathCategory {
    /// Low risk, low reward.
    Standard,
    /// Medium risk, medium reward.
    Premium,
    /// High risk, high reward. Never insurable.
    Hrhr,
}

impl PathCategory {
    /// All categories, in weighted-draw order.
    pub const ALL: [PathCategory; 3] = [
        PathCategory::Standard,
        PathCategory::Premium,
        PathCategory::Hrhr,
    ];

    /// Draw weights, aligned with [`PathCategory::ALL`].
    pub const WEIGHTS: [f64; 3] = [0.60, 0.25, 0.15];

    /// Reward range `[lo, hi)` drawn before rounding.
    pub fn reward_range(self) -> (f64, f64) {
        match self {
            PathCategory::Standard => (0.10, 0.25),
            PathCategory::Premium => (0.30, 0.50),
            PathCategory::Hrhr => (0.50, 0.75),
        }
    }

    /// Probability that an option of this category is a trap.
    pub fn trap_probability(self) -> f64 {
        match self {
            PathCategory::Standard => 0.15,
            PathCategory::Premium => 0.30,
            PathCategory::Hrhr => 0.50,
        }
    }

    /// Human-readable risk level.
    pub fn risk_level(self) -> &'static str {
        match self {
            PathCategory::Standard => "Low",
            PathCategory::Premium => "Medium",
            PathCategory::Hrhr => "High",
        }
    }

    /// Human-readable trap chance.
    pub fn trap_chance_label(self) -> &'static str {
        match self {
            PathCategory::Standard => "15%",
            PathCategory::Premium => "30%",
            PathCategory::Hrhr => "50%",
        }
    }

    /// Whether insurance may ever cover this category.
    #[inline]
    pub fn is_insurable(self) -> bool {
        self != PathCategory::Hrhr
    }

    /// Wire name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            PathCategory::Standard => "standard",
            PathCategory::Premium => "premium",
            PathCategory::Hrhr => "hrhr",
        }
    }
}

impl std::fmt::Display for PathCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to 2 decimal places, correctly rounded from the exact binary value.
///
/// Formats with 2 fractional digits and parses back, which yields the double
/// nearest to the rounded decimal.
pub fn round_to_cents(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}

// =============================================================================
// PATH OPTION
// =============================================================================

/// One choosable path for one turn. Immutable once generated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathOption {
    slot_id: u32,
    category: PathCategory,
    reward: f64,
    is_trap: bool,
}

impl PathOption {
    pub(crate) fn new(slot_id: u32, category: PathCategory, reward: f64, is_trap: bool) -> Self {
        Self {
            slot_id,
            category,
            reward,
            is_trap,
        }
    }

    /// Position of this option within its turn (0..k-1).
    #[inline]
    pub fn slot_id(&self) -> u32 {
        self.slot_id
    }

    /// Risk tier.
    #[inline]
    pub fn category(&self) -> PathCategory {
        self.category
    }

    /// Reward, already rounded to 2 decimals.
    #[inline]
    pub fn reward(&self) -> f64 {
        self.reward
    }

    /// Whether choosing this option without insurance ends the game.
    #[inline]
    pub fn is_trap(&self) -> bool {
        self.is_trap
    }
}

// =============================================================================
// TURN OUTCOME SET
// =============================================================================

/// The 3 or 4 options offered in a single turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnOutcomeSet {
    options: Vec<PathOption>,
}

impl TurnOutcomeSet {
    pub(crate) fn new(options: Vec<PathOption>) -> Self {
        Self { options }
    }

    /// Options in slot order.
    #[inline]
    pub fn options(&self) -> &[PathOption] {
        &self.options
    }

    /// Look up an option by slot id.
    pub fn option(&self, slot_id: u32) -> Option<&PathOption> {
        self.options.iter().find(|o| o.slot_id == slot_id)
    }

    /// Number of options.
    #[inline]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// True if the turn has no options.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Number of options in a category.
    pub fn count_of(&self, category: PathCategory) -> usize {
        self.options.iter().filter(|o| o.category == category).count()
    }
}

// =============================================================================
// GAME OUTCOME PLAN
// =============================================================================

/// Every turn's options for a whole session, generated from one seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameOutcomePlan {
    turns: Vec<TurnOutcomeSet>,
}

impl GameOutcomePlan {
    pub(crate) fn new(turns: Vec<TurnOutcomeSet>) -> Self {
        Self { turns }
    }

    /// Options for a 1-based turn number.
    pub fn turn(&self, turn: u32) -> Option<&TurnOutcomeSet> {
        let index = usize::try_from(turn).ok()?.checked_sub(1)?;
        self.turns.get(index)
    }

    /// All turns in order.
    #[inline]
    pub fn turns(&self) -> &[TurnOutcomeSet] {
        &self.turns
    }

    /// Number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True if the plan has no turns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
