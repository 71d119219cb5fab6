//! Outcome Generation
//!
//! Expands a combined seed into the full multi-turn plan. One RNG stream is
//! consumed across all turns, never reset, in a fixed draw order:
//!
//! 1. option count from {3, 4}
//! 2. the guaranteed standard option (reward, then trap flag)
//! 3. remaining options (category, reward, trap flag) until the count is met
//! 4. shuffle, then dense slot ids in shuffled order
//!
//! Reordering any draw changes every downstream value and breaks
//! verification of published commitments.

use crate::core::rng::DeterministicRng;
use crate::game::path::{round_to_cents, GameOutcomePlan, PathCategory, PathOption, TurnOutcomeSet};

/// Possible option counts per turn.
pub const OPTION_COUNTS: [usize; 2] = [3, 4];

/// Generate a complete plan from a combined seed.
pub fn generate_plan(combined_seed: &str, turn_count: u32) -> GameOutcomePlan {
    let mut rng = DeterministicRng::from_seed_str(combined_seed);
    let turns = (0..turn_count).map(|_| generate_turn(&mut rng)).collect();
    GameOutcomePlan::new(turns)
}

/// Generate one turn, consuming the shared stream.
fn generate_turn(rng: &mut DeterministicRng) -> TurnOutcomeSet {
    let total = rng.choose(&OPTION_COUNTS).copied().unwrap_or(OPTION_COUNTS[0]);

    let mut drafts = Vec::with_capacity(total);
    drafts.push(draw_option(rng, PathCategory::Standard));

    while drafts.len() < total {
        let category = PathCategory::ALL[rng.weighted_index(&PathCategory::WEIGHTS)];
        drafts.push(draw_option(rng, category));
    }

    rng.shuffle(&mut drafts);

    let options = drafts
        .into_iter()
        .enumerate()
        .map(|(slot, (category, reward, is_trap))| {
            PathOption::new(slot as u32, category, reward, is_trap)
        })
        .collect();

    TurnOutcomeSet::new(options)
}

/// Draw reward then trap flag for a category.
fn draw_option(rng: &mut DeterministicRng, category: PathCategory) -> (PathCategory, f64, bool) {
    let (lo, hi) = category.reward_range();
    let reward = round_to_cents(rng.uniform(lo, hi));
    let is_trap = rng.chance(category.trap_probability());
    (category, reward, is_trap)
}
