//! Game Logic Module
//!
//! Outcome generation and session rules. Everything except secret
//! generation and timestamps is deterministic.
//!
//! ## Module Structure
//!
//! - `path`: Path options, turn sets and outcome plans
//! - `generator`: Seed to plan expansion
//! - `rules`: Game configuration and insurance eligibility
//! - `state`: Session aggregate and turn resolution
//! - `view`: Client-facing projection

pub mod generator;
pub mod path;
pub mod rules;
pub mod state;
pub mod view;

// Re-export key types
pub use generator::generate_plan;
pub use path::{GameOutcomePlan, PathCategory, PathOption, TurnOutcomeSet};
pub use rules::{GameConfig, InsuranceDenial};
pub use state::{ChosenPath, GameSession, SessionId, SessionStatus, TurnError, TurnRecord};
pub use view::{OptionView, SessionView};
