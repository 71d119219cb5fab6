//! # Cave Explorer Server
//!
//! Provably-fair, turn-based path game. Every outcome of a session is
//! generated and committed to before the first turn; after the game the
//! secret is revealed and anyone can regenerate and check the plan.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   CAVE EXPLORER SERVER                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                 │
//! │  ├── rng.rs      - Frozen MT19937 PRNG                      │
//! │  ├── hash.rs     - SHA-256 and canonical JSON               │
//! │  └── seed.rs     - Server secret and seed derivation        │
//! │                                                             │
//! │  game/           - Game logic                               │
//! │  ├── path.rs     - Path options and outcome plans           │
//! │  ├── generator.rs- Seed to plan expansion                   │
//! │  ├── rules.rs    - Config and insurance eligibility         │
//! │  ├── state.rs    - Session state machine                    │
//! │  └── view.rs     - Client-facing projection                 │
//! │                                                             │
//! │  proof/          - Commit / reveal / verify                 │
//! │                                                             │
//! │  network/        - Networking (non-deterministic)           │
//! │  ├── store.rs    - Session storage                          │
//! │  ├── session.rs  - Session manager                          │
//! │  ├── protocol.rs - Message types                            │
//! │  └── server.rs   - WebSocket server                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! Given the same server secret, client value and session id, `core/`,
//! `game::generator` and `proof/` produce **identical plans and
//! commitments** on any platform. The PRNG and canonical JSON are frozen
//! protocol; golden-vector tests pin them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod proof;

// Re-export commonly used types
pub use core::rng::{DeterministicRng, RNG_PROTOCOL};
pub use core::seed::{derive_combined_seed, generate_server_secret};
pub use game::generator::generate_plan;
pub use game::rules::GameConfig;
pub use game::state::{GameSession, SessionStatus, TurnRecord};
pub use proof::commitment::commit;
pub use proof::verify::{verify_fairness, VerifyRequest};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
