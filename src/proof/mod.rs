//! Provably-Fair Proof System
//!
//! Commit before play, reveal after, verify by regeneration:
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commitment.rs - Canonical plan + SHA-256 commitment        │
//! │  reveal.rs     - Post-game disclosure document              │
//! │  verify.rs     - Independent verification by regeneration   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod reveal;
pub mod verify;

// Re-export key types
pub use commitment::{
    canonicalize, commit, CanonicalPath, CanonicalTurn, CommitmentError, ProvenanceRecord,
};
pub use reveal::{GameSummary, ProvenanceDisclosure, ProvenanceReveal, VERIFICATION_STEPS};
pub use verify::{verify_fairness, VerificationError, VerificationReport, VerifyRequest};
