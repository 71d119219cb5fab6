//! Plan Commitment
//!
//! Commit to the full outcome plan before the first turn. The commitment is
//! the SHA-256 of a canonical JSON document binding every turn's options to
//! the server secret:
//!
//! ```text
//! {"all_paths": [{"paths": [{"is_trap": .., "reward": .., "type": ..}, ..], "turn": 1}, ..],
//!  "server_seed": "<secret>"}
//! ```
//!
//! Slot ids are not part of the document; option order within a turn is.

use serde::{Deserialize, Serialize};

use crate::core::hash::{sha256_hex, to_canonical_json};
use crate::core::seed::derive_combined_seed;
use crate::game::generator::generate_plan;
use crate::game::path::{GameOutcomePlan, PathCategory};

/// Errors producing a commitment.
#[derive(Debug, thiserror::Error)]
pub enum CommitmentError {
    /// The canonical document could not be serialized.
    #[error("failed to canonicalize plan: {0}")]
    Canonicalization(#[from] serde_json::Error),
}

// =============================================================================
// CANONICAL FORM
// =============================================================================

/// One option as it appears in the canonical document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPath {
    /// Trap flag.
    pub is_trap: bool,
    /// Rounded reward.
    pub reward: f64,
    /// Category, under its wire key.
    #[serde(rename = "type")]
    pub category: PathCategory,
}

/// One turn as it appears in the canonical document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTurn {
    /// Options in slot order.
    pub paths: Vec<CanonicalPath>,
    /// 1-based turn number.
    pub turn: u32,
}

#[derive(Serialize)]
struct CommitmentDocument<'a> {
    all_paths: &'a [CanonicalTurn],
    server_seed: &'a str,
}

/// Lower a plan to its canonical form.
pub fn canonicalize(plan: &GameOutcomePlan) -> Vec<CanonicalTurn> {
    plan.turns()
        .iter()
        .zip(1u32..)
        .map(|(set, turn)| CanonicalTurn {
            paths: set
                .options()
                .iter()
                .map(|o| CanonicalPath {
                    is_trap: o.is_trap(),
                    reward: o.reward(),
                    category: o.category(),
                })
                .collect(),
            turn,
        })
        .collect()
}

/// Canonical JSON text hashed by [`commit`].
pub fn commitment_text(
    canonical: &[CanonicalTurn],
    server_secret: &str,
) -> Result<String, CommitmentError> {
    let document = CommitmentDocument {
        all_paths: canonical,
        server_seed: server_secret,
    };
    Ok(to_canonical_json(&document)?)
}

/// Commitment over an already-canonical plan.
pub fn commit_canonical(
    canonical: &[CanonicalTurn],
    server_secret: &str,
) -> Result<String, CommitmentError> {
    let text = commitment_text(canonical, server_secret)?;
    Ok(sha256_hex(text.as_bytes()))
}

/// Commit to a plan: lowercase hex SHA-256 of its canonical text.
pub fn commit(plan: &GameOutcomePlan, server_secret: &str) -> Result<String, CommitmentError> {
    commit_canonical(&canonicalize(plan), server_secret)
}

// =============================================================================
// PROVENANCE
// =============================================================================

/// Everything needed to later prove a session's plan was fixed up front.
///
/// The secret is held server-side until the session completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// 64 hex chars from the OS CSPRNG.
    pub server_secret: String,
    /// Client value exactly as supplied.
    pub client_value: Option<String>,
    /// Seed that generated the plan.
    pub combined_seed: String,
    /// Commitment published at session start.
    pub commitment_hash: String,
}

impl ProvenanceRecord {
    /// Derive the seed, generate the plan, and commit to it.
    ///
    /// The only place a plan is ever created for a session.
    pub fn establish(
        server_secret: String,
        client_value: Option<String>,
        session_id: &str,
        turn_count: u32,
    ) -> Result<(GameOutcomePlan, Self), CommitmentError> {
        let combined_seed =
            derive_combined_seed(&server_secret, client_value.as_deref(), session_id);
        let plan = generate_plan(&combined_seed, turn_count);
        let commitment_hash = commit(&plan, &server_secret)?;

        Ok((
            plan,
            Self {
                server_secret,
                client_value,
                combined_seed,
                commitment_hash,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
    const SESSION: &str = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";

    #[test]
    fn test_canonical_text_layout() {
        let plan = generate_plan("abc", 1);
        let text = commitment_text(&canonicalize(&plan), "abc").unwrap();
        assert_eq!(
            text,
            r#"{"all_paths": [{"paths": [{"is_trap": false, "reward": 0.13, "type": "standard"}, {"is_trap": false, "reward": 0.48, "type": "premium"}, {"is_trap": false, "reward": 0.3, "type": "premium"}, {"is_trap": false, "reward": 0.21, "type": "standard"}], "turn": 1}], "server_seed": "abc"}"#
        );
    }

    #[test]
    fn test_golden_commitment_abc() {
        let plan = generate_plan("abc", 6);
        assert_eq!(
            commit(&plan, "abc").unwrap(),
            "9a2a6cc65c22b12c6e6809b47f54763d3009e5e156835f61f76cb91213e7ccc4"
        );
    }

    #[test]
    fn test_golden_provenance() {
        let (plan, record) =
            ProvenanceRecord::establish(SECRET.to_string(), None, SESSION, 6).unwrap();
        assert_eq!(plan.len(), 6);
        assert_eq!(record.client_value, None);
        assert_eq!(
            record.combined_seed,
            "11a98253b53a85bdea897cc9453cdabd21442bb71bb7a2de6cc874fc04b59d83"
        );
        assert_eq!(
            record.commitment_hash,
            "11bf4ce98b0219aa7f88c2cac09f51ee5b83b8e214fff2d82a0120c8d23cf078"
        );

        let (_, lucky) =
            ProvenanceRecord::establish(SECRET.to_string(), Some("lucky".into()), SESSION, 6)
                .unwrap();
        assert_eq!(lucky.client_value.as_deref(), Some("lucky"));
        assert_eq!(
            lucky.combined_seed,
            "1d6290bec854674315927770830e98cffe8036592d72d7994df04100c12bb7fa"
        );
        assert_eq!(
            lucky.commitment_hash,
            "1de7ac6e421b5a1c45706540c233feee1a506fc393ffba42ecb85893039df718"
        );
    }

    #[test]
    fn test_empty_client_value_uses_default() {
        let (_, absent) = ProvenanceRecord::establish(SECRET.into(), None, SESSION, 6).unwrap();
        let (_, empty) =
            ProvenanceRecord::establish(SECRET.into(), Some(String::new()), SESSION, 6).unwrap();
        assert_eq!(absent.commitment_hash, empty.commitment_hash);
        // Stored as supplied
        assert_eq!(empty.client_value, Some(String::new()));
    }

    #[test]
    fn test_non_ascii_secret_commitment() {
        let canonical = canonicalize(&generate_plan("abc", 1));
        let secret = "cl\u{e9}\u{1F600}\u{7f}";

        let text = commitment_text(&canonical, secret).unwrap();
        assert!(text.ends_with(r#""server_seed": "cl\u00e9\ud83d\ude00\u007f"}"#));
        assert_eq!(
            commit_canonical(&canonical, secret).unwrap(),
            "543c114ef234c5736e718add9478a68751868d75f6ae822aabd2d8b495849273"
        );
    }

    #[test]
    fn test_commitment_binds_secret() {
        let plan = generate_plan("abc", 6);
        assert_ne!(commit(&plan, "abc").unwrap(), commit(&plan, "abd").unwrap());
    }

    #[test]
    fn test_commitment_binds_option_order() {
        let mut canonical = canonicalize(&generate_plan("abc", 6));
        let baseline = commit_canonical(&canonical, "abc").unwrap();
        canonical[0].paths.swap(0, 1);
        assert_ne!(commit_canonical(&canonical, "abc").unwrap(), baseline);
    }

    #[test]
    fn test_canonical_turns_are_one_based() {
        let canonical = canonicalize(&generate_plan("abc", 6));
        let turns: Vec<u32> = canonical.iter().map(|t| t.turn).collect();
        assert_eq!(turns, vec![1, 2, 3, 4, 5, 6]);
    }

    proptest! {
        #[test]
        fn prop_single_field_change_breaks_commitment(
            turn in 0usize..6,
            field in 0u8..3,
        ) {
            let mut canonical = canonicalize(&generate_plan("abc", 6));
            let baseline = commit_canonical(&canonical, "abc").unwrap();

            let path = &mut canonical[turn].paths[0];
            match field {
                0 => path.is_trap = !path.is_trap,
                1 => path.reward += 0.01,
                _ => path.category = match path.category {
                    PathCategory::Hrhr => PathCategory::Standard,
                    _ => PathCategory::Hrhr,
                },
            }

            prop_assert_ne!(commit_canonical(&canonical, "abc").unwrap(), baseline);
        }
    }
}
