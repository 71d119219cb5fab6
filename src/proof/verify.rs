//! Verification API
//!
//! Independent fairness check by regeneration. Anyone holding a revealed
//! session can re-derive the seed, regenerate the plan, and confirm both the
//! plan and the published commitment.
//!
//! The claimed plan is kept as raw JSON. It is checked for the disclosed
//! fields, then compared structurally against the regenerated plan, so a
//! claim carrying extra keys does not match.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::seed::derive_combined_seed;
use crate::game::generator::generate_plan;
use crate::proof::commitment::{canonicalize, commit_canonical, CommitmentError};

/// Fairness verification input.
///
/// Every field is optional on the wire; [`VerifyRequest::validate`] reports
/// the first required one missing. Field aliases accept the key names used
/// by published reveal documents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Revealed server secret.
    #[serde(default, alias = "server_seed")]
    pub server_secret: Option<String>,
    /// Client value, if any was supplied at start.
    #[serde(default, alias = "client_seed")]
    pub client_value: Option<String>,
    /// Session id the seed was derived with.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Claimed canonical plan, as sent.
    #[serde(default, alias = "all_paths_revealed")]
    pub revealed_plan: Option<Value>,
    /// Commitment published at session start.
    #[serde(default)]
    pub commitment_hash: Option<String>,
}

/// Borrowed view of a request that passed validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedRequest<'a> {
    /// Server secret.
    pub server_secret: &'a str,
    /// Optional client value.
    pub client_value: Option<&'a str>,
    /// Session id.
    pub session_id: &'a str,
    /// Claimed plan, shape-checked.
    pub revealed_plan: &'a Value,
    /// Claimed commitment.
    pub commitment_hash: &'a str,
}

impl VerifyRequest {
    /// Check required fields, in declaration order, then the plan's shape.
    pub fn validate(&self) -> Result<ValidatedRequest<'_>, VerificationError> {
        let server_secret = self
            .server_secret
            .as_deref()
            .ok_or_else(|| VerificationError::MissingField("server_secret".into()))?;
        let session_id = self
            .session_id
            .as_deref()
            .ok_or_else(|| VerificationError::MissingField("session_id".into()))?;
        let revealed_plan = self
            .revealed_plan
            .as_ref()
            .filter(|plan| !plan.is_null())
            .ok_or_else(|| VerificationError::MissingField("revealed_plan".into()))?;
        let commitment_hash = self
            .commitment_hash
            .as_deref()
            .ok_or_else(|| VerificationError::MissingField("commitment_hash".into()))?;

        check_plan_shape(revealed_plan)?;

        Ok(ValidatedRequest {
            server_secret,
            client_value: self.client_value.as_deref(),
            session_id,
            revealed_plan,
            commitment_hash,
        })
    }
}

// =============================================================================
// PLAN SHAPE
// =============================================================================

fn check_plan_shape(plan: &Value) -> Result<(), VerificationError> {
    let turns = expect_kind(plan, "revealed_plan", "array", Value::as_array)?;

    for (i, turn) in turns.iter().enumerate() {
        let at = format!("revealed_plan[{i}]");
        let turn = expect_kind(turn, &at, "object", Value::as_object)?;

        let number = require(turn, &at, "turn")?;
        expect_kind(number, &format!("{at}.turn"), "integer", Value::as_u64)?;

        let paths = require(turn, &at, "paths")?;
        let paths = expect_kind(paths, &format!("{at}.paths"), "array", Value::as_array)?;

        for (j, path) in paths.iter().enumerate() {
            let at = format!("{at}.paths[{j}]");
            let path = expect_kind(path, &at, "object", Value::as_object)?;
            let is_trap = require(path, &at, "is_trap")?;
            let reward = require(path, &at, "reward")?;
            let category = require(path, &at, "type")?;

            expect_kind(is_trap, &format!("{at}.is_trap"), "boolean", Value::as_bool)?;
            expect_kind(reward, &format!("{at}.reward"), "number", Value::as_f64)?;
            expect_kind(category, &format!("{at}.type"), "string", Value::as_str)?;
        }
    }

    Ok(())
}

fn require<'a>(
    object: &'a serde_json::Map<String, Value>,
    at: &str,
    key: &str,
) -> Result<&'a Value, VerificationError> {
    object
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| VerificationError::MissingField(format!("{at}.{key}")))
}

fn expect_kind<'a, T>(
    value: &'a Value,
    at: &str,
    expected: &'static str,
    read: impl FnOnce(&'a Value) -> Option<T>,
) -> Result<T, VerificationError> {
    read(value).ok_or_else(|| VerificationError::WrongType {
        field: at.to_string(),
        expected,
    })
}

/// Structural JSON equality. Numbers compare by value, so `1` equals `1.0`.
fn same_json(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_json(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| same_json(x, y)))
        }
        _ => a == b,
    }
}

// =============================================================================
// VERIFICATION
// =============================================================================

/// Outcome of a fairness check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Regenerated plan equals the claimed plan.
    pub plan_matches: bool,
    /// Recomputed commitment equals the claimed one.
    pub commitment_matches: bool,
    /// Both checks passed.
    pub game_is_fair: bool,
    /// Seed re-derived from the inputs.
    pub regenerated_combined_seed: String,
    /// Commitment recomputed from the regenerated plan.
    pub recreated_commitment_hash: String,
    /// Number of turns regenerated.
    pub turns_verified: usize,
}

/// Errors that prevent verification from running.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// A required input was absent. Nested fields carry their path.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A claimed plan field had the wrong JSON type.
    #[error("field {field} must be a {expected}")]
    WrongType {
        /// Path of the offending field.
        field: String,
        /// Expected JSON type.
        expected: &'static str,
    },

    /// The regenerated plan could not be committed.
    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}

/// Verify a revealed session.
///
/// Pure: the claimed plan is only compared, never trusted. A mismatch is a
/// report with `game_is_fair == false`, not an error.
pub fn verify_fairness(
    request: &VerifyRequest,
    turn_count: u32,
) -> Result<VerificationReport, VerificationError> {
    let input = request.validate()?;

    let combined_seed = derive_combined_seed(input.server_secret, input.client_value, input.session_id);
    let regenerated = canonicalize(&generate_plan(&combined_seed, turn_count));

    let regenerated_value = serde_json::to_value(&regenerated).map_err(CommitmentError::from)?;
    let plan_matches = same_json(&regenerated_value, input.revealed_plan);
    let recreated = commit_canonical(&regenerated, input.server_secret)?;
    let commitment_matches = recreated == input.commitment_hash;

    Ok(VerificationReport {
        plan_matches,
        commitment_matches,
        game_is_fair: plan_matches && commitment_matches,
        regenerated_combined_seed: combined_seed,
        recreated_commitment_hash: recreated,
        turns_verified: regenerated.len(),
    })
}
