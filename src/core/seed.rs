//! Seed Derivation
//!
//! Combines the server secret, the player's optional client value and the
//! session id into the single seed that drives outcome generation.

use rand::rngs::OsRng;
use rand::RngCore;

use super::hash::sha256_hex;

/// Substituted when the player supplies no client value (or an empty one).
///
/// Part of the fairness protocol: verifiers must use the same sentinel.
pub const DEFAULT_CLIENT_SEED: &str = "default_client_seed";

/// Separator between the three seed components.
pub const SEED_SEPARATOR: char = ':';

/// Server secret size in bytes (256 bits).
pub const SERVER_SECRET_BYTES: usize = 32;

/// Generate a fresh server secret from the OS CSPRNG.
///
/// Returns 64 lowercase hex characters.
pub fn generate_server_secret() -> String {
    let mut bytes = [0u8; SERVER_SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Resolve the client value actually fed into derivation.
pub fn effective_client_seed(client_value: Option<&str>) -> &str {
    match client_value {
        Some(value) if !value.is_empty() => value,
        _ => DEFAULT_CLIENT_SEED,
    }
}

/// Derive the combined seed.
///
/// `SHA-256("{server_secret}:{client}:{session_id}")` as lowercase hex,
/// where `client` is the client value or [`DEFAULT_CLIENT_SEED`].
pub fn derive_combined_seed(
    server_secret: &str,
    client_value: Option<&str>,
    session_id: &str,
) -> String {
    let client = effective_client_seed(client_value);
    let preimage = format!(
        "{server_secret}{SEED_SEPARATOR}{client}{SEED_SEPARATOR}{session_id}"
    );
    sha256_hex(preimage.as_bytes())
}
