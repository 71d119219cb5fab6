//! Core deterministic primitives.
//!
//! Everything a verifier needs to re-derive a plan lives here. These
//! primitives are frozen protocol: changing any of them invalidates every
//! published commitment.

pub mod hash;
pub mod rng;
pub mod seed;

// Re-export core types
pub use hash::{sha256_hex, to_canonical_json, CanonicalFormatter};
pub use rng::{DeterministicRng, RNG_PROTOCOL};
pub use seed::{derive_combined_seed, generate_server_secret, DEFAULT_CLIENT_SEED};
