//! Deterministic Random Number Generator
//!
//! MT19937 seeded through `init_by_array` with a SHA-512-extended key, plus
//! a fixed set of draw primitives built on 53-bit floats. Third parties regenerate plans from disclosed seeds, so
//! the algorithm and every draw primitive below are part of the fairness
//! protocol, frozen under [`RNG_PROTOCOL`].

use std::fmt;

use sha2::{Digest, Sha512};

/// Versioned identifier of the frozen generator and its draw primitives.
pub const RNG_PROTOCOL: &str = "mt19937-sha512-v1";

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// Seed used by `init_by_array` before mixing in the key.
const ARRAY_INIT_SEED: u32 = 19_650_218;

/// Deterministic PRNG using the Mersenne Twister (MT19937).
///
/// # Determinism Guarantee
///
/// Given the same seed text, this RNG produces the exact same sequence on
/// any platform. Golden vectors in the tests pin the stream.
///
/// # Example
///
/// ```
/// use cave_explorer::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::from_seed_str("abc");
/// assert_eq!(rng.next_u32(), 3315820543); // Always the same!
/// ```
#[derive(Clone)]
pub struct DeterministicRng {
    mt: [u32; N],
    index: usize,
}

impl fmt::Debug for DeterministicRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeterministicRng")
            .field("protocol", &RNG_PROTOCOL)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl DeterministicRng {
    /// Create an RNG from seed text.
    ///
    /// The key material is `utf8(seed) ‖ SHA-512(utf8(seed))`, read as one
    /// big-endian integer and fed to `init_by_array` as 32-bit words, least
    /// significant word first.
    pub fn from_seed_str(seed: &str) -> Self {
        let mut material = seed.as_bytes().to_vec();
        material.extend_from_slice(&Sha512::digest(seed.as_bytes()));
        Self::from_key(&key_words(&material))
    }

    /// Create an RNG from a key array (MT19937 `init_by_array`).
    pub fn from_key(key: &[u32]) -> Self {
        let key: &[u32] = if key.is_empty() { &[0] } else { key };
        let mut rng = Self::from_u32(ARRAY_INIT_SEED);
        let mt = &mut rng.mt;

        let (mut i, mut j) = (1usize, 0usize);
        for _ in 0..N.max(key.len()) {
            let prev = mt[i - 1];
            mt[i] = (mt[i] ^ (prev ^ (prev >> 30)).wrapping_mul(1_664_525))
                .wrapping_add(key[j])
                .wrapping_add(j as u32);
            i += 1;
            j += 1;
            if i >= N {
                mt[0] = mt[N - 1];
                i = 1;
            }
            if j >= key.len() {
                j = 0;
            }
        }

        for _ in 0..N - 1 {
            let prev = mt[i - 1];
            mt[i] = (mt[i] ^ (prev ^ (prev >> 30)).wrapping_mul(1_566_083_941))
                .wrapping_sub(i as u32);
            i += 1;
            if i >= N {
                mt[0] = mt[N - 1];
                i = 1;
            }
        }

        // MSB is 1, assuring a non-zero initial array
        mt[0] = 0x8000_0000;
        rng
    }

    /// MT19937 `init_genrand`.
    fn from_u32(seed: u32) -> Self {
        let mut mt = [0u32; N];
        mt[0] = seed;
        for i in 1..N {
            let prev = mt[i - 1];
            mt[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        Self { mt, index: N }
    }

    /// Regenerate the whole state block.
    fn twist(&mut self) {
        for k in 0..N {
            let y = (self.mt[k] & UPPER_MASK) | (self.mt[(k + 1) % N] & LOWER_MASK);
            let mut next = self.mt[(k + M) % N] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= MATRIX_A;
            }
            self.mt[k] = next;
        }
        self.index = 0;
    }

    /// Generate the next 32-bit random value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }

        let mut y = self.mt[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^ (y >> 18)
    }

    /// Generate a float in [0, 1) with 53 bits of precision.
    ///
    /// Consumes two 32-bit draws.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        let a = self.next_u32() >> 5;
        let b = self.next_u32() >> 6;
        (a as f64 * 67_108_864.0 + b as f64) * (1.0 / 9_007_199_254_740_992.0)
    }

    /// Take the top `bits` bits of one 32-bit draw (`bits` in 1..=32).
    #[inline]
    fn next_bits(&mut self, bits: u32) -> u32 {
        self.next_u32() >> (32 - bits)
    }

    /// Generate a random integer in range [0, n).
    ///
    /// Uses rejection sampling over `bit_length(n)` bits, so the number of
    /// draws consumed varies. Returns 0 without drawing when `n == 0`.
    pub fn below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let bits = u32::BITS - n.leading_zeros();
        let mut r = self.next_bits(bits);
        while r >= n {
            r = self.next_bits(bits);
        }
        r
    }

    /// Generate a float in [lo, hi).
    #[inline]
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Generate a boolean that is true with the given probability.
    #[inline]
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Pick an index according to relative weights.
    ///
    /// Bisects `next_f64() * total` into the cumulative weights, bounded to
    /// the last index. Returns 0 without drawing for an empty or
    /// non-positive weight list.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for weight in weights {
            total += weight;
            cumulative.push(total);
        }

        if cumulative.is_empty() || total <= 0.0 || !total.is_finite() {
            return 0;
        }

        let x = self.next_f64() * total;
        let hi = cumulative.len() - 1;
        cumulative[..hi].partition_point(|&c| c <= x)
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.below(slice.len() as u32) as usize;
            Some(&slice[idx])
        }
    }

    /// Shuffle a slice in place using Fisher-Yates, walking from the end.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.below((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }
}

/// Split big-endian key material into 32-bit words, least significant first.
fn key_words(material: &[u8]) -> Vec<u32> {
    let start = material
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(material.len());
    let significant = &material[start..];

    if significant.is_empty() {
        return vec![0];
    }

    significant
        .rchunks(4)
        .map(|chunk| chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
