//! Bloom filter for the ignore pre-check
//!
//! Classic double-hashing construction: `h_i = h1 + i*h2 (mod m)` for
//! `i in [0, k)`, with h1 and h2 drawn from the two halves of a SHA-256
//! digest. The filter never produces false negatives; the false-positive
//! rate stays at or below the configured `p` for the design cardinality.

use sha2::{Digest, Sha256};

/// Substitute increment when the second hash half comes out zero.
const GOLDEN_RATIO: u64 = 0x9e37_79b9_7f4a_7c15;

/// Minimum filter width in bits.
const MIN_BITS: u64 = 64;

/// Fixed-size bloom filter keyed by string tokens
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    m: u64,
    k: u32,
}

impl BloomFilter {
    /// Sizes a filter for `n` expected items at false-positive rate `p`.
    ///
    /// `m = ceil(-n * ln(p) / ln(2)^2)` bits (minimum 64) and
    /// `k = round(ln(2) * m / n)` hash functions (minimum 1).
    pub fn with_capacity(n: usize, p: f64) -> Self {
        let n = n.max(1) as f64;
        let ln2 = std::f64::consts::LN_2;

        let m = ((-n * p.ln()) / (ln2 * ln2)).ceil() as u64;
        let m = m.max(MIN_BITS);
        let k = ((m as f64 / n) * ln2).round() as u32;
        let k = k.max(1);

        let words = m.div_ceil(64) as usize;
        Self {
            bits: vec![0u64; words],
            m,
            k,
        }
    }

    /// Sets the k bits for `item`.
    pub fn add(&mut self, item: &str) {
        let (h1, h2) = Self::hash_pair(item);
        for i in 0..self.k {
            let bit = h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.m;
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    /// Tests the k bits for `item`. A `false` answer is definitive.
    pub fn contains(&self, item: &str) -> bool {
        let (h1, h2) = Self::hash_pair(item);
        for i in 0..self.k {
            let bit = h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.m;
            if self.bits[(bit / 64) as usize] & (1 << (bit % 64)) == 0 {
                return false;
            }
        }
        true
    }

    /// Width of the filter in bits.
    pub fn bit_count(&self) -> u64 {
        self.m
    }

    /// Number of hash functions in use.
    pub fn hash_count(&self) -> u32 {
        self.k
    }

    /// Derives the two hash values from the halves of a SHA-256 digest.
    fn hash_pair(item: &str) -> (u64, u64) {
        let digest = Sha256::digest(item.as_bytes());
        let h1 = u64::from_be_bytes(digest[0..8].try_into().expect("digest half"));
        let mut h2 = u64::from_be_bytes(digest[16..24].try_into().expect("digest half"));
        if h2 == 0 {
            h2 = GOLDEN_RATIO;
        }
        (h1, h2)
    }
}
