//! Deterministic mixing hasher built on seeded ahash.
//!
//! K-mer hashes are exact 2-bit packings and cluster badly, so anything that
//! needs a well-spread, reproducible value derived from them (root sampling
//! for component analysis, order-independent unitig signatures) mixes them
//! through this hasher first.

use crate::constants::Hash;
use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};

/// A deterministic hasher with a seeded state
#[derive(Clone)]
pub struct DeterministicHasher {
    seed: u64,
    state: RandomState,
}

impl DeterministicHasher {
    /// Create a new deterministic hasher with the given seed
    pub fn new(seed: u64) -> Self {
        let state = RandomState::with_seeds(seed, !seed, seed.rotate_left(32), !seed.rotate_left(32));
        Self { seed, state }
    }

    /// Mix a single value
    #[inline]
    pub fn mix(&self, value: u64) -> u64 {
        let mut hasher = self.state.build_hasher();
        hasher.write_u64(value);
        hasher.finish()
    }

    /// Order-independent signature of a multiset of k-mer hashes
    ///
    /// Two unitigs holding the same k-mers yield the same signature whatever
    /// their orientation or, for circular unitigs, their starting k-mer.
    pub fn signature<I>(&self, hashes: I) -> u64
    where
        I: IntoIterator<Item = Hash>,
    {
        hashes
            .into_iter()
            .fold(0u64, |acc, h| acc.wrapping_add(self.mix(h)))
    }

    /// Keep the `n` values with the smallest mixed hash (a bottom-n sketch)
    ///
    /// The selection depends only on the seed and the values, never on
    /// iteration order.
    pub fn bottom_n<I>(&self, values: I, n: usize) -> Vec<u64>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut keyed: Vec<(u64, u64)> = values.into_iter().map(|v| (self.mix(v), v)).collect();
        keyed.sort_unstable();
        keyed.truncate(n);
        keyed.into_iter().map(|(_, v)| v).collect()
    }

    /// Get the seed value
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl std::fmt::Debug for DeterministicHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeterministicHasher").field("seed", &self.seed).finish()
    }
}
