//! K-mer membership stores
//!
//! The base graph never looks at k-mer strings once they are hashed: all it
//! needs is an insert-only set (or counter) keyed by [`Hash`]. Stores are
//! pluggable through [`KmerStore`]; both implementations here are exact, so
//! their estimated false-positive rate is zero.

use crate::constants::Hash;
use ahash::{AHashMap, AHashSet};
use std::str::FromStr;

/// Insert-only k-mer set or counting structure
pub trait KmerStore: Send + Sync {
    /// Insert a hash, returning `true` if it was not present before
    fn insert(&mut self, hash: Hash) -> bool;

    /// Count for a hash (0 if absent; 1 for set-like stores)
    fn query(&self, hash: Hash) -> u32;

    /// Membership test
    #[inline]
    fn contains(&self, hash: Hash) -> bool {
        self.query(hash) > 0
    }

    /// Number of distinct hashes inserted
    fn n_unique(&self) -> u64;

    /// Estimated false-positive rate of membership queries
    fn estimated_fp(&self) -> f64 {
        0.0
    }

    /// Snapshot of every stored hash, in no particular order
    fn hashes(&self) -> Vec<Hash>;
}

/// Exact membership set
#[derive(Debug, Default, Clone)]
pub struct ExactStore {
    set: AHashSet<Hash>,
}

impl ExactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KmerStore for ExactStore {
    #[inline]
    fn insert(&mut self, hash: Hash) -> bool {
        self.set.insert(hash)
    }

    #[inline]
    fn query(&self, hash: Hash) -> u32 {
        self.set.contains(&hash) as u32
    }

    fn n_unique(&self) -> u64 {
        self.set.len() as u64
    }

    fn hashes(&self) -> Vec<Hash> {
        self.set.iter().copied().collect()
    }
}

/// Exact counting store with saturating `u32` counts
#[derive(Debug, Default, Clone)]
pub struct CountingStore {
    counts: AHashMap<Hash, u32>,
}

impl CountingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KmerStore for CountingStore {
    #[inline]
    fn insert(&mut self, hash: Hash) -> bool {
        let count = self.counts.entry(hash).or_insert(0);
        *count = count.saturating_add(1);
        *count == 1
    }

    #[inline]
    fn query(&self, hash: Hash) -> u32 {
        self.counts.get(&hash).copied().unwrap_or(0)
    }

    fn n_unique(&self) -> u64 {
        self.counts.len() as u64
    }

    fn hashes(&self) -> Vec<Hash> {
        self.counts.keys().copied().collect()
    }
}

/// Store implementations selectable at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// [`ExactStore`]
    #[default]
    Exact,
    /// [`CountingStore`]
    Counting,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" | "set" => Ok(StoreKind::Exact),
            "counting" | "count" => Ok(StoreKind::Counting),
            other => Err(format!("unknown store kind '{}' (expected exact|counting)", other)),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Exact => write!(f, "exact"),
            StoreKind::Counting => write!(f, "counting"),
        }
    }
}

/// A store chosen by [`StoreKind`], for callers that only know the kind at
/// runtime
#[derive(Debug, Clone)]
pub enum AnyStore {
    /// Exact set
    Exact(ExactStore),
    /// Exact counter
    Counting(CountingStore),
}

impl AnyStore {
    /// Build an empty store of the given kind
    pub fn build(kind: StoreKind) -> Self {
        match kind {
            StoreKind::Exact => AnyStore::Exact(ExactStore::new()),
            StoreKind::Counting => AnyStore::Counting(CountingStore::new()),
        }
    }
}

impl KmerStore for AnyStore {
    #[inline]
    fn insert(&mut self, hash: Hash) -> bool {
        match self {
            AnyStore::Exact(s) => s.insert(hash),
            AnyStore::Counting(s) => s.insert(hash),
        }
    }

    #[inline]
    fn query(&self, hash: Hash) -> u32 {
        match self {
            AnyStore::Exact(s) => s.query(hash),
            AnyStore::Counting(s) => s.query(hash),
        }
    }

    fn n_unique(&self) -> u64 {
        match self {
            AnyStore::Exact(s) => s.n_unique(),
            AnyStore::Counting(s) => s.n_unique(),
        }
    }

    fn estimated_fp(&self) -> f64 {
        match self {
            AnyStore::Exact(s) => s.estimated_fp(),
            AnyStore::Counting(s) => s.estimated_fp(),
        }
    }

    fn hashes(&self) -> Vec<Hash> {
        match self {
            AnyStore::Exact(s) => s.hashes(),
            AnyStore::Counting(s) => s.hashes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_store_insert_is_idempotent() {
        let mut store = ExactStore::new();
        assert!(store.insert(5));
        assert!(!store.insert(5));
        assert_eq!(store.query(5), 1);
        assert_eq!(store.query(6), 0);
        assert_eq!(store.n_unique(), 1);
        assert_eq!(store.estimated_fp(), 0.0);
    }

    #[test]
    fn test_counting_store_counts() {
        let mut store = CountingStore::new();
        assert!(store.insert(9));
        assert!(!store.insert(9));
        assert!(!store.insert(9));
        assert_eq!(store.query(9), 3);
        assert!(store.contains(9));
        assert!(!store.contains(10));
        assert_eq!(store.n_unique(), 1);
    }

    #[test]
    fn test_store_kind_from_str() {
        assert_eq!("exact".parse::<StoreKind>().unwrap(), StoreKind::Exact);
        assert_eq!("Counting".parse::<StoreKind>().unwrap(), StoreKind::Counting);
        assert!("bloom".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_any_store_dispatch() {
        let mut store = AnyStore::build(StoreKind::Counting);
        store.insert(1);
        store.insert(1);
        store.insert(2);
        assert_eq!(store.query(1), 2);
        let mut hashes = store.hashes();
        hashes.sort_unstable();
        assert_eq!(hashes, vec![1, 2]);
    }
}
