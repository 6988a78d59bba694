//! Base de Bruijn graph: a [`KmerHasher`] composed with a [`KmerStore`]
//!
//! Edges are implicit. The neighbours of a k-mer are found by querying the
//! store with its four possible extensions on each side, so degrees always
//! reflect the current store contents.

use crate::constants::Hash;
use crate::encoding::BASES;
use crate::error::{CdbgError, Result};
use crate::kmer::{KmerHashes, KmerHasher};
use crate::store::KmerStore;
use smallvec::SmallVec;

/// Side of a k-mer being extended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Prepend a base
    Left,
    /// Append a base
    Right,
}

/// One present neighbour of a k-mer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    /// The base added on the extended side
    pub base: u8,
    /// The neighbour k-mer, in the orientation of the queried k-mer
    pub kmer: Vec<u8>,
    /// Hash of the neighbour k-mer
    pub hash: Hash,
}

/// Neighbours on one side (at most four)
pub type Extensions = SmallVec<[Extension; 4]>;

/// Insert-only de Bruijn graph over hashed k-mers
#[derive(Debug, Clone)]
pub struct Dbg<S: KmerStore, H: KmerHasher> {
    store: S,
    hasher: H,
}

impl<S: KmerStore, H: KmerHasher> Dbg<S, H> {
    /// Compose a store and a hasher
    pub fn new(store: S, hasher: H) -> Self {
        Self { store, hasher }
    }

    /// K-mer size
    #[inline]
    pub fn k(&self) -> usize {
        self.hasher.k()
    }

    /// The hasher (cursor state is irrelevant; clone it to roll)
    #[inline]
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// The underlying store
    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Hash a single k-mer
    #[inline]
    pub fn hash(&self, kmer: &[u8]) -> Result<Hash> {
        Ok(self.hasher.hash(kmer)?)
    }

    /// Hashes of every k-mer window of `seq`
    pub fn hashes(&self, seq: &[u8]) -> Result<Vec<Hash>> {
        let k = self.k();
        if seq.len() < k {
            return Err(CdbgError::InvalidKmerLength { length: seq.len(), k });
        }
        let hashes = KmerHashes::new(self.hasher.clone(), seq)?.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(hashes)
    }

    /// Insert a k-mer, returning `true` if it is new
    pub fn insert(&mut self, kmer: &[u8]) -> Result<bool> {
        let h = self.hash(kmer)?;
        Ok(self.store.insert(h))
    }

    /// Insert an already-hashed k-mer
    #[inline]
    pub fn insert_hash(&mut self, hash: Hash) -> bool {
        self.store.insert(hash)
    }

    /// Insert every k-mer of `seq`, returning how many were new
    pub fn insert_sequence(&mut self, seq: &[u8]) -> Result<u64> {
        let hashes = self.hashes(seq)?;
        Ok(hashes.into_iter().filter(|&h| self.store.insert(h)).count() as u64)
    }

    /// Membership of a k-mer
    pub fn query(&self, kmer: &[u8]) -> Result<bool> {
        Ok(self.store.contains(self.hash(kmer)?))
    }

    /// Membership of an already-hashed k-mer
    #[inline]
    pub fn query_hash(&self, hash: Hash) -> bool {
        self.store.contains(hash)
    }

    /// Stored count of a k-mer
    pub fn count(&self, kmer: &[u8]) -> Result<u32> {
        Ok(self.store.query(self.hash(kmer)?))
    }

    /// Present neighbours of `kmer` on one side
    pub fn extensions(&self, kmer: &[u8], direction: Direction) -> Result<Extensions> {
        self.extensions_where(kmer, direction, |_| true)
    }

    /// Present neighbours of `kmer` on one side that also pass `keep`
    pub fn extensions_where<F>(&self, kmer: &[u8], direction: Direction, keep: F) -> Result<Extensions>
    where
        F: Fn(Hash) -> bool,
    {
        let k = self.k();
        if kmer.len() != k {
            return Err(CdbgError::InvalidKmerLength { length: kmer.len(), k });
        }
        let mut cursor = self.hasher.clone();
        cursor.set_cursor(kmer)?;

        let mut out = Extensions::new();
        for &base in BASES.iter() {
            let mut shifted = cursor.clone();
            let hash = match direction {
                Direction::Left => shifted.shift_left(base)?,
                Direction::Right => shifted.shift_right(base)?,
            };
            if self.store.contains(hash) && keep(hash) {
                let neighbor = match direction {
                    Direction::Left => {
                        let mut v = Vec::with_capacity(k);
                        v.push(base);
                        v.extend_from_slice(&kmer[..k - 1]);
                        v
                    }
                    Direction::Right => {
                        let mut v = Vec::with_capacity(k);
                        v.extend_from_slice(&kmer[1..]);
                        v.push(base);
                        v
                    }
                };
                out.push(Extension { base, kmer: neighbor, hash });
            }
        }
        Ok(out)
    }

    /// Present predecessors of `kmer`
    #[inline]
    pub fn left_extensions(&self, kmer: &[u8]) -> Result<Extensions> {
        self.extensions(kmer, Direction::Left)
    }

    /// Present successors of `kmer`
    #[inline]
    pub fn right_extensions(&self, kmer: &[u8]) -> Result<Extensions> {
        self.extensions(kmer, Direction::Right)
    }

    /// Number of present predecessors
    pub fn left_degree(&self, kmer: &[u8]) -> Result<usize> {
        Ok(self.left_extensions(kmer)?.len())
    }

    /// Number of present successors
    pub fn right_degree(&self, kmer: &[u8]) -> Result<usize> {
        Ok(self.right_extensions(kmer)?.len())
    }

    /// Whether `kmer` is a branch point: more than one predecessor or more
    /// than one successor
    pub fn is_decision(&self, kmer: &[u8]) -> Result<bool> {
        Ok(self.left_degree(kmer)? > 1 || self.right_degree(kmer)? > 1)
    }

    /// Number of distinct k-mers stored
    #[inline]
    pub fn n_unique(&self) -> u64 {
        self.store.n_unique()
    }

    /// Estimated false-positive rate of the store
    #[inline]
    pub fn estimated_fp(&self) -> f64 {
        self.store.estimated_fp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::{CanonicalHasher, ForwardHasher};
    use crate::store::ExactStore;

    #[test]
    fn test_insert_and_query() {
        let mut g = Dbg::new(ExactStore::new(), ForwardHasher::new(4));
        assert_eq!(g.insert_sequence(b"ACGTAC").unwrap(), 3);
        assert_eq!(g.insert_sequence(b"ACGTAC").unwrap(), 0);
        assert!(g.query(b"CGTA").unwrap());
        assert!(!g.query(b"AAAA").unwrap());
        assert_eq!(g.n_unique(), 3);
    }

    #[test]
    fn test_short_sequence_is_rejected() {
        let mut g = Dbg::new(ExactStore::new(), ForwardHasher::new(5));
        let err = g.insert_sequence(b"ACG").unwrap_err();
        assert_eq!(err, CdbgError::InvalidKmerLength { length: 3, k: 5 });
    }

    #[test]
    fn test_degrees_on_fork() {
        let mut g = Dbg::new(ExactStore::new(), ForwardHasher::new(4));
        g.insert_sequence(b"AACGTT").unwrap();
        g.insert_sequence(b"AACGA").unwrap();

        // ACGT and ACGA both follow AACG
        assert_eq!(g.right_degree(b"AACG").unwrap(), 2);
        assert_eq!(g.left_degree(b"AACG").unwrap(), 0);
        assert!(g.is_decision(b"AACG").unwrap());
        assert!(!g.is_decision(b"ACGT").unwrap());

        let right = g.right_extensions(b"AACG").unwrap();
        let mut kmers: Vec<Vec<u8>> = right.iter().map(|e| e.kmer.clone()).collect();
        kmers.sort();
        assert_eq!(kmers, vec![b"ACGA".to_vec(), b"ACGT".to_vec()]);
    }

    #[test]
    fn test_extensions_where_filters() {
        let mut g = Dbg::new(ExactStore::new(), ForwardHasher::new(4));
        g.insert_sequence(b"AACGTT").unwrap();
        g.insert_sequence(b"AACGA").unwrap();
        let excluded = g.hash(b"ACGA").unwrap();
        let right = g
            .extensions_where(b"AACG", Direction::Right, |h| h != excluded)
            .unwrap();
        assert_eq!(right.len(), 1);
        assert_eq!(right[0].kmer, b"ACGT".to_vec());
    }

    #[test]
    fn test_canonical_graph_sees_reverse_strand() {
        let mut g = Dbg::new(ExactStore::new(), CanonicalHasher::new(5));
        g.insert_sequence(b"ACGGTCA").unwrap();
        // reverse complement of the whole read is fully known
        assert_eq!(g.insert_sequence(b"TGACCGT").unwrap(), 0);
        assert_eq!(g.left_degree(b"CGGTC").unwrap(), 1);
        assert_eq!(g.right_degree(b"CGGTC").unwrap(), 1);
    }
}
