//! Rolling 2-bit k-mer hashing
//!
//! A k-mer of up to 32 bases is packed into a `u64` with its first base in
//! the highest occupied bits. The packed value is the k-mer's identity: it is
//! exact, so it can be turned back into the k-mer with [`KmerHasher::unhash`].
//!
//! The strand policy is a type parameter: [`Canonical`] hashes a k-mer and its
//! reverse complement identically, [`Forward`] is strand-aware. Hashers keep
//! both the forward and reverse-complement words so a cursor can roll in
//! either direction in O(1).

use crate::constants::{kmer_mask, Hash};
use crate::encoding::{complement_bits, decode_base, encode_base_at, EncodingError};
use std::fmt;
use std::marker::PhantomData;

/// Strand policy selecting the hash of a (forward, reverse-complement) pair
pub trait Strand: Copy + Clone + Default + fmt::Debug + Send + Sync + 'static {
    /// Whether both strands of a k-mer share one hash
    const CANONICAL: bool;

    /// Pick the hash from the forward and reverse-complement words
    fn select(fw: u64, rc: u64) -> Hash;
}

/// Strand-independent hashing: min(forward, reverse complement)
#[derive(Clone, Copy, Debug, Default)]
pub struct Canonical;

/// Strand-aware hashing: the forward word only
#[derive(Clone, Copy, Debug, Default)]
pub struct Forward;

impl Strand for Canonical {
    const CANONICAL: bool = true;

    #[inline]
    fn select(fw: u64, rc: u64) -> Hash {
        fw.min(rc)
    }
}

impl Strand for Forward {
    const CANONICAL: bool = false;

    #[inline]
    fn select(fw: u64, _rc: u64) -> Hash {
        fw
    }
}

/// Hash function with a movable cursor over a sequence
///
/// `set_cursor` positions the hasher on a full k-mer; `shift_right` appends a
/// base (dropping the first one) and `shift_left` prepends a base (dropping
/// the last one). Each returns the hash of the k-mer now under the cursor.
pub trait KmerHasher: Clone + fmt::Debug + Send + Sync {
    /// K-mer length
    fn k(&self) -> usize;

    /// Whether a k-mer and its reverse complement share a hash
    fn is_canonical(&self) -> bool;

    /// Hash a k-mer without moving the cursor
    fn hash(&self, kmer: &[u8]) -> Result<Hash, EncodingError>;

    /// Place the cursor on `kmer` and return its hash
    fn set_cursor(&mut self, kmer: &[u8]) -> Result<Hash, EncodingError>;

    /// Append `base` on the right of the cursor
    fn shift_right(&mut self, base: u8) -> Result<Hash, EncodingError>;

    /// Prepend `base` on the left of the cursor
    fn shift_left(&mut self, base: u8) -> Result<Hash, EncodingError>;

    /// Hash of the k-mer under the cursor
    fn get(&self) -> Hash;

    /// Recover the k-mer a hash was computed from (the canonical strand for
    /// canonical hashers)
    fn unhash(&self, hash: Hash) -> String;
}

/// Reverse complement of a packed forward word
///
/// Complement via XOR, then reverse the 2-bit groups and drop the padding.
#[inline]
pub fn reverse_complement_bits(fw: u64, k: usize) -> u64 {
    // A(00)<->T(10), C(01)<->G(11): flip the high bit of every pair
    let mut x = fw ^ 0xAAAA_AAAA_AAAA_AAAAu64;
    x = ((x >> 2) & 0x3333_3333_3333_3333u64) | ((x & 0x3333_3333_3333_3333u64) << 2);
    x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0Fu64) | ((x & 0x0F0F_0F0F_0F0F_0F0Fu64) << 4);
    x = x.swap_bytes();
    x >> (64 - 2 * k)
}

/// Rolling 2-bit hasher parameterized by a [`Strand`] policy
#[derive(Clone)]
pub struct TwoBitHasher<S: Strand> {
    k: usize,
    mask: u64,
    rc_shift: usize,
    fw: u64,
    rc: u64,
    _strand: PhantomData<S>,
}

/// Canonical 2-bit hasher
pub type CanonicalHasher = TwoBitHasher<Canonical>;

/// Strand-aware 2-bit hasher
pub type ForwardHasher = TwoBitHasher<Forward>;

impl<S: Strand> TwoBitHasher<S> {
    /// Create a hasher for k-mers of length `k` (callers validate `k`)
    pub fn new(k: usize) -> Self {
        Self {
            k,
            mask: kmer_mask(k),
            rc_shift: 2 * (k - 1),
            fw: 0,
            rc: 0,
            _strand: PhantomData,
        }
    }

    fn pack(&self, kmer: &[u8]) -> Result<u64, EncodingError> {
        if kmer.len() != self.k {
            return Err(EncodingError::LengthMismatch {
                expected: self.k,
                actual: kmer.len(),
            });
        }
        let mut fw = 0u64;
        for (i, &base) in kmer.iter().enumerate() {
            fw = (fw << 2) | encode_base_at(base, i)?;
        }
        Ok(fw)
    }
}

impl<S: Strand> fmt::Debug for TwoBitHasher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoBitHasher")
            .field("k", &self.k)
            .field("canonical", &S::CANONICAL)
            .field("cursor", &unpack(self.fw, self.k))
            .finish()
    }
}

impl<S: Strand> KmerHasher for TwoBitHasher<S> {
    #[inline]
    fn k(&self) -> usize {
        self.k
    }

    #[inline]
    fn is_canonical(&self) -> bool {
        S::CANONICAL
    }

    fn hash(&self, kmer: &[u8]) -> Result<Hash, EncodingError> {
        let fw = self.pack(kmer)?;
        Ok(S::select(fw, reverse_complement_bits(fw, self.k)))
    }

    fn set_cursor(&mut self, kmer: &[u8]) -> Result<Hash, EncodingError> {
        self.fw = self.pack(kmer)?;
        self.rc = reverse_complement_bits(self.fw, self.k);
        Ok(self.get())
    }

    #[inline]
    fn shift_right(&mut self, base: u8) -> Result<Hash, EncodingError> {
        let bits = encode_base_at(base, self.k)?;
        self.fw = ((self.fw << 2) | bits) & self.mask;
        self.rc = (self.rc >> 2) | (complement_bits(bits) << self.rc_shift);
        Ok(self.get())
    }

    #[inline]
    fn shift_left(&mut self, base: u8) -> Result<Hash, EncodingError> {
        let bits = encode_base_at(base, 0)?;
        self.fw = (self.fw >> 2) | (bits << self.rc_shift);
        self.rc = ((self.rc << 2) | complement_bits(bits)) & self.mask;
        Ok(self.get())
    }

    #[inline]
    fn get(&self) -> Hash {
        S::select(self.fw, self.rc)
    }

    fn unhash(&self, hash: Hash) -> String {
        unpack(hash, self.k)
    }
}

/// A hasher whose strand policy is chosen at runtime
#[derive(Clone, Debug)]
pub enum AnyHasher {
    /// [`CanonicalHasher`]
    Canonical(CanonicalHasher),
    /// [`ForwardHasher`]
    Forward(ForwardHasher),
}

impl AnyHasher {
    /// Build a hasher for `k`, canonical or strand-aware
    pub fn new(k: usize, canonical: bool) -> Self {
        if canonical {
            AnyHasher::Canonical(CanonicalHasher::new(k))
        } else {
            AnyHasher::Forward(ForwardHasher::new(k))
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $h:ident => $body:expr) => {
        match $self {
            AnyHasher::Canonical($h) => $body,
            AnyHasher::Forward($h) => $body,
        }
    };
}

impl KmerHasher for AnyHasher {
    #[inline]
    fn k(&self) -> usize {
        dispatch!(self, h => h.k())
    }

    #[inline]
    fn is_canonical(&self) -> bool {
        dispatch!(self, h => h.is_canonical())
    }

    #[inline]
    fn hash(&self, kmer: &[u8]) -> Result<Hash, EncodingError> {
        dispatch!(self, h => h.hash(kmer))
    }

    #[inline]
    fn set_cursor(&mut self, kmer: &[u8]) -> Result<Hash, EncodingError> {
        dispatch!(self, h => h.set_cursor(kmer))
    }

    #[inline]
    fn shift_right(&mut self, base: u8) -> Result<Hash, EncodingError> {
        dispatch!(self, h => h.shift_right(base))
    }

    #[inline]
    fn shift_left(&mut self, base: u8) -> Result<Hash, EncodingError> {
        dispatch!(self, h => h.shift_left(base))
    }

    #[inline]
    fn get(&self) -> Hash {
        dispatch!(self, h => h.get())
    }

    fn unhash(&self, hash: Hash) -> String {
        dispatch!(self, h => h.unhash(hash))
    }
}

fn unpack(bits: u64, k: usize) -> String {
    (0..k)
        .rev()
        .map(|i| decode_base(bits >> (2 * i)) as char)
        .collect()
}

/// Iterator over the hashes of every k-mer window of a sequence
pub struct KmerHashes<'a, H: KmerHasher> {
    hasher: H,
    seq: &'a [u8],
    pos: usize,
}

impl<'a, H: KmerHasher> KmerHashes<'a, H> {
    /// Roll `hasher` over `seq`; fails if the first window is invalid
    pub fn new(mut hasher: H, seq: &'a [u8]) -> Result<Self, EncodingError> {
        let k = hasher.k();
        if seq.len() < k {
            return Err(EncodingError::LengthMismatch {
                expected: k,
                actual: seq.len(),
            });
        }
        hasher.set_cursor(&seq[..k])?;
        Ok(Self { hasher, seq, pos: 0 })
    }
}

impl<'a, H: KmerHasher> Iterator for KmerHashes<'a, H> {
    type Item = Result<Hash, EncodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.hasher.k();
        if self.pos + k > self.seq.len() {
            return None;
        }
        let item = if self.pos == 0 {
            Ok(self.hasher.get())
        } else {
            let end = self.pos + k - 1;
            self.hasher
                .shift_right(self.seq[end])
                .map_err(|_| EncodingError::InvalidBase {
                    base: self.seq[end],
                    position: end,
                })
        };
        self.pos += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::reverse_complement;

    #[test]
    fn test_reverse_complement_bits() {
        let h = ForwardHasher::new(5);
        let fw = h.hash(b"ACGTG").unwrap();
        let rc = h.hash(b"CACGT").unwrap();
        assert_eq!(reverse_complement_bits(fw, 5), rc);
        assert_eq!(reverse_complement_bits(rc, 5), fw);
    }

    #[test]
    fn test_canonical_hash_is_strand_independent() {
        let h = CanonicalHasher::new(7);
        let kmer = b"ACGTTGA";
        let rc = reverse_complement(kmer);
        assert_eq!(h.hash(kmer).unwrap(), h.hash(&rc).unwrap());

        let f = ForwardHasher::new(7);
        assert_ne!(f.hash(kmer).unwrap(), f.hash(&rc).unwrap());
    }

    #[test]
    fn test_unhash_recovers_kmer() {
        let f = ForwardHasher::new(9);
        let h = f.hash(b"GATTACAGT").unwrap();
        assert_eq!(f.unhash(h), "GATTACAGT");

        let c = CanonicalHasher::new(5);
        let h = c.hash(b"TTTTT").unwrap();
        assert_eq!(c.unhash(h), "AAAAA");
    }

    #[test]
    fn test_shift_right_matches_direct_hash() {
        let seq = b"ACGTTGCAAGGCTTAGCA";
        let k = 6;
        let mut h = CanonicalHasher::new(k);
        h.set_cursor(&seq[..k]).unwrap();
        for i in 1..=(seq.len() - k) {
            let rolled = h.shift_right(seq[i + k - 1]).unwrap();
            assert_eq!(rolled, h.hash(&seq[i..i + k]).unwrap(), "window {}", i);
        }
    }

    #[test]
    fn test_shift_left_matches_direct_hash() {
        let seq = b"TTGACCAGTAGGCATC";
        let k = 5;
        let mut h = CanonicalHasher::new(k);
        let last = seq.len() - k;
        h.set_cursor(&seq[last..]).unwrap();
        for i in (0..last).rev() {
            let rolled = h.shift_left(seq[i]).unwrap();
            assert_eq!(rolled, h.hash(&seq[i..i + k]).unwrap(), "window {}", i);
        }
    }

    #[test]
    fn test_kmer_hashes_iterator() {
        let seq = b"ACGTACGTTT";
        let h = ForwardHasher::new(4);
        let hashes: Vec<Hash> = KmerHashes::new(h.clone(), seq)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(hashes.len(), 7);
        assert_eq!(hashes[6], h.hash(b"GTTT").unwrap());
    }

    #[test]
    fn test_invalid_base_and_length() {
        let h = ForwardHasher::new(4);
        assert!(h.hash(b"ACNT").is_err());
        assert!(h.hash(b"ACG").is_err());
        assert!(KmerHashes::new(h, b"ACG").is_err());
    }

    #[test]
    fn test_full_width_k() {
        let h = CanonicalHasher::new(32);
        let kmer = b"ACGTACGTACGTACGTACGTACGTACGTACGA";
        let rc = reverse_complement(kmer);
        assert_eq!(h.hash(kmer).unwrap(), h.hash(&rc).unwrap());
    }

    #[test]
    fn test_any_hasher_dispatch() {
        let canonical = AnyHasher::new(5, true);
        let forward = AnyHasher::new(5, false);
        assert!(canonical.is_canonical());
        assert!(!forward.is_canonical());
        assert_eq!(canonical.hash(b"TTTTT").unwrap(), CanonicalHasher::new(5).hash(b"AAAAA").unwrap());
        assert_eq!(forward.hash(b"ACGTG").unwrap(), ForwardHasher::new(5).hash(b"ACGTG").unwrap());
    }
}
