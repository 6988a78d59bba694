//! Constants and configuration defaults
//!
//! K-mers are packed two bits per base into a `u64`, which bounds the
//! supported k-mer sizes.

/// Identity of a k-mer throughout the crate (a 2-bit packed, optionally
/// canonicalized k-mer)
pub type Hash = u64;

/// Default seed for the deterministic mixing hasher
pub const DEFAULT_SEED: u64 = 1;

/// Default k-mer size
pub const DEFAULT_K: usize = 31;

/// Minimum k-mer size supported
pub const MIN_K: usize = 3;

/// Maximum k-mer size supported (32 bases fill a `u64`)
pub const MAX_K: usize = 32;

/// Default number of sequences between periodic reports
pub const DEFAULT_REPORT_INTERVAL: u64 = 10_000;

/// Default number of root nodes sampled by component analysis
pub const DEFAULT_COMPONENT_SAMPLE: usize = 10_000;

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// Check if a k-mer size is valid
#[inline]
pub const fn is_valid_k(k: usize) -> bool {
    k >= MIN_K && k <= MAX_K
}

/// Bit mask covering the low `2k` bits
#[inline]
pub const fn kmer_mask(k: usize) -> u64 {
    if k >= 32 {
        u64::MAX
    } else {
        (1u64 << (2 * k)) - 1
    }
}
