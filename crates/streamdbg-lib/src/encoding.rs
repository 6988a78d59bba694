//! DNA nucleotide encoding
//!
//! 2-bit encoding used by every k-mer hash in the crate:
//! - A (65/97)  -> 00
//! - C (67/99)  -> 01
//! - T (84/116) -> 10
//! - G (71/103) -> 11
//!
//! With this layout the complement of a base is a single XOR with `0b10`.

use thiserror::Error;

/// Error type for encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a valid DNA base (A/C/G/T)
    #[error("Invalid DNA base (byte {base}) at position {position}")]
    InvalidBase {
        /// Offending byte
        base: u8,
        /// Offset of the byte in the input
        position: usize,
    },
    /// The input string length does not match the expected k-mer length
    #[error("K-mer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected k-mer length
        expected: usize,
        /// Actual string length
        actual: usize,
    },
}

/// The four bases in encoding order, used to enumerate graph extensions.
pub const BASES: [u8; 4] = [b'A', b'C', b'T', b'G'];

/// Encode a single DNA nucleotide to 2 bits, or `None` for a non-ACGT byte
#[inline]
pub const fn encode_base(base: u8) -> Option<u64> {
    match base {
        b'A' | b'a' => Some(0b00),
        b'C' | b'c' => Some(0b01),
        b'T' | b't' => Some(0b10),
        b'G' | b'g' => Some(0b11),
        _ => None,
    }
}

/// Encode a base, reporting its position on failure
#[inline]
pub fn encode_base_at(base: u8, position: usize) -> Result<u64, EncodingError> {
    encode_base(base).ok_or(EncodingError::InvalidBase { base, position })
}

/// Decode a 2-bit value to DNA nucleotide (uppercase)
#[inline]
pub const fn decode_base(bits: u64) -> u8 {
    match bits & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b10 => b'T',
        _ => b'G',
    }
}

/// Complement of an encoded base
#[inline]
pub const fn complement_bits(bits: u64) -> u64 {
    bits ^ 0b10
}

/// Complement of an ASCII base; non-ACGT bytes map to `N`
#[inline]
pub const fn complement(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'T',
        b'C' | b'c' => b'G',
        b'G' | b'g' => b'C',
        b'T' | b't' => b'A',
        _ => b'N',
    }
}

/// Reverse complement of an ASCII sequence
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Check a sequence, returning the first invalid base as an error
pub fn validate_dna(seq: &[u8]) -> Result<(), EncodingError> {
    match seq.iter().position(|&b| encode_base(b).is_none()) {
        Some(position) => Err(EncodingError::InvalidBase {
            base: seq[position],
            position,
        }),
        None => Ok(()),
    }
}
