//! Error type for graph construction and queries

use crate::encoding::EncodingError;
use thiserror::Error;

/// Errors surfaced by the compactor and the base graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CdbgError {
    /// Input shorter than the k-mer size
    #[error("Sequence of length {length} is shorter than k={k}")]
    InvalidKmerLength {
        /// Length of the rejected sequence
        length: usize,
        /// Configured k-mer size
        k: usize,
    },

    /// Input contained a non-ACGT base or a malformed k-mer
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Node bookkeeping disagrees with the base graph; the graph must be
    /// rebuilt before further use
    #[error("Inconsistent cDBG topology: {0}")]
    InconsistentTopology(String),

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for graph operations
pub type Result<T> = std::result::Result<T, CdbgError>;

impl CdbgError {
    pub(crate) fn topology(msg: impl Into<String>) -> Self {
        CdbgError::InconsistentTopology(msg.into())
    }
}
