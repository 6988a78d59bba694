// streamdbg: streaming compact de Bruijn graphs
//
// Maintains a compact de Bruijn graph incrementally as DNA sequences arrive,
// keeping unitigs and decision k-mers consistent after every insertion.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod constants;
pub mod encoding;
pub mod error;
pub mod hasher;
pub mod kmer;
pub mod store;
pub mod dbg;
pub mod segments;
pub mod walker;
pub mod splice;
pub mod cdbg;
pub mod config;
pub mod report;
pub mod compactor;
pub mod validate;
pub mod writers;
pub mod parse;
pub mod shared;

// Re-export common types at crate root
pub use cdbg::{CompactGraph, ComponentReport, DecisionNode, NodeRef, UnitigMeta, UnitigNode};
pub use compactor::{DynCompactor, StreamingCompactor, UpdateSummary};
pub use config::CompactorConfig;
pub use dbg::{Dbg, Direction};
pub use error::{CdbgError, Result};
pub use kmer::{AnyHasher, CanonicalHasher, ForwardHasher, KmerHasher};
pub use report::Report;
pub use shared::SharedCompactor;
pub use store::{AnyStore, CountingStore, ExactStore, KmerStore, StoreKind};
pub use validate::{validate_against_rebuild, ValidationReport};
pub use walker::{TraversalState, UnitigWalker, Walk};
pub use writers::{write_graph, GraphFormat};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}
