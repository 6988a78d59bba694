//! Compactor counters
//!
//! Structural operation counters accumulate across updates; node counts and
//! meta histograms are recomputed from the node store after every update.

use crate::cdbg::{CompactGraph, UnitigMeta};
use crate::compactor::StreamingCompactor;
use crate::kmer::KmerHasher;
use crate::store::KmerStore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of the compactor state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Distinct k-mers in the base graph
    pub n_unique: u64,
    /// Unitig nodes
    pub n_unodes: u64,
    /// Decision nodes
    pub n_dnodes: u64,
    /// Distinct unitig end hashes
    pub n_unitig_ends: u64,
    /// Calls to `update`
    pub n_updates: u64,
    /// Updates that added at least one k-mer
    pub n_novel_sequences: u64,
    /// New-k-mer segments found across all updates
    pub n_new_segments: u64,
    /// Unitigs cut in two by a new decision node
    pub n_splits: u64,
    /// Unitigs joined into one
    pub n_merges: u64,
    /// Unitigs grown by new k-mers
    pub n_extends: u64,
    /// Unitigs shortened because an end became a decision node
    pub n_clips: u64,
    /// Single-k-mer unitigs that became decision nodes
    pub n_deletes: u64,
    /// Merges that closed a cycle
    pub n_circular_merges: u64,
    /// Unitigs tagged FULL
    pub n_full: u64,
    /// Unitigs tagged TIP
    pub n_tips: u64,
    /// Unitigs tagged ISLAND
    pub n_islands: u64,
    /// Unitigs tagged TRIVIAL
    pub n_trivial: u64,
    /// Unitigs tagged CIRCULAR
    pub n_circular: u64,
    /// Estimated false-positive rate of the k-mer store
    pub estimated_fp: f64,
}

impl Report {
    /// Counters of `compactor` with node counts recomputed from its node store
    pub fn from_compactor<S: KmerStore, H: KmerHasher>(compactor: &StreamingCompactor<S, H>) -> Self {
        let mut report = compactor.report().clone();
        report.refresh(compactor.cdbg(), compactor.dbg().n_unique(), compactor.dbg().estimated_fp());
        report
    }

    /// Recompute node-derived fields from the node store
    pub(crate) fn refresh(&mut self, cdbg: &CompactGraph, n_unique: u64, estimated_fp: f64) {
        self.n_unique = n_unique;
        self.estimated_fp = estimated_fp;
        self.n_unodes = cdbg.n_unodes() as u64;
        self.n_dnodes = cdbg.n_dnodes() as u64;
        self.n_unitig_ends = cdbg.n_unitig_ends() as u64;

        let counts = cdbg.meta_counts();
        let get = |m: UnitigMeta| counts.get(&m).copied().unwrap_or(0) as u64;
        self.n_full = get(UnitigMeta::Full);
        self.n_tips = get(UnitigMeta::Tip);
        self.n_islands = get(UnitigMeta::Island);
        self.n_trivial = get(UnitigMeta::Trivial);
        self.n_circular = get(UnitigMeta::Circular);
    }

    /// Total structural operations performed
    pub fn n_operations(&self) -> u64 {
        self.n_splits + self.n_merges + self.n_extends + self.n_clips + self.n_deletes + self.n_circular_merges
    }

    /// Single-line JSON encoding
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Log the report via tracing
    pub fn log(&self) {
        tracing::info!(
            "updates={} unique={} unodes={} dnodes={} (full={} tips={} islands={} trivial={} circular={})",
            self.n_updates,
            self.n_unique,
            self.n_unodes,
            self.n_dnodes,
            self.n_full,
            self.n_tips,
            self.n_islands,
            self.n_trivial,
            self.n_circular
        );
        tracing::debug!(
            "  ops: splits={} merges={} extends={} clips={} deletes={} circular_merges={}",
            self.n_splits,
            self.n_merges,
            self.n_extends,
            self.n_clips,
            self.n_deletes,
            self.n_circular_merges
        );
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cDBG Report:")?;
        writeln!(f, "  updates:          {}", self.n_updates)?;
        writeln!(f, "  novel sequences:  {}", self.n_novel_sequences)?;
        writeln!(f, "  unique k-mers:    {}", self.n_unique)?;
        writeln!(f, "  unitig nodes:     {}", self.n_unodes)?;
        writeln!(f, "  decision nodes:   {}", self.n_dnodes)?;
        writeln!(f, "  unitig ends:      {}", self.n_unitig_ends)?;
        writeln!(
            f,
            "  meta:             full={} tips={} islands={} trivial={} circular={}",
            self.n_full, self.n_tips, self.n_islands, self.n_trivial, self.n_circular
        )?;
        writeln!(
            f,
            "  operations:       splits={} merges={} extends={} clips={} deletes={} circular_merges={}",
            self.n_splits, self.n_merges, self.n_extends, self.n_clips, self.n_deletes, self.n_circular_merges
        )?;
        write!(f, "  estimated FP:     {:.6}", self.estimated_fp)
    }
}
