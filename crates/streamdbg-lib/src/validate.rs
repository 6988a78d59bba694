//! Rebuild audit
//!
//! Rebuilds the cDBG statically from the k-mer set of the base graph and
//! compares it against the incrementally maintained one. Decision k-mers are
//! found with a parallel scan; unitigs are compared by (length, meta, k-mer
//! signature), which does not depend on orientation or on where a circular
//! unitig was cut.

use crate::cdbg::UnitigMeta;
use crate::compactor::StreamingCompactor;
use crate::constants::Hash;
use crate::error::{CdbgError, Result};
use crate::hasher::DeterministicHasher;
use crate::kmer::KmerHasher;
use crate::store::KmerStore;
use crate::walker::UnitigWalker;
use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of [`validate_against_rebuild`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// K-mers in the base graph
    pub n_kmers: u64,
    /// Decision nodes in the rebuild
    pub expected_dnodes: usize,
    /// Decision nodes in the incremental cDBG
    pub observed_dnodes: usize,
    /// Rebuild decisions absent from the incremental cDBG
    pub missing_dnodes: usize,
    /// Incremental decisions absent from the rebuild
    pub extra_dnodes: usize,
    /// Unitigs in the rebuild
    pub expected_unodes: usize,
    /// Unitigs in the incremental cDBG
    pub observed_unodes: usize,
    /// Rebuild unitigs with no incremental counterpart
    pub missing_unodes: usize,
    /// Incremental unitigs with no rebuild counterpart
    pub extra_unodes: usize,
}

impl ValidationReport {
    /// Whether both graphs agree
    pub fn is_consistent(&self) -> bool {
        self.missing_dnodes == 0 && self.extra_dnodes == 0 && self.missing_unodes == 0 && self.extra_unodes == 0
    }
}

type Signature = (usize, UnitigMeta, u64);

fn multiset_difference(a: &AHashMap<Signature, usize>, b: &AHashMap<Signature, usize>) -> usize {
    a.iter()
        .map(|(sig, &n)| n.saturating_sub(b.get(sig).copied().unwrap_or(0)))
        .sum()
}

/// Compare the compactor's cDBG against a from-scratch rebuild
pub fn validate_against_rebuild<S, H>(compactor: &StreamingCompactor<S, H>) -> Result<ValidationReport>
where
    S: KmerStore,
    H: KmerHasher,
{
    let dbg = compactor.dbg();
    let cdbg = compactor.cdbg();
    let hasher = dbg.hasher();
    let mixer = DeterministicHasher::new(compactor.config().seed);

    let mut hashes = dbg.store().hashes();
    hashes.sort_unstable();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(compactor.config().num_threads)
        .build()
        .map_err(|e| CdbgError::InvalidConfig(format!("Failed to create thread pool: {e}")))?;
    let flags: Vec<bool> = pool.install(|| {
        hashes
            .par_iter()
            .map(|&h| dbg.is_decision(hasher.unhash(h).as_bytes()))
            .collect::<Result<_>>()
    })?;
    let expected_decisions: AHashSet<Hash> = hashes
        .iter()
        .zip(flags.iter())
        .filter_map(|(&h, &is_decision)| is_decision.then_some(h))
        .collect();

    let observed_decisions: AHashSet<Hash> = cdbg.all_decisions().map(|d| d.hash).collect();

    let mut expected: AHashMap<Signature, usize> = AHashMap::new();
    let mut covered: AHashSet<Hash> = AHashSet::new();
    let mut walker = UnitigWalker::new(dbg);
    for &h in &hashes {
        if expected_decisions.contains(&h) || covered.contains(&h) {
            continue;
        }
        let walk = walker.walk(hasher.unhash(h).as_bytes())?;
        let unitig_hashes = walk.hashes();
        let sig = (
            unitig_hashes.len(),
            UnitigMeta::classify(&walk),
            mixer.signature(unitig_hashes.iter().copied()),
        );
        covered.extend(unitig_hashes);
        *expected.entry(sig).or_insert(0) += 1;
    }

    let mut observed: AHashMap<Signature, usize> = AHashMap::new();
    for unitig in cdbg.all_unitigs() {
        let unitig_hashes = dbg.hashes(unitig.sequence.as_bytes())?;
        let sig = (
            unitig_hashes.len(),
            unitig.meta,
            mixer.signature(unitig_hashes.iter().copied()),
        );
        *observed.entry(sig).or_insert(0) += 1;
    }

    let report = ValidationReport {
        n_kmers: hashes.len() as u64,
        expected_dnodes: expected_decisions.len(),
        observed_dnodes: observed_decisions.len(),
        missing_dnodes: expected_decisions.difference(&observed_decisions).count(),
        extra_dnodes: observed_decisions.difference(&expected_decisions).count(),
        expected_unodes: expected.values().sum(),
        observed_unodes: observed.values().sum(),
        missing_unodes: multiset_difference(&expected, &observed),
        extra_unodes: multiset_difference(&observed, &expected),
    };

    if report.is_consistent() {
        info!(
            "Validation passed: {} decision nodes, {} unitigs",
            report.observed_dnodes, report.observed_unodes
        );
    } else {
        warn!(
            "Validation failed: dnodes missing={} extra={}, unitigs missing={} extra={}",
            report.missing_dnodes, report.extra_dnodes, report.missing_unodes, report.extra_unodes
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompactorConfig;
    use crate::kmer::ForwardHasher;
    use crate::store::ExactStore;

    #[test]
    fn test_fork_matches_rebuild() {
        let config = CompactorConfig {
            k: 4,
            canonical: false,
            num_threads: 1,
            ..CompactorConfig::default()
        };
        let mut c = StreamingCompactor::with_parts(config, ExactStore::new(), ForwardHasher::new(4)).unwrap();
        c.update(b"TTAACGTC").unwrap();
        c.update(b"AACGA").unwrap();
        c.update(b"GGATTCAGC").unwrap();
        let report = validate_against_rebuild(&c).unwrap();
        assert!(report.is_consistent(), "{:?}", report);
        assert_eq!(report.expected_dnodes, 1);
        assert_eq!(report.expected_unodes, 4);
        assert_eq!(report.n_kmers, 12);
    }
}
