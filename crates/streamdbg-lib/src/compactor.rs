//! Streaming compactor: applies one sequence at a time to the cDBG
//!
//! An update inserts the sequence's k-mers into the base graph and then
//! rebuilds only the part of the cDBG the new k-mers can affect:
//!
//! 1. the new k-mers are found and cut into non-branching sub-runs at
//!    decision k-mers;
//! 2. every old k-mer adjacent to a new k-mer is "touched", and the unitig
//!    owning it is retired: its end gained a neighbour (extend or merge),
//!    or it now holds a decision k-mer (split, clip or delete);
//! 3. new decision nodes are materialized;
//! 4. unitigs are re-walked from the first k-mer of every sub-run, the ends
//!    of retired unitigs and the neighbours of new decision nodes.
//!
//! An update that creates no decision k-mer only extends or merges unitigs
//! at their dead ends. Step 4 then runs as a splice: walks cover the new
//! k-mers and jump across each retired unitig in one step (see
//! [`crate::splice`]).
//!
//! Unitigs that are not retired keep their sequence and their meta tag: a
//! unitig's neighbourhood can only change through one of its own k-mers
//! being touched.

use crate::cdbg::{CompactGraph, UnitigMeta};
use crate::config::CompactorConfig;
use crate::constants::Hash;
use crate::dbg::{Dbg, Direction};
use crate::encoding::validate_dna;
use crate::error::{CdbgError, Result};
use crate::kmer::{AnyHasher, KmerHasher};
use crate::report::Report;
use crate::segments::{find_decision_kmers, find_new_segments};
use crate::splice::{Retired, SpliceWalker};
use crate::store::{AnyStore, KmerStore};
use crate::walker::{TraversalState, UnitigWalker};
use ahash::{AHashMap, AHashSet};
use tracing::trace;

/// What a single update changed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Distinct k-mers added to the base graph
    pub n_new_kmers: usize,
    /// New-k-mer segments in the sequence
    pub n_new_segments: usize,
    /// Decision nodes created
    pub n_new_decisions: usize,
    /// Unitigs removed before re-walking
    pub n_retired: usize,
    /// Unitigs created by re-walking
    pub n_created: usize,
    /// K-mers stepped through one at a time while rebuilding
    pub n_walked: usize,
}

impl UpdateSummary {
    /// Whether the update left the cDBG untouched
    pub fn is_noop(&self) -> bool {
        self.n_new_kmers == 0
    }
}

/// A base graph together with its incrementally maintained cDBG
#[derive(Debug, Clone)]
pub struct StreamingCompactor<S: KmerStore, H: KmerHasher> {
    config: CompactorConfig,
    dbg: Dbg<S, H>,
    cdbg: CompactGraph,
    report: Report,
}

/// Compactor whose store and strand policy come from its configuration
pub type DynCompactor = StreamingCompactor<AnyStore, AnyHasher>;

impl StreamingCompactor<AnyStore, AnyHasher> {
    /// Build a compactor from a configuration alone
    pub fn new(config: CompactorConfig) -> Result<Self> {
        config.validate().map_err(CdbgError::InvalidConfig)?;
        let store = AnyStore::build(config.store);
        let hasher = AnyHasher::new(config.k, config.canonical);
        Self::with_parts(config, store, hasher)
    }
}

impl<S: KmerStore, H: KmerHasher> StreamingCompactor<S, H> {
    /// Build a compactor over an explicit store and hasher
    pub fn with_parts(config: CompactorConfig, store: S, hasher: H) -> Result<Self> {
        config.validate().map_err(CdbgError::InvalidConfig)?;
        if hasher.k() != config.k {
            return Err(CdbgError::InvalidConfig(format!(
                "hasher k={} does not match configured k={}",
                hasher.k(),
                config.k
            )));
        }
        if config.verbose {
            config.print();
        }
        Ok(Self {
            config,
            dbg: Dbg::new(store, hasher),
            cdbg: CompactGraph::new(),
            report: Report::default(),
        })
    }

    /// K-mer size
    #[inline]
    pub fn k(&self) -> usize {
        self.dbg.k()
    }

    /// Configuration
    pub fn config(&self) -> &CompactorConfig {
        &self.config
    }

    /// The base graph
    pub fn dbg(&self) -> &Dbg<S, H> {
        &self.dbg
    }

    /// The node store
    pub fn cdbg(&self) -> &CompactGraph {
        &self.cdbg
    }

    /// Counters as of the last completed update
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// A walker over the base graph for assembly queries
    pub fn walker(&self) -> UnitigWalker<'_, S, H> {
        UnitigWalker::new(&self.dbg)
    }

    /// Decision k-mers of `sequence` in the current graph; read-only
    pub fn find_decision_kmers(&self, sequence: &[u8]) -> Result<Vec<(usize, Hash)>> {
        find_decision_kmers(&self.dbg, sequence)
    }

    /// Alias of [`StreamingCompactor::update`]
    pub fn insert_sequence(&mut self, sequence: &[u8]) -> Result<UpdateSummary> {
        self.update(sequence)
    }

    /// Insert `sequence` and bring the cDBG back in line with the base graph
    ///
    /// On `InconsistentTopology` the graph must be treated as unusable.
    pub fn update(&mut self, sequence: &[u8]) -> Result<UpdateSummary> {
        let k = self.k();
        if sequence.len() < k {
            return Err(CdbgError::InvalidKmerLength {
                length: sequence.len(),
                k,
            });
        }
        validate_dna(sequence)?;
        self.report.n_updates += 1;

        // node sequences are stored uppercase
        let sequence = sequence.to_ascii_uppercase();
        let summary = self.apply(&sequence)?;

        if !summary.is_noop() {
            self.report.n_novel_sequences += 1;
            self.report.n_new_segments += summary.n_new_segments as u64;
        }
        self.report
            .refresh(&self.cdbg, self.dbg.n_unique(), self.dbg.estimated_fp());
        if self.config.report_interval > 0 && self.report.n_updates % self.config.report_interval == 0 {
            self.report.log();
        }
        Ok(summary)
    }

    fn apply(&mut self, sequence: &[u8]) -> Result<UpdateSummary> {
        let k = self.k();
        let scan = find_new_segments(&mut self.dbg, sequence)?;
        let mut summary = UpdateSummary {
            n_new_kmers: scan.new_kmers.len(),
            n_new_segments: scan.n_new_segments(),
            ..UpdateSummary::default()
        };
        if scan.new_kmers.is_empty() {
            return Ok(summary);
        }
        let new_kmers = &scan.new_kmers;

        // Seeds and new decisions from the sub-runs, left to right
        let mut run_seeds: Vec<Vec<u8>> = Vec::new();
        let mut decisions: Vec<(Hash, Vec<u8>)> = Vec::new();
        for segment in scan.new_segments() {
            for run in segment.sub_runs() {
                let kmer = sequence[run.start..run.start + k].to_vec();
                if run.is_decision {
                    decisions.push((scan.hashes[run.start], kmer));
                } else {
                    run_seeds.push(kmer);
                }
            }
        }

        // Old k-mers adjacent to new ones, starting with the segment anchors
        let mut touched_seen: AHashSet<Hash> = AHashSet::new();
        let mut touched: Vec<(Hash, Vec<u8>)> = Vec::new();
        for segment in scan.new_segments() {
            let anchors = [
                segment.left_anchor.map(|h| (h, segment.start - 1)),
                segment.right_anchor.map(|h| (h, segment.end())),
            ];
            for (hash, pos) in anchors.into_iter().flatten() {
                if touched_seen.insert(hash) {
                    touched.push((hash, sequence[pos..pos + k].to_vec()));
                }
            }
        }
        let mut expanded: AHashSet<Hash> = AHashSet::new();
        for (pos, &h) in scan.hashes.iter().enumerate() {
            if !new_kmers.contains(&h) || !expanded.insert(h) {
                continue;
            }
            let kmer = &sequence[pos..pos + k];
            for direction in [Direction::Left, Direction::Right] {
                for ext in self.dbg.extensions_where(kmer, direction, |x| !new_kmers.contains(&x))? {
                    if touched_seen.insert(ext.hash) {
                        touched.push((ext.hash, ext.kmer));
                    }
                }
            }
        }

        // Owning unitigs of touched k-mers
        let mut retired: Vec<u64> = Vec::new();
        let mut retired_set: AHashSet<u64> = AHashSet::new();
        for (hash, kmer) in &touched {
            if self.cdbg.has_dnode(*hash) {
                continue;
            }
            if !self.dbg.is_decision(kmer)? {
                // a neighbour gained on a dead end: the k-mer closes its unitig
                let owner = self
                    .cdbg
                    .query_unode_end(*hash)
                    .ok_or_else(|| {
                        CdbgError::topology(format!(
                            "anchor {} resolves to no unitig end",
                            String::from_utf8_lossy(kmer)
                        ))
                    })?
                    .node_id;
                if retired_set.insert(owner) {
                    retired.push(owner);
                }
                continue;
            }

            let owner = self.owning_unitig(kmer, *hash, new_kmers)?;
            if retired_set.insert(owner) {
                retired.push(owner);
            }
            let unitig = self
                .cdbg
                .unitig(owner)
                .ok_or_else(|| CdbgError::topology(format!("unitig {} vanished", owner)))?;
            if !unitig.is_circular() && (unitig.left_end == *hash || unitig.right_end == *hash) {
                if unitig.n_kmers(k) == 1 {
                    trace!("delete trivial unitig {} at {}", owner, String::from_utf8_lossy(kmer));
                    self.report.n_deletes += 1;
                } else {
                    trace!("clip unitig {} at {}", owner, String::from_utf8_lossy(kmer));
                    self.report.n_clips += 1;
                }
            } else {
                trace!("split unitig {} at {}", owner, String::from_utf8_lossy(kmer));
                self.report.n_splits += 1;
            }
            decisions.push((*hash, kmer.clone()));
        }
        summary.n_retired = retired.len();

        if decisions.is_empty() {
            self.splice(&run_seeds, &retired, new_kmers, &mut summary)?;
        } else {
            self.rewalk(&run_seeds, &retired, &decisions, new_kmers, &mut summary)?;
        }
        Ok(summary)
    }

    /// Rebuild after an update that created no decision k-mer: walks cross
    /// retired unitigs whole instead of re-walking them
    fn splice(
        &mut self,
        run_seeds: &[Vec<u8>],
        retired: &[u64],
        new_kmers: &AHashSet<Hash>,
        summary: &mut UpdateSummary,
    ) -> Result<()> {
        let mut pool = Retired::default();
        for &id in retired {
            let unitig = self
                .cdbg
                .remove_unitig(id)
                .ok_or_else(|| CdbgError::topology(format!("unitig {} retired twice", id)))?;
            pool.insert(unitig);
        }

        let mut covered: AHashSet<Hash> = AHashSet::new();
        let mut spliced: AHashSet<u64> = AHashSet::new();
        let mut walker = SpliceWalker::new(&self.dbg, &pool, new_kmers);
        for seed in run_seeds {
            if covered.contains(&self.dbg.hash(seed)?) {
                continue;
            }
            let unitig = walker.walk(seed)?;
            for &id in &unitig.contributors {
                if !spliced.insert(id) {
                    return Err(CdbgError::topology(format!("unitig {} spliced twice", id)));
                }
            }
            covered.extend(unitig.new_hashes.iter().copied());
            summary.n_walked += unitig.n_walked;

            count_operations(&mut self.report, &unitig.contributors, unitig.new_hashes.len(), unitig.meta);
            let glued = String::from_utf8_lossy(&unitig.sequence).into_owned();
            self.cdbg
                .insert_unitig(glued, unitig.left_end, unitig.right_end, unitig.meta)?;
            summary.n_created += 1;
        }

        if let Some(h) = new_kmers.iter().find(|h| !covered.contains(*h)) {
            return Err(CdbgError::topology(format!(
                "k-mer {} left without a node",
                self.dbg.hasher().unhash(*h)
            )));
        }
        if let Some(id) = pool.ids().find(|id| !spliced.contains(id)) {
            return Err(CdbgError::topology(format!("retired unitig {} was never rebuilt", id)));
        }
        Ok(())
    }

    /// Rebuild after an update that created decision k-mers: retired unitigs
    /// are re-walked from both ends and from every new decision's neighbours
    fn rewalk(
        &mut self,
        run_seeds: &[Vec<u8>],
        retired: &[u64],
        decisions: &[(Hash, Vec<u8>)],
        new_kmers: &AHashSet<Hash>,
        summary: &mut UpdateSummary,
    ) -> Result<()> {
        let k = self.k();

        // Retire
        let mut retired_of: AHashMap<Hash, u64> = AHashMap::new();
        let mut end_seeds: Vec<Vec<u8>> = Vec::new();
        for &id in retired {
            let unitig = self
                .cdbg
                .remove_unitig(id)
                .ok_or_else(|| CdbgError::topology(format!("unitig {} retired twice", id)))?;
            for h in self.dbg.hashes(unitig.sequence.as_bytes())? {
                retired_of.insert(h, id);
            }
            end_seeds.push(unitig.first_kmer(k).to_vec());
            end_seeds.push(unitig.last_kmer(k).to_vec());
        }

        // Materialize decisions; their non-decision neighbours become seeds
        let mut decision_seeds: Vec<Vec<u8>> = Vec::new();
        for (hash, kmer) in decisions {
            let literal = String::from_utf8_lossy(kmer).into_owned();
            if self.cdbg.insert_decision(*hash, literal)? {
                trace!("new decision node {}", String::from_utf8_lossy(kmer));
                summary.n_new_decisions += 1;
                for direction in [Direction::Left, Direction::Right] {
                    for ext in self.dbg.extensions(kmer, direction)? {
                        decision_seeds.push(ext.kmer);
                    }
                }
            }
        }

        // Re-walk
        let mut covered: AHashSet<Hash> = AHashSet::new();
        let mut walker = UnitigWalker::new(&self.dbg);
        for seed in run_seeds.iter().chain(end_seeds.iter()).chain(decision_seeds.iter()) {
            let seed_hash = self.dbg.hash(seed)?;
            if covered.contains(&seed_hash) || self.cdbg.has_dnode(seed_hash) {
                continue;
            }
            let walk = walker.walk(seed)?;
            if walk.right.end_state == TraversalState::BadSeed {
                return Err(CdbgError::topology(format!(
                    "seed {} is not in the base graph",
                    String::from_utf8_lossy(seed)
                )));
            }
            let hashes = walk.hashes();
            let mut contributors: Vec<u64> = hashes.iter().filter_map(|h| retired_of.get(h).copied()).collect();
            contributors.sort_unstable();
            contributors.dedup();
            let n_new = hashes.iter().filter(|h| new_kmers.contains(h)).count();
            covered.extend(hashes.iter().copied());
            summary.n_walked += hashes.len();

            let meta = UnitigMeta::classify(&walk);
            count_operations(&mut self.report, &contributors, n_new, meta);
            let glued = String::from_utf8_lossy(&walk.glue()).into_owned();
            self.cdbg
                .insert_unitig(glued, walk.left_end(), walk.right_end(), meta)?;
            summary.n_created += 1;
        }

        // Every retired or new k-mer now sits in a fresh unitig or a decision
        for h in retired_of.keys().chain(new_kmers.iter()) {
            if !covered.contains(h) && !self.cdbg.has_dnode(*h) {
                return Err(CdbgError::topology(format!(
                    "k-mer {} left without a node",
                    self.dbg.hasher().unhash(*h)
                )));
            }
        }
        Ok(())
    }

    /// Find the unitig holding `kmer`, walking the graph as it was before the
    /// current update until a unitig end is reached
    fn owning_unitig(&self, kmer: &[u8], hash: Hash, new_kmers: &AHashSet<Hash>) -> Result<u64> {
        if let Some(unitig) = self.cdbg.query_unode_end(hash) {
            return Ok(unitig.node_id);
        }
        let mut cursor = kmer.to_vec();
        let mut seen: AHashSet<Hash> = AHashSet::new();
        seen.insert(hash);
        loop {
            let mut exts = self
                .dbg
                .extensions_where(&cursor, Direction::Right, |x| !new_kmers.contains(&x))?;
            if exts.len() != 1 {
                return Err(CdbgError::topology(format!(
                    "k-mer {} is not inside any unitig",
                    String::from_utf8_lossy(kmer)
                )));
            }
            let next = exts.swap_remove(0);
            if let Some(unitig) = self.cdbg.query_unode_end(next.hash) {
                return Ok(unitig.node_id);
            }
            if !seen.insert(next.hash) {
                return Err(CdbgError::topology(format!(
                    "k-mer {} lies on a cycle with no unitig",
                    String::from_utf8_lossy(kmer)
                )));
            }
            cursor = next.kmer;
        }
    }

    /// Connected components on a thread pool sized by `num_threads`
    pub fn find_connected_components(&self) -> Result<crate::cdbg::ComponentReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| CdbgError::InvalidConfig(format!("Failed to create thread pool: {e}")))?;
        pool.install(|| {
            self.cdbg
                .find_connected_components(&self.dbg, self.config.component_sample())
        })
    }
}

/// Attribute a rebuilt unitig to merge, extend and circular-merge counts
fn count_operations(report: &mut Report, contributors: &[u64], n_new: usize, meta: UnitigMeta) {
    if contributors.len() >= 2 {
        trace!("merge unitigs {:?}", contributors);
        report.n_merges += contributors.len() as u64 - 1;
    } else if contributors.len() == 1 && n_new > 0 {
        trace!("extend unitig {}", contributors[0]);
        report.n_extends += 1;
    }
    if meta == UnitigMeta::Circular && !contributors.is_empty() {
        trace!("circular merge of {:?}", contributors);
        report.n_circular_merges += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::{CanonicalHasher, ForwardHasher};
    use crate::store::ExactStore;
    use crate::validate::validate_against_rebuild;

    fn compactor(k: usize) -> StreamingCompactor<ExactStore, ForwardHasher> {
        let config = CompactorConfig {
            k,
            canonical: false,
            ..CompactorConfig::default()
        };
        StreamingCompactor::with_parts(config, ExactStore::new(), ForwardHasher::new(k)).unwrap()
    }

    fn canonical_compactor(k: usize) -> StreamingCompactor<ExactStore, CanonicalHasher> {
        let config = CompactorConfig {
            k,
            num_threads: 1,
            ..CompactorConfig::default()
        };
        StreamingCompactor::with_parts(config, ExactStore::new(), CanonicalHasher::new(k)).unwrap()
    }

    fn sequences(c: &StreamingCompactor<ExactStore, ForwardHasher>) -> Vec<String> {
        let mut seqs: Vec<String> = c.cdbg().all_unitigs().map(|u| u.sequence.clone()).collect();
        seqs.sort();
        seqs
    }

    #[test]
    fn test_single_sequence_is_island() {
        let mut c = compactor(5);
        let summary = c.update(b"ACGGATTCAGCTTAGC").unwrap();
        assert_eq!(summary.n_created, 1);
        assert_eq!(sequences(&c), vec!["ACGGATTCAGCTTAGC".to_string()]);
        let report = c.report();
        assert_eq!(report.n_unodes, 1);
        assert_eq!(report.n_islands, 1);
        assert_eq!(report.n_unique, 12);
        assert_eq!(report.n_updates, 1);
    }

    #[test]
    fn test_short_or_invalid_sequence_is_rejected() {
        let mut c = compactor(5);
        assert_eq!(
            c.update(b"ACG").unwrap_err(),
            CdbgError::InvalidKmerLength { length: 3, k: 5 }
        );
        assert!(matches!(c.update(b"ACGNNACGT"), Err(CdbgError::Encoding(_))));
        assert_eq!(c.report().n_updates, 0);
        assert_eq!(c.dbg().n_unique(), 0);
    }

    #[test]
    fn test_extend_on_either_side() {
        let mut c = compactor(5);
        c.update(b"GGATTCAGC").unwrap();
        c.update(b"ACGGATT").unwrap();
        assert_eq!(sequences(&c), vec!["ACGGATTCAGC".to_string()]);
        c.update(b"CAGCTTAGC").unwrap();
        assert_eq!(sequences(&c), vec!["ACGGATTCAGCTTAGC".to_string()]);
        assert_eq!(c.report().n_extends, 2);
        assert_eq!(c.report().n_merges, 0);
    }

    #[test]
    fn test_extend_walks_only_new_kmers() {
        let mut c = compactor(5);
        c.update(b"ACGGATTCAGC").unwrap();
        let summary = c.update(b"TTCAGCTTAGC").unwrap();
        assert_eq!(summary.n_new_kmers, 5);
        assert_eq!(summary.n_walked, 5);
        assert_eq!(summary.n_retired, 1);
        assert_eq!(summary.n_created, 1);
        assert_eq!(sequences(&c), vec!["ACGGATTCAGCTTAGC".to_string()]);
        assert_eq!(c.report().n_extends, 1);
    }

    #[test]
    fn test_merge_two_islands() {
        let mut c = compactor(5);
        c.update(b"ACGGATTC").unwrap();
        c.update(b"CAGCTTAGC").unwrap();
        assert_eq!(c.report().n_unodes, 2);
        c.update(b"ATTCAGCT").unwrap();
        assert_eq!(sequences(&c), vec!["ACGGATTCAGCTTAGC".to_string()]);
        assert_eq!(c.report().n_merges, 1);
        assert_eq!(c.report().n_islands, 1);
    }

    #[test]
    fn test_fork_splits_unitig() {
        // AACG gains a second successor (k=4)
        let mut c = compactor(4);
        c.update(b"TTAACGTC").unwrap();
        c.update(b"AACGA").unwrap();
        let report = c.report();
        assert_eq!(report.n_dnodes, 1);
        assert_eq!(report.n_unodes, 3);
        assert_eq!(report.n_splits, 1);
        assert_eq!(report.n_tips, 2);
        assert_eq!(report.n_trivial, 1);
        assert_eq!(
            sequences(&c),
            vec!["ACGA".to_string(), "ACGTC".to_string(), "TTAAC".to_string()]
        );
    }

    #[test]
    fn test_reinsertion_is_noop() {
        let mut c = compactor(4);
        c.update(b"TTAACGTC").unwrap();
        c.update(b"AACGA").unwrap();
        let before = c.report().clone();
        let summary = c.update(b"TTAACGTC").unwrap();
        assert!(summary.is_noop());
        let mut after = c.report().clone();
        assert_eq!(after.n_updates, before.n_updates + 1);
        after.n_updates = before.n_updates;
        assert_eq!(after, before);
    }

    #[test]
    fn test_clip_and_delete() {
        // ACGT, the left end of an island, gains a second successor
        let mut c = compactor(4);
        c.update(b"ACGTTC").unwrap();
        c.update(b"ACGTA").unwrap();
        assert_eq!(c.report().n_clips, 1);
        assert_eq!(c.report().n_dnodes, 1);
        assert_eq!(sequences(&c), vec!["CGTA".to_string(), "CGTTC".to_string()]);

        // GCGT branches into CGTT and CGTA; the single-k-mer CGTA is deleted
        c.update(b"GCGTA").unwrap();
        let report = c.report();
        assert_eq!(report.n_deletes, 1);
        assert_eq!(report.n_clips, 2);
        assert_eq!(report.n_dnodes, 4);
        assert_eq!(sequences(&c), vec!["GTTC".to_string()]);
    }

    #[test]
    fn test_config_k_must_match_hasher() {
        let config = CompactorConfig { k: 7, ..CompactorConfig::default() };
        assert!(StreamingCompactor::with_parts(config, ExactStore::new(), ForwardHasher::new(5)).is_err());
        let config = CompactorConfig { k: 40, ..CompactorConfig::default() };
        assert!(matches!(
            StreamingCompactor::new(config),
            Err(CdbgError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_hairpin_tail_is_not_a_cycle() {
        // the read ends in CGAATTC, whose successor is its own reverse
        // complement (k=7)
        let mut c = canonical_compactor(7);
        c.update(b"TTCGGCAGGGCCTACGTTCTCGAATTCG").unwrap();
        c.update(b"ACCAGGGC").unwrap();
        assert_eq!(c.report().n_circular, 0);
        let outcome = validate_against_rebuild(&c).unwrap();
        assert!(outcome.is_consistent(), "{:?}", outcome);
    }

    #[test]
    fn test_palindromic_kmer_stays_linear() {
        // ACGT is its own reverse complement (k=4)
        let mut c = canonical_compactor(4);
        c.update(b"TTACGT").unwrap();
        let report = c.report();
        assert_eq!(report.n_unodes, 1);
        assert_eq!(report.n_islands, 1);
        assert_eq!(report.n_unitig_ends, 2);
        assert!(validate_against_rebuild(&c).unwrap().is_consistent());
    }
}
