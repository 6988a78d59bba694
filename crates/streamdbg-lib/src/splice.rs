//! Unitig extension across retired unitigs
//!
//! When an update creates no decision k-mer, every unitig the new k-mers
//! touch gained its neighbour at a dead end. A walk from a new k-mer then
//! never has to step through an old unitig one k-mer at a time: arriving at
//! one of its ends means consuming the whole path, so the walker copies the
//! stored bases (reverse complemented when entered from the other strand)
//! and carries on from the far end. The work of an update is bounded by its
//! new k-mers and the number of unitigs it joins, not by their length.

use crate::cdbg::{UnitigMeta, UnitigNode};
use crate::constants::Hash;
use crate::dbg::{Dbg, Direction};
use crate::encoding::reverse_complement;
use crate::error::{CdbgError, Result};
use crate::kmer::KmerHasher;
use crate::store::KmerStore;
use crate::walker::TraversalState;
use ahash::{AHashMap, AHashSet};
use std::borrow::Cow;

/// Unitigs taken out of the cDBG for the current update, indexed by end hash
#[derive(Debug, Default)]
pub struct Retired {
    unitigs: AHashMap<u64, UnitigNode>,
    by_end: AHashMap<Hash, u64>,
}

impl Retired {
    /// Add a removed unitig
    pub fn insert(&mut self, unitig: UnitigNode) {
        self.by_end.insert(unitig.left_end, unitig.node_id);
        self.by_end.insert(unitig.right_end, unitig.node_id);
        self.unitigs.insert(unitig.node_id, unitig);
    }

    /// Retired unitig with an end k-mer hashing to `hash`
    pub fn by_end(&self, hash: Hash) -> Option<&UnitigNode> {
        self.by_end.get(&hash).and_then(|id| self.unitigs.get(id))
    }

    /// Ids of every retired unitig
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.unitigs.keys().copied()
    }
}

/// A unitig assembled from new k-mers and whole retired unitigs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spliced {
    /// Bases in reading order
    pub sequence: Vec<u8>,
    /// Hash of the first k-mer
    pub left_end: Hash,
    /// Hash of the last k-mer (the first one again for a cycle)
    pub right_end: Hash,
    /// Topological class
    pub meta: UnitigMeta,
    /// Retired unitigs crossed, in walk order
    pub contributors: Vec<u64>,
    /// New k-mers consumed, seed included
    pub new_hashes: Vec<Hash>,
    /// K-mers stepped through one at a time, seed included
    pub n_walked: usize,
}

#[derive(Debug)]
struct Side {
    steps: Vec<u8>,
    head: Hash,
    end_state: TraversalState,
    closed: bool,
}

/// Walker that consumes new k-mers one by one and retired unitigs whole
pub struct SpliceWalker<'a, S: KmerStore, H: KmerHasher> {
    graph: &'a Dbg<S, H>,
    retired: &'a Retired,
    new_kmers: &'a AHashSet<Hash>,
    seen: AHashSet<Hash>,
    contributors: Vec<u64>,
    new_hashes: Vec<Hash>,
    n_walked: usize,
}

impl<'a, S: KmerStore, H: KmerHasher> SpliceWalker<'a, S, H> {
    /// Create a walker over `graph` for one update
    pub fn new(graph: &'a Dbg<S, H>, retired: &'a Retired, new_kmers: &'a AHashSet<Hash>) -> Self {
        Self {
            graph,
            retired,
            new_kmers,
            seen: AHashSet::new(),
            contributors: Vec::new(),
            new_hashes: Vec::new(),
            n_walked: 0,
        }
    }

    /// Assemble the unitig through the new k-mer `seed`
    pub fn walk(&mut self, seed: &[u8]) -> Result<Spliced> {
        let seed_hash = self.graph.hash(seed)?;
        if !self.new_kmers.contains(&seed_hash) {
            return Err(CdbgError::topology(format!(
                "splice seed {} is not a new k-mer",
                String::from_utf8_lossy(seed)
            )));
        }
        self.seen.clear();
        self.seen.insert(seed_hash);
        self.contributors.clear();
        self.new_hashes.clear();
        self.new_hashes.push(seed_hash);
        self.n_walked = 1;

        let right = self.side(seed, seed_hash, Direction::Right)?;
        let circular = right.end_state == TraversalState::StopSeen && right.closed;
        let left = if circular {
            Side {
                steps: Vec::new(),
                head: seed_hash,
                end_state: TraversalState::StopSeen,
                closed: true,
            }
        } else {
            self.side(seed, seed_hash, Direction::Left)?
        };

        let mut sequence = Vec::with_capacity(left.steps.len() + seed.len() + right.steps.len());
        sequence.extend(left.steps.iter().rev());
        sequence.extend_from_slice(seed);
        sequence.extend_from_slice(&right.steps);

        let meta = UnitigMeta::from_ends(
            circular,
            left.steps.is_empty() && right.steps.is_empty(),
            left.end_state,
            right.end_state,
        );
        Ok(Spliced {
            sequence,
            left_end: left.head,
            right_end: if circular { left.head } else { right.head },
            meta,
            contributors: std::mem::take(&mut self.contributors),
            new_hashes: std::mem::take(&mut self.new_hashes),
            n_walked: self.n_walked,
        })
    }

    fn side(&mut self, seed: &[u8], seed_hash: Hash, direction: Direction) -> Result<Side> {
        let k = self.graph.k();
        let retired = self.retired;
        let branch_state = match direction {
            Direction::Right => TraversalState::DecisionFwd,
            Direction::Left => TraversalState::DecisionBkw,
        };
        let mut side = Side {
            steps: Vec::new(),
            head: seed_hash,
            end_state: TraversalState::Running,
            closed: false,
        };

        let mut cursor = seed.to_vec();
        while side.end_state == TraversalState::Running {
            let mut exts = self.graph.extensions(&cursor, direction)?;
            if exts.len() != 1 {
                side.end_state = if exts.is_empty() {
                    TraversalState::StopFwd
                } else {
                    branch_state
                };
                break;
            }
            let next = exts.swap_remove(0);
            if self.seen.contains(&next.hash) {
                side.closed = next.kmer == seed;
                side.end_state = TraversalState::StopSeen;
            } else if self.graph.is_decision(&next.kmer)? {
                side.end_state = branch_state;
            } else if self.new_kmers.contains(&next.hash) {
                self.seen.insert(next.hash);
                self.new_hashes.push(next.hash);
                self.n_walked += 1;
                side.steps.push(next.base);
                side.head = next.hash;
                cursor = next.kmer;
            } else {
                let unitig = retired.by_end(next.hash).ok_or_else(|| {
                    CdbgError::topology(format!(
                        "walk entered an old unitig away from its ends at {}",
                        String::from_utf8_lossy(&next.kmer)
                    ))
                })?;
                let (path, exit) = orient(unitig, &next.kmer, direction, k)?;
                match direction {
                    Direction::Right => {
                        side.steps.extend_from_slice(&path[k - 1..]);
                        cursor = path[path.len() - k..].to_vec();
                    }
                    Direction::Left => {
                        side.steps.extend(path[..path.len() + 1 - k].iter().rev());
                        cursor = path[..k].to_vec();
                    }
                }
                self.seen.insert(unitig.left_end);
                self.seen.insert(unitig.right_end);
                self.contributors.push(unitig.node_id);
                side.head = exit;
            }
        }
        Ok(side)
    }
}

/// `unitig` read so that it starts (walking right) or ends (walking left)
/// with `entry`, along with the hash of the end the walk leaves it by
fn orient<'u>(unitig: &'u UnitigNode, entry: &[u8], direction: Direction, k: usize) -> Result<(Cow<'u, [u8]>, Hash)> {
    let seq = unitig.sequence.as_bytes();
    let (stored, exit_stored, exit_flipped) = match direction {
        Direction::Right => (unitig.first_kmer(k), unitig.right_end, unitig.left_end),
        Direction::Left => (unitig.last_kmer(k), unitig.left_end, unitig.right_end),
    };
    if entry == stored {
        return Ok((Cow::Borrowed(seq), exit_stored));
    }
    let flipped = reverse_complement(seq);
    let matches = match direction {
        Direction::Right => &flipped[..k] == entry,
        Direction::Left => &flipped[flipped.len() - k..] == entry,
    };
    if matches {
        return Ok((Cow::Owned(flipped), exit_flipped));
    }
    Err(CdbgError::topology(format!(
        "unitig {} cannot be entered at {}",
        unitig.node_id,
        String::from_utf8_lossy(entry)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::{CanonicalHasher, ForwardHasher};
    use crate::store::ExactStore;

    fn unitig(node_id: u64, seq: &str, left_end: Hash, right_end: Hash) -> UnitigNode {
        UnitigNode {
            node_id,
            sequence: seq.to_string(),
            left_end,
            right_end,
            meta: UnitigMeta::Island,
        }
    }

    #[test]
    fn test_orient_reads_either_strand() {
        let u = unitig(7, "ACGGATT", 1, 2);
        let (path, exit) = orient(&u, b"ACGGA", Direction::Right, 5).unwrap();
        assert_eq!(&*path, b"ACGGATT");
        assert_eq!(exit, 2);
        let (path, exit) = orient(&u, b"AATCC", Direction::Right, 5).unwrap();
        assert_eq!(&*path, b"AATCCGT");
        assert_eq!(exit, 1);
        let (path, exit) = orient(&u, b"GGATT", Direction::Left, 5).unwrap();
        assert_eq!(&*path, b"ACGGATT");
        assert_eq!(exit, 1);
        assert!(orient(&u, b"CGGAT", Direction::Right, 5).is_err());
    }

    #[test]
    fn test_walk_appends_to_retired_unitig() {
        let k = 5;
        let old = b"ACGGATTCAG";
        let mut graph = Dbg::new(ExactStore::new(), ForwardHasher::new(k));
        graph.insert_sequence(old).unwrap();
        let mut retired = Retired::default();
        retired.insert(unitig(
            3,
            "ACGGATTCAG",
            graph.hash(b"ACGGA").unwrap(),
            graph.hash(b"TTCAG").unwrap(),
        ));

        let read = b"TTCAGCTTA";
        let mut new_kmers = AHashSet::new();
        for h in graph.hashes(&read[1..]).unwrap() {
            new_kmers.insert(h);
        }
        graph.insert_sequence(read).unwrap();

        let mut walker = SpliceWalker::new(&graph, &retired, &new_kmers);
        let spliced = walker.walk(&read[1..6]).unwrap();
        assert_eq!(spliced.sequence, b"ACGGATTCAGCTTA".to_vec());
        assert_eq!(spliced.contributors, vec![3]);
        assert_eq!(spliced.new_hashes.len(), 4);
        assert_eq!(spliced.n_walked, 4);
        assert_eq!(spliced.left_end, graph.hash(b"ACGGA").unwrap());
        assert_eq!(spliced.right_end, graph.hash(b"GCTTA").unwrap());
        assert_eq!(spliced.meta, UnitigMeta::Island);
    }

    #[test]
    fn test_walk_crosses_reverse_strand_unitig() {
        let k = 5;
        let mut graph = Dbg::new(ExactStore::new(), CanonicalHasher::new(k));
        graph.insert_sequence(b"ACGGATTCAG").unwrap();
        // stored on the strand opposite to the incoming read
        let stored = String::from_utf8(reverse_complement(b"ACGGATTCAG")).unwrap();
        let mut retired = Retired::default();
        retired.insert(unitig(
            9,
            &stored,
            graph.hash(b"TTCAG").unwrap(),
            graph.hash(b"ACGGA").unwrap(),
        ));

        let read = b"TTCAGTGGC";
        let mut new_kmers = AHashSet::new();
        for h in graph.hashes(&read[1..]).unwrap() {
            new_kmers.insert(h);
        }
        graph.insert_sequence(read).unwrap();

        let mut walker = SpliceWalker::new(&graph, &retired, &new_kmers);
        let spliced = walker.walk(&read[4..]).unwrap();
        assert_eq!(spliced.sequence, b"ACGGATTCAGTGGC".to_vec());
        assert_eq!(spliced.contributors, vec![9]);
        assert_eq!(spliced.n_walked, 4);
    }
}
