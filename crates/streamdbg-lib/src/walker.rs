//! Unitig walker: greedy non-branching traversal of the base graph
//!
//! A walk starts from a seed k-mer and keeps consuming the single neighbour
//! on one side for as long as that neighbour is itself non-branching and has
//! not been visited during the current walk. The reason a walk stopped is
//! recorded as a [`TraversalState`].
//!
//! Walks run on the base graph only, never on cDBG nodes; the compactor uses
//! them to discover the full extent of a unitig after an update.

use crate::constants::Hash;
use crate::dbg::{Dbg, Direction};
use crate::error::Result;
use crate::kmer::KmerHasher;
use crate::store::KmerStore;
use ahash::AHashSet;
use serde::Serialize;

/// Walk state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TraversalState {
    /// Still extending
    Running,
    /// No neighbour in the walk direction (dead end)
    StopFwd,
    /// Branch ahead while walking right: the cursor has several successors
    /// or the successor is a decision k-mer, which is not consumed
    DecisionFwd,
    /// Branch ahead while walking left
    DecisionBkw,
    /// The next k-mer was already visited by this walk, on either strand
    StopSeen,
    /// The seed k-mer is not in the graph
    BadSeed,
}

impl TraversalState {
    /// Whether the walk stopped next to a decision k-mer
    #[inline]
    pub fn is_decision(self) -> bool {
        matches!(self, TraversalState::DecisionFwd | TraversalState::DecisionBkw)
    }
}

/// A one-sided walk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Walk {
    /// Seed k-mer
    pub seed: Vec<u8>,
    /// Hash of the seed k-mer
    pub seed_hash: Hash,
    /// Walk direction
    pub direction: Direction,
    /// Bases consumed, in walk order
    pub steps: Vec<u8>,
    /// Hashes of the consumed k-mers, in walk order (seed excluded)
    pub hashes: Vec<Hash>,
    /// Why the walk stopped
    pub end_state: TraversalState,
    /// Hash of the k-mer that stopped the walk without being consumed
    pub terminal: Option<Hash>,
    /// The walk came back to the seed k-mer read on the same strand
    pub closed: bool,
}

impl Walk {
    fn empty(seed: &[u8], seed_hash: Hash, direction: Direction) -> Self {
        Self {
            seed: seed.to_vec(),
            seed_hash,
            direction,
            steps: Vec::new(),
            hashes: Vec::new(),
            end_state: TraversalState::Running,
            terminal: None,
            closed: false,
        }
    }

    /// Number of k-mers consumed beyond the seed
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the walk never left the seed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Hash of the last k-mer reached (the seed for an empty walk)
    pub fn head(&self) -> Hash {
        self.hashes.last().copied().unwrap_or(self.seed_hash)
    }

    /// The walked sequence in forward reading order, seed included
    pub fn to_sequence(&self) -> Vec<u8> {
        let mut seq = Vec::with_capacity(self.seed.len() + self.steps.len());
        match self.direction {
            Direction::Right => {
                seq.extend_from_slice(&self.seed);
                seq.extend_from_slice(&self.steps);
            }
            Direction::Left => {
                seq.extend(self.steps.iter().rev());
                seq.extend_from_slice(&self.seed);
            }
        }
        seq
    }
}

/// A left walk and a right walk sharing one seed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitigWalk {
    /// Walk towards the left of the seed
    pub left: Walk,
    /// Walk towards the right of the seed
    pub right: Walk,
}

impl UnitigWalk {
    /// Whether the right walk came back around to the seed
    ///
    /// A canonical hairpin also revisits the seed's hash, but on the opposite
    /// strand; that is a stop, not a cycle.
    pub fn is_circular(&self) -> bool {
        self.right.end_state == TraversalState::StopSeen && self.right.closed
    }

    /// Concatenate both walks, trimming the shared seed overlap
    pub fn glue(&self) -> Vec<u8> {
        let mut seq = self.left.to_sequence();
        seq.extend_from_slice(&self.right.steps);
        seq
    }

    /// Hashes of every k-mer of the glued sequence, in reading order
    pub fn hashes(&self) -> Vec<Hash> {
        let mut out = Vec::with_capacity(self.left.hashes.len() + self.right.hashes.len() + 1);
        out.extend(self.left.hashes.iter().rev().copied());
        out.push(self.right.seed_hash);
        out.extend_from_slice(&self.right.hashes);
        out
    }

    /// Hash of the first k-mer of the glued sequence
    pub fn left_end(&self) -> Hash {
        self.left.head()
    }

    /// Hash of the last k-mer of the glued sequence; a cycle has no last
    /// k-mer and closes on its first one
    pub fn right_end(&self) -> Hash {
        if self.is_circular() {
            return self.left_end();
        }
        self.right.head()
    }
}

/// Stateful walker over a base graph
///
/// The cursor is left on the last k-mer consumed by the most recent walk.
pub struct UnitigWalker<'g, S: KmerStore, H: KmerHasher> {
    graph: &'g Dbg<S, H>,
    cursor: Vec<u8>,
    seen: AHashSet<Hash>,
}

impl<'g, S: KmerStore, H: KmerHasher> UnitigWalker<'g, S, H> {
    /// Create a walker over `graph`
    pub fn new(graph: &'g Dbg<S, H>) -> Self {
        Self {
            graph,
            cursor: Vec::with_capacity(graph.k()),
            seen: AHashSet::new(),
        }
    }

    /// The k-mer under the cursor
    pub fn cursor(&self) -> &[u8] {
        &self.cursor
    }

    /// Walk right from `seed`
    pub fn walk_right(&mut self, seed: &[u8]) -> Result<Walk> {
        self.seen.clear();
        self.start(seed, Direction::Right)
    }

    /// Walk left from `seed`
    pub fn walk_left(&mut self, seed: &[u8]) -> Result<Walk> {
        self.seen.clear();
        self.start(seed, Direction::Left)
    }

    /// Walk both ways from `seed`; the left walk never revisits k-mers of the
    /// right walk, and is skipped entirely when the right walk closes a cycle
    /// back onto the seed
    pub fn walk(&mut self, seed: &[u8]) -> Result<UnitigWalk> {
        self.seen.clear();
        let right = self.start(seed, Direction::Right)?;
        let circular = right.end_state == TraversalState::StopSeen && right.closed;

        let left = if right.end_state == TraversalState::BadSeed {
            let mut left = Walk::empty(seed, right.seed_hash, Direction::Left);
            left.end_state = TraversalState::BadSeed;
            left
        } else if circular {
            let mut left = Walk::empty(seed, right.seed_hash, Direction::Left);
            left.end_state = TraversalState::StopSeen;
            left.terminal = right.hashes.last().copied();
            left
        } else {
            self.start(seed, Direction::Left)?
        };

        Ok(UnitigWalk { left, right })
    }

    fn start(&mut self, seed: &[u8], direction: Direction) -> Result<Walk> {
        let seed_hash = self.graph.hash(seed)?;
        let mut walk = Walk::empty(seed, seed_hash, direction);
        if !self.graph.query_hash(seed_hash) {
            walk.end_state = TraversalState::BadSeed;
            return Ok(walk);
        }

        self.cursor.clear();
        self.cursor.extend_from_slice(seed);
        self.seen.insert(seed_hash);

        let branch_state = match direction {
            Direction::Right => TraversalState::DecisionFwd,
            Direction::Left => TraversalState::DecisionBkw,
        };

        let mut state = TraversalState::Running;
        while state == TraversalState::Running {
            let mut exts = self.graph.extensions(&self.cursor, direction)?;
            state = match exts.len() {
                0 => TraversalState::StopFwd,
                1 => {
                    let next = exts.swap_remove(0);
                    if self.seen.contains(&next.hash) {
                        walk.terminal = Some(next.hash);
                        walk.closed = next.kmer == walk.seed;
                        TraversalState::StopSeen
                    } else if self.graph.is_decision(&next.kmer)? {
                        walk.terminal = Some(next.hash);
                        branch_state
                    } else {
                        self.seen.insert(next.hash);
                        walk.steps.push(next.base);
                        walk.hashes.push(next.hash);
                        self.cursor = next.kmer;
                        TraversalState::Running
                    }
                }
                _ => branch_state,
            };
        }

        walk.end_state = state;
        Ok(walk)
    }
}
