//! Compact de Bruijn graph node store
//!
//! Unitig nodes live in an arena keyed by stable integer ids and are indexed
//! by both end hashes; decision nodes are keyed by their k-mer hash. Nodes
//! never point at each other: adjacency is always resolved by querying the
//! base graph around a node's end k-mers and looking the neighbour hashes up
//! in the two indexes.

use crate::constants::Hash;
use crate::dbg::{Dbg, Extensions};
use crate::error::{CdbgError, Result};
use crate::hasher::DeterministicHasher;
use crate::kmer::KmerHasher;
use crate::store::KmerStore;
use crate::walker::{TraversalState, UnitigWalk};
use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

/// Topological class of a unitig
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum UnitigMeta {
    /// Neither end touches a decision node
    Island,
    /// Exactly one end touches a decision node
    Tip,
    /// A single k-mer
    Trivial,
    /// The path closes back onto itself
    Circular,
    /// Both ends touch decision nodes
    Full,
}

impl UnitigMeta {
    /// Classify a finished two-sided walk
    pub fn classify(walk: &UnitigWalk) -> Self {
        Self::from_ends(
            walk.is_circular(),
            walk.left.is_empty() && walk.right.is_empty(),
            walk.left.end_state,
            walk.right.end_state,
        )
    }

    /// Classify a path from how its two ends stopped
    ///
    /// Circularity wins over length, and length over end adjacency. Only a
    /// stop in front of a decision k-mer counts as touching one: dead ends
    /// and hairpins (a stop on the path's own reverse complement) do not.
    pub fn from_ends(circular: bool, single_kmer: bool, left: TraversalState, right: TraversalState) -> Self {
        if circular {
            return UnitigMeta::Circular;
        }
        if single_kmer {
            return UnitigMeta::Trivial;
        }
        match (left.is_decision(), right.is_decision()) {
            (true, true) => UnitigMeta::Full,
            (false, false) => UnitigMeta::Island,
            _ => UnitigMeta::Tip,
        }
    }
}

impl std::fmt::Display for UnitigMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitigMeta::Island => "ISLAND",
            UnitigMeta::Tip => "TIP",
            UnitigMeta::Trivial => "TRIVIAL",
            UnitigMeta::Circular => "CIRCULAR",
            UnitigMeta::Full => "FULL",
        };
        f.write_str(s)
    }
}

/// A maximal non-branching path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitigNode {
    /// Stable arena id
    pub node_id: u64,
    /// Bases of the path (length >= k)
    pub sequence: String,
    /// Hash of the first k-mer
    pub left_end: Hash,
    /// Hash of the last k-mer
    pub right_end: Hash,
    /// Topological class
    pub meta: UnitigMeta,
}

impl UnitigNode {
    /// Number of k-mers on the path
    pub fn n_kmers(&self, k: usize) -> usize {
        self.sequence.len() + 1 - k
    }

    /// First k-mer
    pub fn first_kmer(&self, k: usize) -> &[u8] {
        &self.sequence.as_bytes()[..k]
    }

    /// Last k-mer
    pub fn last_kmer(&self, k: usize) -> &[u8] {
        let bytes = self.sequence.as_bytes();
        &bytes[bytes.len() - k..]
    }

    /// Whether the path closes onto itself
    pub fn is_circular(&self) -> bool {
        self.meta == UnitigMeta::Circular
    }
}

/// A branching k-mer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionNode {
    /// Stable id, shared with the unitig id space
    pub node_id: u64,
    /// Hash of the k-mer
    pub hash: Hash,
    /// The k-mer itself
    pub sequence: String,
}

/// Handle on a cDBG node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeRef {
    /// Unitig by arena id
    Unitig(u64),
    /// Decision node by k-mer hash
    Decision(Hash),
}

/// An overlap between two nodes, oriented for GFA-style output
///
/// `from` (in orientation `from_forward`) is followed by `to` (in orientation
/// `to_forward`) with a k-1 base overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Adjacency {
    /// Source node
    pub from: NodeRef,
    /// Whether the source is read as stored
    pub from_forward: bool,
    /// Target node
    pub to: NodeRef,
    /// Whether the target is read as stored
    pub to_forward: bool,
}

impl Adjacency {
    /// The same link read from the other strand
    fn flipped(self) -> Self {
        Adjacency {
            from: self.to,
            from_forward: !self.to_forward,
            to: self.from,
            to_forward: !self.from_forward,
        }
    }

    fn normalized(self) -> Self {
        match (self.from_forward, self.to_forward) {
            (true, true) => self,
            (false, false) => self.flipped(),
            _ => self.min(self.flipped()),
        }
    }
}

/// Connected component summary
#[derive(Clone, Debug, Default, Serialize)]
pub struct ComponentReport {
    /// Number of distinct components found
    pub n_components: usize,
    /// Whether only components reachable from sampled roots were explored
    pub sampled: bool,
    /// Number of BFS roots explored
    pub n_roots: usize,
    /// Component sizes (in nodes), largest first
    pub sizes: Vec<usize>,
    /// Largest component size
    pub max_size: usize,
    /// Smallest component size
    pub min_size: usize,
    /// Mean component size
    pub mean_size: f64,
    /// Node membership of each component, aligned with `sizes`
    #[serde(skip)]
    pub components: Vec<Vec<NodeRef>>,
}

impl ComponentReport {
    fn from_components(mut components: Vec<Vec<NodeRef>>, sampled: bool, n_roots: usize) -> Self {
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())));
        let sizes: Vec<usize> = components.iter().map(Vec::len).collect();
        let total: usize = sizes.iter().sum();
        let mean_size = if sizes.is_empty() {
            0.0
        } else {
            total as f64 / sizes.len() as f64
        };
        Self {
            n_components: components.len(),
            sampled,
            n_roots,
            max_size: sizes.first().copied().unwrap_or(0),
            min_size: sizes.last().copied().unwrap_or(0),
            mean_size,
            sizes,
            components,
        }
    }
}

/// The node store
#[derive(Debug, Default, Clone)]
pub struct CompactGraph {
    unitigs: AHashMap<u64, UnitigNode>,
    ends: AHashMap<Hash, u64>,
    decisions: AHashMap<Hash, DecisionNode>,
    next_id: u64,
}

impl CompactGraph {
    /// Create an empty node store
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Number of unitig nodes
    pub fn n_unodes(&self) -> usize {
        self.unitigs.len()
    }

    /// Number of decision nodes
    pub fn n_dnodes(&self) -> usize {
        self.decisions.len()
    }

    /// Number of distinct unitig end hashes (a circular or trivial unitig
    /// contributes one)
    pub fn n_unitig_ends(&self) -> usize {
        self.ends.len()
    }

    /// Register a new unitig; both end hashes must be unclaimed
    pub fn insert_unitig(
        &mut self,
        sequence: String,
        left_end: Hash,
        right_end: Hash,
        meta: UnitigMeta,
    ) -> Result<u64> {
        for end in [left_end, right_end] {
            if let Some(owner) = self.ends.get(&end) {
                return Err(CdbgError::topology(format!(
                    "end hash {} already claimed by unitig {}",
                    end, owner
                )));
            }
            if self.decisions.contains_key(&end) {
                return Err(CdbgError::topology(format!(
                    "end hash {} is a decision node",
                    end
                )));
            }
        }
        let node_id = self.fresh_id();
        self.ends.insert(left_end, node_id);
        self.ends.insert(right_end, node_id);
        self.unitigs.insert(
            node_id,
            UnitigNode {
                node_id,
                sequence,
                left_end,
                right_end,
                meta,
            },
        );
        Ok(node_id)
    }

    /// Remove a unitig and release its end hashes
    pub fn remove_unitig(&mut self, node_id: u64) -> Option<UnitigNode> {
        let node = self.unitigs.remove(&node_id)?;
        self.ends.remove(&node.left_end);
        self.ends.remove(&node.right_end);
        Some(node)
    }

    /// Register a decision node, returning `false` if it already exists
    pub fn insert_decision(&mut self, hash: Hash, sequence: String) -> Result<bool> {
        if self.decisions.contains_key(&hash) {
            return Ok(false);
        }
        if let Some(owner) = self.ends.get(&hash) {
            return Err(CdbgError::topology(format!(
                "decision hash {} is still an end of unitig {}",
                hash, owner
            )));
        }
        let node_id = self.fresh_id();
        self.decisions.insert(
            hash,
            DecisionNode {
                node_id,
                hash,
                sequence,
            },
        );
        Ok(true)
    }

    /// Unitig by id
    pub fn unitig(&self, node_id: u64) -> Option<&UnitigNode> {
        self.unitigs.get(&node_id)
    }

    /// Unitig having `hash` as one of its ends
    pub fn query_unode_end(&self, hash: Hash) -> Option<&UnitigNode> {
        self.ends.get(&hash).and_then(|id| self.unitigs.get(id))
    }

    /// Decision node for `hash`
    pub fn query_dnode(&self, hash: Hash) -> Option<&DecisionNode> {
        self.decisions.get(&hash)
    }

    /// Whether `hash` is a decision node
    pub fn has_dnode(&self, hash: Hash) -> bool {
        self.decisions.contains_key(&hash)
    }

    /// Node owning `hash` as a decision k-mer or a unitig end
    pub fn resolve(&self, hash: Hash) -> Option<NodeRef> {
        if self.decisions.contains_key(&hash) {
            return Some(NodeRef::Decision(hash));
        }
        self.ends.get(&hash).map(|&id| NodeRef::Unitig(id))
    }

    /// All unitigs, in no particular order
    pub fn all_unitigs(&self) -> impl Iterator<Item = &UnitigNode> {
        self.unitigs.values()
    }

    /// All decision nodes, in no particular order
    pub fn all_decisions(&self) -> impl Iterator<Item = &DecisionNode> {
        self.decisions.values()
    }

    /// Every node handle, sorted
    pub fn all_nodes(&self) -> Vec<NodeRef> {
        let mut nodes: Vec<NodeRef> = self
            .unitigs
            .keys()
            .map(|&id| NodeRef::Unitig(id))
            .chain(self.decisions.keys().map(|&h| NodeRef::Decision(h)))
            .collect();
        nodes.sort_unstable();
        nodes
    }

    /// Bases of a node
    pub fn node_sequence(&self, node: NodeRef) -> Option<&str> {
        match node {
            NodeRef::Unitig(id) => self.unitigs.get(&id).map(|u| u.sequence.as_str()),
            NodeRef::Decision(h) => self.decisions.get(&h).map(|d| d.sequence.as_str()),
        }
    }

    /// Number of unitigs per meta class
    pub fn meta_counts(&self) -> AHashMap<UnitigMeta, usize> {
        let mut counts = AHashMap::new();
        for u in self.unitigs.values() {
            *counts.entry(u.meta).or_insert(0) += 1;
        }
        counts
    }

    fn missing(node: NodeRef) -> CdbgError {
        CdbgError::topology(format!("{:?} is not in the cDBG", node))
    }

    fn resolve_extensions(&self, exts: &Extensions, node: NodeRef) -> Result<Vec<NodeRef>> {
        exts.iter()
            .map(|e| {
                self.resolve(e.hash).ok_or_else(|| {
                    CdbgError::topology(format!(
                        "neighbour {} of {:?} resolves to no node",
                        String::from_utf8_lossy(&e.kmer),
                        node
                    ))
                })
            })
            .collect()
    }

    /// Nodes preceding `node`
    pub fn left_neighbors<S, H>(&self, graph: &Dbg<S, H>, node: NodeRef) -> Result<Vec<NodeRef>>
    where
        S: KmerStore,
        H: KmerHasher,
    {
        let k = graph.k();
        let kmer = match node {
            NodeRef::Unitig(id) => self.unitigs.get(&id).ok_or_else(|| Self::missing(node))?.first_kmer(k),
            NodeRef::Decision(h) => self.decisions.get(&h).ok_or_else(|| Self::missing(node))?.sequence.as_bytes(),
        };
        let exts = graph.left_extensions(kmer)?;
        self.resolve_extensions(&exts, node)
    }

    /// Nodes following `node`
    pub fn right_neighbors<S, H>(&self, graph: &Dbg<S, H>, node: NodeRef) -> Result<Vec<NodeRef>>
    where
        S: KmerStore,
        H: KmerHasher,
    {
        let k = graph.k();
        let kmer = match node {
            NodeRef::Unitig(id) => self.unitigs.get(&id).ok_or_else(|| Self::missing(node))?.last_kmer(k),
            NodeRef::Decision(h) => self.decisions.get(&h).ok_or_else(|| Self::missing(node))?.sequence.as_bytes(),
        };
        let exts = graph.right_extensions(kmer)?;
        self.resolve_extensions(&exts, node)
    }

    /// Every link between nodes, each reported once, sorted
    pub fn adjacencies<S, H>(&self, graph: &Dbg<S, H>) -> Result<Vec<Adjacency>>
    where
        S: KmerStore,
        H: KmerHasher,
    {
        let k = graph.k();
        let mut links = BTreeSet::new();
        for node in self.all_nodes() {
            let seq = self.node_sequence(node).ok_or_else(|| Self::missing(node))?.as_bytes();
            let first = &seq[..k];
            let last = &seq[seq.len() - k..];

            for e in graph.right_extensions(last)? {
                let to = self.resolve(e.hash).ok_or_else(|| {
                    CdbgError::topology(format!("successor of {:?} resolves to no node", node))
                })?;
                let to_seq = self.node_sequence(to).ok_or_else(|| Self::missing(to))?.as_bytes();
                let link = Adjacency {
                    from: node,
                    from_forward: true,
                    to,
                    to_forward: to_seq.starts_with(&e.kmer),
                };
                links.insert(link.normalized());
            }
            for e in graph.left_extensions(first)? {
                let from = self.resolve(e.hash).ok_or_else(|| {
                    CdbgError::topology(format!("predecessor of {:?} resolves to no node", node))
                })?;
                let from_seq = self.node_sequence(from).ok_or_else(|| Self::missing(from))?.as_bytes();
                let link = Adjacency {
                    from,
                    from_forward: from_seq.ends_with(&e.kmer),
                    to: node,
                    to_forward: true,
                };
                links.insert(link.normalized());
            }
        }
        Ok(links.into_iter().collect())
    }

    /// All nodes reachable from `root` (either direction), in BFS order
    pub fn traverse_breadth_first<S, H>(&self, graph: &Dbg<S, H>, root: NodeRef) -> Result<Vec<NodeRef>>
    where
        S: KmerStore,
        H: KmerHasher,
    {
        if self.node_sequence(root).is_none() {
            return Err(Self::missing(root));
        }
        let mut seen = AHashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        seen.insert(root);
        queue.push_back(root);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            let mut next = self.left_neighbors(graph, node)?;
            next.extend(self.right_neighbors(graph, node)?);
            for n in next {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        Ok(order)
    }

    /// Connected components of the node adjacency graph
    ///
    /// With `sample_size`, BFS runs only from that many roots chosen by a
    /// deterministic bottom-n sketch over node end hashes, in parallel on the
    /// current rayon pool. Otherwise every component is enumerated.
    pub fn find_connected_components<S, H>(
        &self,
        graph: &Dbg<S, H>,
        sample_size: Option<usize>,
    ) -> Result<ComponentReport>
    where
        S: KmerStore,
        H: KmerHasher,
    {
        match sample_size {
            Some(n) if n < self.n_unodes() + self.n_dnodes() => {
                let keys = self
                    .unitigs
                    .values()
                    .map(|u| u.left_end)
                    .chain(self.decisions.keys().copied());
                let roots: Vec<NodeRef> = DeterministicHasher::new(crate::constants::DEFAULT_SEED)
                    .bottom_n(keys, n)
                    .into_iter()
                    .filter_map(|h| self.resolve(h))
                    .collect();

                let reached: Vec<Vec<NodeRef>> = roots
                    .par_iter()
                    .map(|&root| self.traverse_breadth_first(graph, root))
                    .collect::<Result<_>>()?;

                let mut by_min: AHashMap<NodeRef, Vec<NodeRef>> = AHashMap::new();
                for mut component in reached {
                    component.sort_unstable();
                    if let Some(&min) = component.first() {
                        by_min.entry(min).or_insert(component);
                    }
                }
                Ok(ComponentReport::from_components(
                    by_min.into_values().collect(),
                    true,
                    roots.len(),
                ))
            }
            _ => {
                let mut seen: AHashSet<NodeRef> = AHashSet::new();
                let mut components = Vec::new();
                let mut n_roots = 0;
                for node in self.all_nodes() {
                    if seen.contains(&node) {
                        continue;
                    }
                    n_roots += 1;
                    let mut component = self.traverse_breadth_first(graph, node)?;
                    seen.extend(component.iter().copied());
                    component.sort_unstable();
                    components.push(component);
                }
                Ok(ComponentReport::from_components(components, false, n_roots))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::ForwardHasher;
    use crate::store::ExactStore;
    use crate::walker::UnitigWalker;

    type Graph = Dbg<ExactStore, ForwardHasher>;

    /// Fork at AACG (k=4): TTAAC -> AACG -> {ACGTC, ACGA}
    fn fork() -> (Graph, CompactGraph) {
        let mut g = Dbg::new(ExactStore::new(), ForwardHasher::new(4));
        g.insert_sequence(b"TTAACGTC").unwrap();
        g.insert_sequence(b"AACGA").unwrap();
        let mut c = CompactGraph::new();
        c.insert_decision(g.hash(b"AACG").unwrap(), "AACG".to_string()).unwrap();
        let mut walker = UnitigWalker::new(&g);
        for seed in [&b"TTAA"[..], b"CGTC", b"ACGA"] {
            let walk = walker.walk(seed).unwrap();
            let meta = UnitigMeta::classify(&walk);
            let seq = String::from_utf8(walk.glue()).unwrap();
            c.insert_unitig(seq, walk.left_end(), walk.right_end(), meta).unwrap();
        }
        (g, c)
    }

    fn unitig_with(c: &CompactGraph, seq: &str) -> NodeRef {
        let u = c.all_unitigs().find(|u| u.sequence == seq).unwrap();
        NodeRef::Unitig(u.node_id)
    }

    #[test]
    fn test_fork_classification() {
        let (_, c) = fork();
        assert_eq!(c.n_unodes(), 3);
        assert_eq!(c.n_dnodes(), 1);
        let metas = c.meta_counts();
        assert_eq!(metas.get(&UnitigMeta::Tip), Some(&2));
        assert_eq!(metas.get(&UnitigMeta::Trivial), Some(&1));
        // the trivial unitig has a single end hash
        assert_eq!(c.n_unitig_ends(), 5);
    }

    #[test]
    fn test_neighbors_resolve_through_base_graph() {
        let (g, c) = fork();
        let d = NodeRef::Decision(g.hash(b"AACG").unwrap());
        let left = c.left_neighbors(&g, d).unwrap();
        assert_eq!(left, vec![unitig_with(&c, "TTAAC")]);

        let mut right = c.right_neighbors(&g, d).unwrap();
        right.sort_unstable();
        let mut expected = vec![unitig_with(&c, "ACGTC"), unitig_with(&c, "ACGA")];
        expected.sort_unstable();
        assert_eq!(right, expected);

        assert_eq!(c.right_neighbors(&g, unitig_with(&c, "TTAAC")).unwrap(), vec![d]);
        assert_eq!(c.left_neighbors(&g, unitig_with(&c, "ACGA")).unwrap(), vec![d]);
        assert!(c.right_neighbors(&g, unitig_with(&c, "ACGTC")).unwrap().is_empty());
    }

    #[test]
    fn test_end_hash_cannot_be_claimed_twice() {
        let (g, mut c) = fork();
        let end = g.hash(b"TTAA").unwrap();
        let err = c
            .insert_unitig("TTAA".to_string(), end, end, UnitigMeta::Trivial)
            .unwrap_err();
        assert!(matches!(err, CdbgError::InconsistentTopology(_)));

        let decision = g.hash(b"AACG").unwrap();
        assert!(!c.insert_decision(decision, "AACG".to_string()).unwrap());
        assert!(c.insert_decision(end, "TTAA".to_string()).is_err());
    }

    #[test]
    fn test_remove_releases_ends() {
        let (g, mut c) = fork();
        let end = g.hash(b"TTAA").unwrap();
        let id = c.query_unode_end(end).unwrap().node_id;
        let removed = c.remove_unitig(id).unwrap();
        assert_eq!(removed.sequence, "TTAAC");
        assert!(c.query_unode_end(end).is_none());
        assert!(c.query_unode_end(g.hash(b"TAAC").unwrap()).is_none());
        assert!(c.remove_unitig(id).is_none());
    }

    #[test]
    fn test_adjacencies_overlap_decision() {
        let (g, c) = fork();
        let links = c.adjacencies(&g).unwrap();
        assert_eq!(links.len(), 3);
        assert!(links.iter().all(|l| l.from_forward && l.to_forward));
    }

    #[test]
    fn test_components_exhaustive_and_sampled() {
        let (mut g, mut c) = fork();
        g.insert_sequence(b"GGGCCC").unwrap();
        let mut walker = UnitigWalker::new(&g);
        let walk = walker.walk(b"GGGC").unwrap();
        let seq = String::from_utf8(walk.glue()).unwrap();
        c.insert_unitig(seq, walk.left_end(), walk.right_end(), UnitigMeta::Island)
            .unwrap();

        let report = c.find_connected_components(&g, None).unwrap();
        assert_eq!(report.n_components, 2);
        assert_eq!(report.sizes, vec![4, 1]);
        assert!(!report.sampled);

        let sampled = c.find_connected_components(&g, Some(2)).unwrap();
        assert!(sampled.sampled);
        assert_eq!(sampled.n_roots, 2);
        assert!(sampled.n_components >= 1);
        assert!(sampled.sizes.iter().all(|&s| s == 4 || s == 1));
    }

    #[test]
    fn test_bfs_reaches_whole_fork() {
        let (g, c) = fork();
        let root = unitig_with(&c, "ACGA");
        let order = c.traverse_breadth_first(&g, root).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], root);
        assert_eq!(order[1], NodeRef::Decision(g.hash(b"AACG").unwrap()));
    }
}
