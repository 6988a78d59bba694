//! Segment finder: decomposes an incoming sequence into runs of new k-mers
//!
//! Known status is snapshotted for every k-mer window before any insertion,
//! then the whole sequence is inserted. Consecutive new windows collapse into
//! a [`NewSegment`]; known runs are dropped, but the known windows bounding a
//! new run are kept as its anchors. The list is bounded by
//! [`Segment::Null`] sentinels on both ends.

use crate::constants::Hash;
use crate::dbg::Dbg;
use crate::error::{CdbgError, Result};
use crate::kmer::KmerHasher;
use crate::store::KmerStore;
use ahash::AHashSet;

/// A maximal run of k-mers that were absent before the current insertion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSegment {
    /// Position of the first k-mer in the input sequence
    pub start: usize,
    /// Number of k-mers in the run
    pub length: usize,
    /// Hash of the known k-mer immediately left of the run
    pub left_anchor: Option<Hash>,
    /// Hash of the known k-mer immediately right of the run
    pub right_anchor: Option<Hash>,
    /// Offsets (within the run) of k-mers that are decision k-mers once the
    /// run is inserted
    pub decision_offsets: Vec<usize>,
}

/// A piece of a [`NewSegment`] after cutting it at decision k-mers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubRun {
    /// Position of the first k-mer in the input sequence
    pub start: usize,
    /// Number of k-mers
    pub length: usize,
    /// Whether this piece is a single decision k-mer
    pub is_decision: bool,
}

impl NewSegment {
    /// Whether the first k-mer of the run is a decision k-mer
    pub fn first_is_decision(&self) -> bool {
        self.decision_offsets.first() == Some(&0)
    }

    /// Whether the last k-mer of the run is a decision k-mer
    pub fn last_is_decision(&self) -> bool {
        self.decision_offsets.last() == Some(&(self.length - 1))
    }

    /// Position one past the last k-mer of the run
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Cut the run at every decision k-mer, left to right: non-branching
    /// pieces alternate with single decision k-mers
    pub fn sub_runs(&self) -> Vec<SubRun> {
        let mut runs = Vec::with_capacity(2 * self.decision_offsets.len() + 1);
        let mut cursor = 0usize;
        for &offset in &self.decision_offsets {
            if offset > cursor {
                runs.push(SubRun {
                    start: self.start + cursor,
                    length: offset - cursor,
                    is_decision: false,
                });
            }
            runs.push(SubRun {
                start: self.start + offset,
                length: 1,
                is_decision: true,
            });
            cursor = offset + 1;
        }
        if cursor < self.length {
            runs.push(SubRun {
                start: self.start + cursor,
                length: self.length - cursor,
                is_decision: false,
            });
        }
        runs
    }
}

/// Entry of a segment list
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Sequence boundary sentinel
    Null,
    /// A run of new k-mers
    New(NewSegment),
}

impl Segment {
    /// Whether this is the boundary sentinel
    pub fn is_null(&self) -> bool {
        matches!(self, Segment::Null)
    }
}

/// Result of scanning one sequence against the graph
#[derive(Clone, Debug)]
pub struct SegmentScan {
    /// Hash of every k-mer window, by position
    pub hashes: Vec<Hash>,
    /// Null-bounded segment list
    pub segments: Vec<Segment>,
    /// Distinct hashes that were absent before this insertion
    pub new_kmers: AHashSet<Hash>,
}

impl SegmentScan {
    /// Iterate over the non-sentinel segments
    pub fn new_segments(&self) -> impl Iterator<Item = &NewSegment> {
        self.segments.iter().filter_map(|s| match s {
            Segment::New(seg) => Some(seg),
            Segment::Null => None,
        })
    }

    /// Number of non-sentinel segments
    pub fn n_new_segments(&self) -> usize {
        self.new_segments().count()
    }
}

/// Insert `sequence` into `graph` and report the runs of k-mers it added
pub fn find_new_segments<S, H>(graph: &mut Dbg<S, H>, sequence: &[u8]) -> Result<SegmentScan>
where
    S: KmerStore,
    H: KmerHasher,
{
    let k = graph.k();
    let hashes = graph.hashes(sequence)?;

    // Snapshot before insertion: a repeated k-mer inside this sequence is new
    // at every occurrence.
    let known: Vec<bool> = hashes.iter().map(|&h| graph.query_hash(h)).collect();
    // Every occurrence is inserted so counting stores see repeats
    let mut new_kmers = AHashSet::new();
    for (&h, &was_known) in hashes.iter().zip(known.iter()) {
        graph.insert_hash(h);
        if !was_known {
            new_kmers.insert(h);
        }
    }

    let mut segments = vec![Segment::Null];
    let mut pos = 0usize;
    while pos < hashes.len() {
        if known[pos] {
            pos += 1;
            continue;
        }
        let start = pos;
        while pos < hashes.len() && !known[pos] {
            pos += 1;
        }
        let mut decision_offsets = Vec::new();
        for i in start..pos {
            if graph.is_decision(&sequence[i..i + k])? {
                decision_offsets.push(i - start);
            }
        }
        segments.push(Segment::New(NewSegment {
            start,
            length: pos - start,
            left_anchor: start.checked_sub(1).map(|p| hashes[p]),
            right_anchor: hashes.get(pos).copied(),
            decision_offsets,
        }));
    }
    segments.push(Segment::Null);

    Ok(SegmentScan {
        hashes,
        segments,
        new_kmers,
    })
}

/// Positions of `sequence` whose k-mer is a decision k-mer in the current
/// graph; read-only
pub fn find_decision_kmers<S, H>(graph: &Dbg<S, H>, sequence: &[u8]) -> Result<Vec<(usize, Hash)>>
where
    S: KmerStore,
    H: KmerHasher,
{
    let k = graph.k();
    if sequence.len() < k {
        return Err(CdbgError::InvalidKmerLength {
            length: sequence.len(),
            k,
        });
    }
    let hashes = graph.hashes(sequence)?;
    let mut out = Vec::new();
    for (i, &h) in hashes.iter().enumerate() {
        if graph.is_decision(&sequence[i..i + k])? {
            out.push((i, h));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::ForwardHasher;
    use crate::store::ExactStore;

    fn graph(k: usize) -> Dbg<ExactStore, ForwardHasher> {
        Dbg::new(ExactStore::new(), ForwardHasher::new(k))
    }

    #[test]
    fn test_all_new_sequence_is_one_segment() {
        let mut g = graph(4);
        let scan = find_new_segments(&mut g, b"ACGGATTC").unwrap();
        assert_eq!(scan.segments.len(), 3);
        assert!(scan.segments[0].is_null());
        assert!(scan.segments[2].is_null());
        let seg = scan.new_segments().next().unwrap();
        assert_eq!((seg.start, seg.length), (0, 5));
        assert_eq!(seg.left_anchor, None);
        assert_eq!(seg.right_anchor, None);
        assert!(seg.decision_offsets.is_empty());
        assert_eq!(scan.new_kmers.len(), 5);
    }

    #[test]
    fn test_known_sequence_yields_no_segments() {
        let mut g = graph(4);
        find_new_segments(&mut g, b"ACGGATTC").unwrap();
        let scan = find_new_segments(&mut g, b"ACGGATTC").unwrap();
        assert_eq!(scan.n_new_segments(), 0);
        assert_eq!(scan.segments, vec![Segment::Null, Segment::Null]);
        assert!(scan.new_kmers.is_empty());
    }

    #[test]
    fn test_anchors_bound_new_run() {
        let mut g = graph(4);
        g.insert_sequence(b"ACGGA").unwrap();
        g.insert_sequence(b"CCTAG").unwrap();
        // ACGGA | TCC | CCTAG joined by new k-mers GGAT..TCCT
        let seq = b"ACGGATCCTAG";
        let scan = find_new_segments(&mut g, seq).unwrap();
        let segs: Vec<&NewSegment> = scan.new_segments().collect();
        assert_eq!(segs.len(), 1);
        let seg = segs[0];
        assert_eq!(seg.start, 2);
        assert_eq!(seg.length, 4);
        assert_eq!(seg.end(), 6);
        assert_eq!(seg.left_anchor, Some(g.hash(b"CGGA").unwrap()));
        assert_eq!(seg.right_anchor, Some(g.hash(b"CCTA").unwrap()));
    }

    #[test]
    fn test_decision_offsets_and_sub_runs() {
        let mut g = graph(4);
        g.insert_sequence(b"TTAACGTC").unwrap();
        // AACG gains a second successor
        let scan = find_new_segments(&mut g, b"AACGAGG").unwrap();
        let seg = scan.new_segments().next().unwrap();
        assert_eq!(seg.start, 1);
        assert_eq!(seg.left_anchor, Some(g.hash(b"AACG").unwrap()));
        assert!(!seg.first_is_decision());

        let mut g = graph(4);
        g.insert_sequence(b"TTAACGTC").unwrap();
        let scan = find_new_segments(&mut g, b"GGAACGA").unwrap();
        let seg = scan.new_segments().next().unwrap();
        // GGAA GAAC are new; AACG known; ACGA new
        assert_eq!(scan.n_new_segments(), 2);
        assert_eq!(seg.start, 0);
        assert_eq!(seg.length, 2);
        // AACG now has two predecessors, but it is known, not part of a run
        assert!(seg.decision_offsets.is_empty());
    }

    #[test]
    fn test_sub_runs_cut_at_decisions() {
        let seg = NewSegment {
            start: 10,
            length: 6,
            left_anchor: None,
            right_anchor: None,
            decision_offsets: vec![0, 3],
        };
        assert!(seg.first_is_decision());
        assert!(!seg.last_is_decision());
        let runs = seg.sub_runs();
        assert_eq!(
            runs,
            vec![
                SubRun { start: 10, length: 1, is_decision: true },
                SubRun { start: 11, length: 2, is_decision: false },
                SubRun { start: 13, length: 1, is_decision: true },
                SubRun { start: 14, length: 2, is_decision: false },
            ]
        );
    }

    #[test]
    fn test_find_decision_kmers_is_read_only() {
        let mut g = graph(4);
        g.insert_sequence(b"TTAACGTC").unwrap();
        g.insert_sequence(b"AACGA").unwrap();
        let before = g.n_unique();
        let found = find_decision_kmers(&g, b"TTAACGTC").unwrap();
        assert_eq!(found, vec![(2, g.hash(b"AACG").unwrap())]);
        assert_eq!(g.n_unique(), before);
        assert!(find_decision_kmers(&g, b"ACG").is_err());
    }
}
