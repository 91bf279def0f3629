use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TreeError {
    #[error("Tree has no segments")]
    NoSegments,
    #[error("Segment {index} ({start}..={stop}) is malformed or out of order")]
    MalformedSegment {
        index: usize,
        start: usize,
        stop: usize,
    },
    #[error("Segments do not cover residues 0..={last} contiguously")]
    IncompleteCoverage { last: usize },
    #[error("Segment {index} anchor {anchor} lies outside {start}..={stop}")]
    AnchorOutsideSegment {
        index: usize,
        anchor: usize,
        start: usize,
        stop: usize,
    },
}

/// A contiguous run of residues held rigid relative to its anchor. The anchor
/// residue is connected to the virtual root by a jump; peptide edges extend
/// from the anchor toward both segment ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub stop: usize,
    pub anchor: usize,
}

impl Segment {
    pub fn contains(&self, residue: usize) -> bool {
        residue >= self.start && residue <= self.stop
    }

    pub fn len(&self) -> usize {
        self.stop - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// The kind of a kinematic edge, for structural comparison of trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Peptide,
    Jump,
}

/// A directed kinematic edge between residue indices. Jump edges originate
/// from the virtual root, encoded as `start == stop == anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub start: usize,
    pub stop: usize,
    pub kind: EdgeKind,
}

/// A tree over residue indices: jump-connected rigid segments with peptide
/// edges inside each segment and cuts between consecutive segments.
///
/// Invariants enforced on construction: at least one segment, segments sorted
/// and exactly tiling `0..=nres-1`, every anchor inside its segment. The tree
/// is a plain value; sampling snapshots it by cloning and restores it by
/// assignment, so round-tripping is exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KinematicTree {
    nres: usize,
    segments: Vec<Segment>,
}

impl KinematicTree {
    pub fn new(nres: usize, segments: Vec<Segment>) -> Result<Self, TreeError> {
        if segments.is_empty() || nres == 0 {
            return Err(TreeError::NoSegments);
        }
        let mut expected_start = 0usize;
        for (index, seg) in segments.iter().enumerate() {
            if seg.start > seg.stop || seg.start != expected_start {
                return Err(TreeError::MalformedSegment {
                    index,
                    start: seg.start,
                    stop: seg.stop,
                });
            }
            if seg.anchor < seg.start || seg.anchor > seg.stop {
                return Err(TreeError::AnchorOutsideSegment {
                    index,
                    anchor: seg.anchor,
                    start: seg.start,
                    stop: seg.stop,
                });
            }
            expected_start = seg.stop + 1;
        }
        if expected_start != nres {
            return Err(TreeError::IncompleteCoverage { last: nres - 1 });
        }
        Ok(Self { nres, segments })
    }

    /// The trivial tree: one segment anchored at residue 0. This is the shape
    /// every conformation starts with and is restored to after sampling.
    pub fn simple(nres: usize) -> Self {
        Self {
            nres,
            segments: vec![Segment {
                start: 0,
                stop: nres - 1,
                anchor: 0,
            }],
        }
    }

    pub fn nres(&self) -> usize {
        self.nres
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_of(&self, residue: usize) -> usize {
        debug_assert!(residue < self.nres);
        self.segments
            .partition_point(|seg| seg.stop < residue)
    }

    /// Jump-anchor residues, one per segment, in sequence order.
    pub fn anchors(&self) -> Vec<usize> {
        self.segments.iter().map(|seg| seg.anchor).collect()
    }

    /// Residue indices immediately before each cut (chain breaks between
    /// consecutive segments).
    pub fn cuts(&self) -> Vec<usize> {
        self.segments
            .iter()
            .take(self.segments.len().saturating_sub(1))
            .map(|seg| seg.stop)
            .collect()
    }

    /// True if `start..=stop` lies entirely inside one segment, i.e. no cut
    /// is crossed and the window is kinematically meaningful.
    pub fn window_in_one_segment(&self, start: usize, stop: usize) -> bool {
        if stop >= self.nres {
            return false;
        }
        self.segment_of(start) == self.segment_of(stop)
    }

    /// The full edge list (jump edge per segment plus peptide edges fanning
    /// out from each anchor), for structural comparison of trees.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for seg in &self.segments {
            edges.push(Edge {
                start: seg.anchor,
                stop: seg.anchor,
                kind: EdgeKind::Jump,
            });
            if seg.anchor > seg.start {
                edges.push(Edge {
                    start: seg.anchor,
                    stop: seg.start,
                    kind: EdgeKind::Peptide,
                });
            }
            if seg.anchor < seg.stop {
                edges.push(Edge {
                    start: seg.anchor,
                    stop: seg.stop,
                    kind: EdgeKind::Peptide,
                });
            }
        }
        edges
    }
}
