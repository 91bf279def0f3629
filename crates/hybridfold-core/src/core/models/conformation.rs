use crate::core::kinematics::tree::KinematicTree;
use crate::core::models::residue::{AminoAcid, Torsions};
use crate::core::utils::geometry::{
    self, ANGLE_CA_C_N, ANGLE_C_N_CA, ANGLE_N_CA_C, BOND_C_N, BOND_CA_C, BOND_N_CA, BackboneTriad,
    extend_chain_atom,
};
use nalgebra::{Isometry3, Point3};

/// A flat-bottomed upper-bound distance restraint between two CA atoms.
/// These are auxiliary search guides, discarded when a run finishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBound {
    pub i: usize,
    pub j: usize,
    pub upper: f64,
    pub stdev: f64,
}

impl DistanceBound {
    pub fn penalty(&self, distance: f64) -> f64 {
        if distance <= self.upper {
            0.0
        } else {
            let excess = (distance - self.upper) / self.stdev;
            excess * excess
        }
    }
}

/// The working model: one residue per target position with backbone torsions
/// and derived backbone coordinates, plus the kinematic tree that governs
/// which coordinates move together.
///
/// Coordinates are rebuilt segment-by-segment from torsions and per-segment
/// rigid frames whenever either changes; a torsion window crossing a cut is
/// never applied in one piece.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformation {
    sequence: Vec<AminoAcid>,
    secstruct: Vec<char>,
    torsions: Vec<Torsions>,
    coords: Vec<BackboneTriad>,
    tree: KinematicTree,
    frames: Vec<Isometry3<f64>>,
    constraints: Vec<DistanceBound>,
}

impl Conformation {
    /// Builds an extended chain under the trivial single-segment tree.
    pub fn extended(sequence: Vec<AminoAcid>, secstruct: Vec<char>) -> Self {
        let nres = sequence.len();
        debug_assert_eq!(secstruct.len(), nres);
        let mut conformation = Self {
            sequence,
            secstruct,
            torsions: vec![Torsions::extended(); nres],
            coords: vec![BackboneTriad::local(); nres],
            tree: KinematicTree::simple(nres),
            frames: vec![Isometry3::identity()],
            constraints: Vec::new(),
        };
        conformation.refold_all();
        conformation
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn amino_acid(&self, residue: usize) -> AminoAcid {
        self.sequence[residue]
    }

    pub fn secstruct(&self, residue: usize) -> char {
        self.secstruct[residue]
    }

    pub fn torsions(&self, residue: usize) -> Torsions {
        self.torsions[residue]
    }

    pub fn triad(&self, residue: usize) -> &BackboneTriad {
        &self.coords[residue]
    }

    pub fn ca(&self, residue: usize) -> Point3<f64> {
        self.coords[residue].ca
    }

    pub fn ca_positions(&self) -> Vec<Point3<f64>> {
        self.coords.iter().map(|t| t.ca).collect()
    }

    pub fn ca_subset(&self, residues: &[usize]) -> Vec<Point3<f64>> {
        residues.iter().map(|&i| self.coords[i].ca).collect()
    }

    /// CA RMSD over a residue subset against another conformation of the same
    /// length, without superposition. An empty subset yields zero.
    pub fn ca_rmsd_subset(&self, other: &Conformation, residues: &[usize]) -> f64 {
        geometry::rmsd(&self.ca_subset(residues), &other.ca_subset(residues))
    }

    pub fn tree(&self) -> &KinematicTree {
        &self.tree
    }

    /// Installs a new tree, deriving segment frames from the current
    /// coordinates so the geometry is unchanged. Used both to enter the
    /// sampling tree and to restore the original one afterwards.
    pub fn set_tree(&mut self, tree: KinematicTree) {
        debug_assert_eq!(tree.nres(), self.len());
        self.frames = tree
            .segments()
            .iter()
            .map(|seg| self.coords[seg.anchor].frame())
            .collect();
        self.tree = tree;
    }

    pub fn segment_frame(&self, segment: usize) -> &Isometry3<f64> {
        &self.frames[segment]
    }

    /// Replaces one segment's rigid frame and refolds it. Returns the residue
    /// span that moved.
    pub fn set_segment_frame(&mut self, segment: usize, frame: Isometry3<f64>) -> (usize, usize) {
        self.frames[segment] = frame;
        self.refold_segment(segment);
        let seg = self.tree.segments()[segment];
        (seg.start, seg.stop)
    }

    /// Overwrites one residue's torsions without refolding. Callers batch
    /// writes and then refold the affected segments once.
    pub fn set_torsions(&mut self, residue: usize, torsions: Torsions) {
        self.torsions[residue] = torsions;
    }

    /// Writes a torsion window and refolds every segment it touches. Returns
    /// the full residue span whose coordinates changed.
    pub fn set_window_torsions(&mut self, start: usize, window: &[Torsions]) -> (usize, usize) {
        let stop = start + window.len() - 1;
        for (offset, torsions) in window.iter().enumerate() {
            self.torsions[start + offset] = *torsions;
        }
        self.refold_span(start, stop)
    }

    /// Refolds every segment intersecting `start..=stop`; returns the moved
    /// span.
    pub fn refold_span(&mut self, start: usize, stop: usize) -> (usize, usize) {
        let first = self.tree.segment_of(start);
        let last = self.tree.segment_of(stop);
        for segment in first..=last {
            self.refold_segment(segment);
        }
        (
            self.tree.segments()[first].start,
            self.tree.segments()[last].stop,
        )
    }

    pub fn refold_all(&mut self) {
        for segment in 0..self.tree.segments().len() {
            self.refold_segment(segment);
        }
    }

    /// Rebuilds one segment's coordinates from its frame and torsions:
    /// the anchor triad is placed by the frame, then peptide geometry is
    /// propagated toward both segment ends with ideal bond lengths/angles.
    pub fn refold_segment(&mut self, segment: usize) {
        let seg = self.tree.segments()[segment];
        let frame = self.frames[segment];
        self.coords[seg.anchor] = BackboneTriad::local().transformed(&frame);

        for i in seg.anchor + 1..=seg.stop {
            let prev = self.coords[i - 1];
            let prev_torsions = self.torsions[i - 1];
            let n = extend_chain_atom(
                &prev.n,
                &prev.ca,
                &prev.c,
                BOND_C_N,
                ANGLE_CA_C_N,
                prev_torsions.psi,
            );
            let ca = extend_chain_atom(
                &prev.ca,
                &prev.c,
                &n,
                BOND_N_CA,
                ANGLE_C_N_CA,
                prev_torsions.omega,
            );
            let c = extend_chain_atom(
                &prev.c,
                &n,
                &ca,
                BOND_CA_C,
                ANGLE_N_CA_C,
                self.torsions[i].phi,
            );
            self.coords[i] = BackboneTriad { n, ca, c };
        }

        for i in (seg.start..seg.anchor).rev() {
            let next = self.coords[i + 1];
            let c = extend_chain_atom(
                &next.c,
                &next.ca,
                &next.n,
                BOND_C_N,
                ANGLE_C_N_CA,
                self.torsions[i + 1].phi,
            );
            let ca = extend_chain_atom(
                &next.ca,
                &next.n,
                &c,
                BOND_CA_C,
                ANGLE_CA_C_N,
                self.torsions[i].omega,
            );
            let n = extend_chain_atom(
                &next.n,
                &c,
                &ca,
                BOND_N_CA,
                ANGLE_N_CA_C,
                self.torsions[i].psi,
            );
            self.coords[i] = BackboneTriad { n, ca, c };
        }
    }

    pub fn add_constraint(&mut self, constraint: DistanceBound) {
        self.constraints.push(constraint);
    }

    pub fn constraints(&self) -> &[DistanceBound] {
        &self.constraints
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }
}
