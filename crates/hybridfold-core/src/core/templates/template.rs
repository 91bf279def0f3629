use crate::core::models::residue::Torsions;
use crate::core::utils::geometry::BackboneTriad;
use std::collections::BTreeMap;

/// A contiguous residue range (inclusive, target numbering) whose geometry is
/// copied wholesale from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub stop: usize,
}

impl Chunk {
    pub fn new(start: usize, stop: usize) -> Self {
        debug_assert!(start <= stop);
        Self { start, stop }
    }

    pub fn single(residue: usize) -> Self {
        Self {
            start: residue,
            stop: residue,
        }
    }

    pub fn contains(&self, residue: usize) -> bool {
        residue >= self.start && residue <= self.stop
    }

    pub fn len(&self) -> usize {
        self.stop - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn residues(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.stop
    }
}

/// One aligned residue of a template: backbone torsions plus the placed
/// backbone triad in the template's coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateResidue {
    pub torsions: Torsions,
    pub triad: BackboneTriad,
}

/// An aligned structural template. Residues are keyed by target numbering;
/// `chunks` are the secondary-structure segments nominated for insertion and
/// `contigs` the contiguous runs of aligned coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    residues: BTreeMap<usize, TemplateResidue>,
    chunks: Vec<Chunk>,
    contigs: Vec<Chunk>,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        residues: BTreeMap<usize, TemplateResidue>,
        chunks: Vec<Chunk>,
    ) -> Self {
        let contigs = contiguous_runs(&residues);
        Self {
            name: name.into(),
            residues,
            chunks,
            contigs,
        }
    }

    pub fn residue(&self, target_index: usize) -> Option<&TemplateResidue> {
        self.residues.get(&target_index)
    }

    pub fn residue_mut(&mut self, target_index: usize) -> Option<&mut TemplateResidue> {
        self.residues.get_mut(&target_index)
    }

    pub fn covers(&self, target_index: usize) -> bool {
        self.residues.contains_key(&target_index)
    }

    pub fn covers_range(&self, start: usize, stop: usize) -> bool {
        (start..=stop).all(|i| self.covers(i))
    }

    pub fn residue_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.residues.keys().copied()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn contigs(&self) -> &[Chunk] {
        &self.contigs
    }

    /// Applies a rigid transform to every placed residue, leaving torsions
    /// untouched. Used when superimposing pairing templates onto others.
    pub fn transform(&mut self, iso: &nalgebra::Isometry3<f64>) {
        for residue in self.residues.values_mut() {
            residue.triad = residue.triad.transformed(iso);
        }
    }
}

fn contiguous_runs(residues: &BTreeMap<usize, TemplateResidue>) -> Vec<Chunk> {
    let mut runs: Vec<Chunk> = Vec::new();
    for &i in residues.keys() {
        match runs.last_mut() {
            Some(run) if i == run.stop + 1 => run.stop = i,
            _ => runs.push(Chunk::single(i)),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::residue::Torsions;
    use nalgebra::{Isometry3, Vector3};

    fn ideal_residue() -> TemplateResidue {
        TemplateResidue {
            torsions: Torsions::extended(),
            triad: BackboneTriad::local(),
        }
    }

    fn template_covering(ranges: &[(usize, usize)]) -> Template {
        let mut residues = BTreeMap::new();
        for &(start, stop) in ranges {
            for i in start..=stop {
                residues.insert(i, ideal_residue());
            }
        }
        let chunks = ranges.iter().map(|&(s, e)| Chunk::new(s, e)).collect();
        Template::new("t", residues, chunks)
    }

    #[test]
    fn contigs_follow_aligned_coverage_not_chunks() {
        let tmpl = template_covering(&[(0, 4), (6, 9)]);
        assert_eq!(tmpl.contigs(), &[Chunk::new(0, 4), Chunk::new(6, 9)]);
        assert!(tmpl.covers(4));
        assert!(!tmpl.covers(5));
        assert!(tmpl.covers_range(6, 9));
        assert!(!tmpl.covers_range(4, 6));
    }

    #[test]
    fn chunk_membership_is_inclusive() {
        let chunk = Chunk::new(3, 7);
        assert!(chunk.contains(3));
        assert!(chunk.contains(7));
        assert!(!chunk.contains(8));
        assert_eq!(chunk.len(), 5);
    }

    #[test]
    fn transform_moves_triads_but_not_torsions() {
        let mut tmpl = template_covering(&[(0, 1)]);
        let before = *tmpl.residue(0).unwrap();
        let iso = Isometry3::new(Vector3::new(5.0, 0.0, 0.0), Vector3::zeros());
        tmpl.transform(&iso);
        let after = tmpl.residue(0).unwrap();
        assert_eq!(after.torsions, before.torsions);
        assert!((after.triad.ca - before.triad.ca).norm() > 4.9);
    }
}
