use super::{MoveOutcome, Mover};
use crate::core::models::conformation::Conformation;
use crate::core::templates::{Chunk, TemplateSet};
use crate::engine::config::ResidueFlags;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateChoice {
    /// Always copy from this template.
    Fixed(usize),
    /// Draw a template by prior weight each cycle.
    WeightedRandom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkChoice {
    /// Insert every chunk of the chosen template in one application.
    All,
    /// Insert one uniformly drawn chunk.
    Random,
}

/// Copies template chunk geometry (torsions plus rigid placement) onto the
/// working conformation. Residues allow it only through their
/// `sample_by_template` flag; a bounded random registry shift is applied
/// where the per-residue limit permits. Jump topology is never touched.
pub struct ChunkInsertionMover<'a> {
    templates: &'a TemplateSet,
    flags: &'a ResidueFlags,
    template_choice: TemplateChoice,
    chunk_choice: ChunkChoice,
    templates_to_ignore: HashSet<usize>,
    trial_counts: Vec<u64>,
}

impl<'a> ChunkInsertionMover<'a> {
    pub fn new(
        templates: &'a TemplateSet,
        flags: &'a ResidueFlags,
        nres: usize,
        template_choice: TemplateChoice,
        chunk_choice: ChunkChoice,
    ) -> Self {
        Self {
            templates,
            flags,
            template_choice,
            chunk_choice,
            templates_to_ignore: HashSet::new(),
            trial_counts: vec![0; nres],
        }
    }

    /// Excludes templates (e.g. strand pairings, which the jump mover owns)
    /// from random selection.
    pub fn set_templates_to_ignore(&mut self, templates_to_ignore: HashSet<usize>) {
        self.templates_to_ignore = templates_to_ignore;
    }

    pub fn trial_counts(&self) -> &[u64] {
        &self.trial_counts
    }

    /// Copies one chunk from one template, honoring flags and registry
    /// shift. The workhorse for both initialization and random sampling.
    pub fn insert_chunk(
        &mut self,
        conformation: &mut Conformation,
        template_index: usize,
        chunk: Chunk,
        rng: &mut StdRng,
    ) -> MoveOutcome {
        let nres = conformation.len();
        if chunk.stop >= nres {
            return MoveOutcome::NoOp;
        }
        let template = self.templates.template(template_index);

        let shift = self.draw_registry_shift(&chunk, template_index, rng);

        let mut copied_any = false;
        for i in chunk.residues() {
            if !self.flags.sample_by_template[i] {
                continue;
            }
            let source = (i as isize + shift) as usize;
            let Some(residue) = template.residue(source) else {
                continue;
            };
            conformation.set_torsions(i, residue.torsions);
            copied_any = true;
        }
        if !copied_any {
            return MoveOutcome::NoOp;
        }

        // Re-anchor every segment whose jump anchor lies in the chunk so the
        // copied span also lands at the template's rigid placement.
        let segments: Vec<_> = conformation
            .tree()
            .segments()
            .iter()
            .enumerate()
            .filter(|(_, seg)| chunk.contains(seg.anchor))
            .map(|(index, seg)| (index, seg.anchor))
            .collect();
        for (segment, anchor) in segments {
            let source = (anchor as isize + shift) as usize;
            if let Some(residue) = template.residue(source) {
                if self.flags.sample_by_template[anchor] {
                    conformation.set_segment_frame(segment, residue.triad.frame());
                }
            }
        }

        conformation.refold_span(chunk.start, chunk.stop);
        for count in &mut self.trial_counts[chunk.start..=chunk.stop] {
            *count += 1;
        }
        trace!(
            template = template_index,
            start = chunk.start,
            stop = chunk.stop,
            shift,
            "Inserted chunk"
        );
        MoveOutcome::Moved {
            start: chunk.start,
            stop: chunk.stop,
        }
    }

    /// A uniform draw from the shifts the per-residue limits and the
    /// template's coverage both allow. The tightest residue limit in the
    /// chunk bounds the jitter.
    fn draw_registry_shift(
        &self,
        chunk: &Chunk,
        template_index: usize,
        rng: &mut StdRng,
    ) -> isize {
        let max_shift = chunk
            .residues()
            .map(|i| self.flags.max_registry_shift[i])
            .min()
            .unwrap_or(0) as isize;
        if max_shift == 0 {
            return 0;
        }
        let template = self.templates.template(template_index);
        let candidates: Vec<isize> = (-max_shift..=max_shift)
            .filter(|&s| {
                let start = chunk.start as isize + s;
                let stop = chunk.stop as isize + s;
                start >= 0 && template.covers_range(start as usize, stop as usize)
            })
            .collect();
        candidates.choose(rng).copied().unwrap_or(0)
    }

    fn choose_template(&self, rng: &mut StdRng) -> Option<usize> {
        match self.template_choice {
            TemplateChoice::Fixed(index) => Some(index),
            TemplateChoice::WeightedRandom => {
                let candidates: Vec<usize> = (0..self.templates.len())
                    .filter(|i| {
                        !self.templates_to_ignore.contains(i) && !self.templates.is_pairing(*i)
                    })
                    .collect();
                let weights: Vec<f64> =
                    candidates.iter().map(|&i| self.templates.weight(i)).collect();
                if weights.iter().sum::<f64>() <= 0.0 {
                    return None;
                }
                let distribution = WeightedIndex::new(&weights).ok()?;
                Some(candidates[distribution.sample(rng)])
            }
        }
    }
}

impl<'a> Mover for ChunkInsertionMover<'a> {
    fn apply(&mut self, conformation: &mut Conformation, rng: &mut StdRng) -> MoveOutcome {
        let Some(template_index) = self.choose_template(rng) else {
            return MoveOutcome::NoOp;
        };
        let chunks = self.templates.template(template_index).chunks().to_vec();
        if chunks.is_empty() {
            return MoveOutcome::NoOp;
        }
        match self.chunk_choice {
            ChunkChoice::All => chunks.into_iter().fold(MoveOutcome::NoOp, |acc, chunk| {
                acc.union(self.insert_chunk(conformation, template_index, chunk, rng))
            }),
            ChunkChoice::Random => {
                let chunk = chunks[rng.gen_range(0..chunks.len())];
                self.insert_chunk(conformation, template_index, chunk, rng)
            }
        }
    }

    fn name(&self) -> &'static str {
        "chunk_insertion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kinematics::builder::build_tree;
    use crate::core::models::residue::{Torsions, parse_sequence};
    use crate::core::templates::{Template, TemplateResidue};
    use crate::core::utils::geometry::BackboneTriad;
    use nalgebra::{Isometry3, Vector3};
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn helical_template(name: &str, start: usize, stop: usize, offset: f64) -> Template {
        // Build template geometry by folding a helix and displacing it.
        let n = stop + 1;
        let mut conf = Conformation::extended(
            parse_sequence(&"A".repeat(n)).unwrap(),
            vec!['L'; n],
        );
        conf.set_window_torsions(0, &vec![Torsions::new(-57.0, -47.0, 180.0); n]);
        let iso = Isometry3::new(Vector3::new(offset, 0.0, 0.0), Vector3::zeros());
        let mut residues = BTreeMap::new();
        for i in start..=stop {
            residues.insert(
                i,
                TemplateResidue {
                    torsions: conf.torsions(i),
                    triad: conf.triad(i).transformed(&iso),
                },
            );
        }
        Template::new(name, residues, vec![Chunk::new(start, stop)])
    }

    fn setup(nres: usize, template: Template) -> (Conformation, TemplateSet, ResidueFlags) {
        let set = TemplateSet::new(vec![template], vec![1.0], 0).unwrap();
        let flags = ResidueFlags::all_enabled(nres);
        let mut conf = Conformation::extended(
            parse_sequence(&"A".repeat(nres)).unwrap(),
            vec!['L'; nres],
        );
        let mut rng = StdRng::seed_from_u64(1);
        let build = build_tree(nres, &set, &[], false, false, &mut rng).unwrap();
        conf.set_tree(build.tree);
        (conf, set, flags)
    }

    #[test]
    fn insertion_copies_torsions_and_rigid_placement() {
        let template = helical_template("t", 2, 9, 25.0);
        let (mut conf, set, flags) = setup(14, template);
        let mut mover = ChunkInsertionMover::new(
            &set,
            &flags,
            14,
            TemplateChoice::Fixed(0),
            ChunkChoice::All,
        );
        let mut rng = StdRng::seed_from_u64(2);

        let outcome = mover.apply(&mut conf, &mut rng);
        assert!(matches!(outcome, MoveOutcome::Moved { .. }));

        // Torsions match the template over the chunk.
        for i in 2..=9 {
            assert_eq!(conf.torsions(i), set.template(0).residue(i).unwrap().torsions);
        }
        // The anchor residue sits exactly at the template's placement.
        let anchor_triad = set.template(0).residue(2).unwrap().triad;
        assert!((conf.triad(2).ca - anchor_triad.ca).norm() < 1e-6);
    }

    #[test]
    fn flagged_residues_are_never_overwritten() {
        let template = helical_template("t", 0, 9, 0.0);
        let (mut conf, set, mut flags) = setup(10, template);
        flags.sample_by_template = vec![false; 10];
        let mut mover = ChunkInsertionMover::new(
            &set,
            &flags,
            10,
            TemplateChoice::Fixed(0),
            ChunkChoice::All,
        );
        let mut rng = StdRng::seed_from_u64(3);
        let before = conf.torsions(5);

        let outcome = mover.apply(&mut conf, &mut rng);
        assert_eq!(outcome, MoveOutcome::NoOp);
        assert_eq!(conf.torsions(5), before);
    }

    #[test]
    fn insertion_preserves_jump_topology() {
        let template = helical_template("t", 2, 9, 5.0);
        let (mut conf, set, flags) = setup(14, template);
        let tree_before = conf.tree().clone();
        let mut mover = ChunkInsertionMover::new(
            &set,
            &flags,
            14,
            TemplateChoice::Fixed(0),
            ChunkChoice::All,
        );
        let mut rng = StdRng::seed_from_u64(4);
        mover.apply(&mut conf, &mut rng);
        assert_eq!(conf.tree(), &tree_before);
    }

    #[test]
    fn registry_shift_stays_within_template_coverage() {
        let template = helical_template("t", 2, 11, 0.0);
        let set = TemplateSet::new(vec![template], vec![1.0], 0).unwrap();
        let mut flags = ResidueFlags::all_enabled(14);
        flags.max_registry_shift = vec![3; 14];
        let chunk = Chunk::new(4, 9);
        let mut mover = ChunkInsertionMover::new(
            &set,
            &flags,
            14,
            TemplateChoice::Fixed(0),
            ChunkChoice::Random,
        );
        let mut rng = StdRng::seed_from_u64(5);
        // Coverage is 2..=11, chunk 4..=9: legal shifts are -2..=2 only.
        for _ in 0..50 {
            let shift = mover.draw_registry_shift(&chunk, 0, &mut rng);
            assert!((-2..=2).contains(&shift), "shift {shift} escaped coverage");
        }
    }

    #[test]
    fn trial_counters_track_inserted_spans() {
        let template = helical_template("t", 2, 9, 0.0);
        let (mut conf, set, flags) = setup(14, template);
        let mut mover = ChunkInsertionMover::new(
            &set,
            &flags,
            14,
            TemplateChoice::Fixed(0),
            ChunkChoice::All,
        );
        let mut rng = StdRng::seed_from_u64(6);
        mover.apply(&mut conf, &mut rng);
        mover.apply(&mut conf, &mut rng);
        assert_eq!(mover.trial_counts()[2], 2);
        assert_eq!(mover.trial_counts()[9], 2);
        assert_eq!(mover.trial_counts()[0], 0);
    }

    #[test]
    fn weighted_random_choice_skips_ignored_templates() {
        let a = helical_template("a", 0, 5, 0.0);
        let b = helical_template("b", 6, 11, 0.0);
        let set = TemplateSet::new(vec![a, b], vec![0.5, 0.5], 0).unwrap();
        let flags = ResidueFlags::all_enabled(12);
        let mut mover = ChunkInsertionMover::new(
            &set,
            &flags,
            12,
            TemplateChoice::WeightedRandom,
            ChunkChoice::Random,
        );
        mover.set_templates_to_ignore(HashSet::from([0]));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..30 {
            assert_eq!(mover.choose_template(&mut rng), Some(1));
        }
    }
}
