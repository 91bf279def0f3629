//! Per-residue selection weights for the fragment movers.
//!
//! One base weighting (template coverage and per-residue permission) feeds a
//! single parametrized gap rule that decides which mover class may act where:
//! the big mover anywhere the base allows, the small mover only in
//! inter-anchor gaps too short for a big window, and the single-residue mover
//! only in gaps too short for a small window (there including the anchors
//! themselves).

use crate::engine::config::ResidueFlags;
use crate::core::templates::TemplateSet;
use tracing::debug;

/// Base fragment weight per residue: zero where fragment sampling is
/// disabled, `frag_weight_aligned` where the initial template (or, in
/// domain-assembly mode, any template) provides aligned coverage, one
/// elsewhere.
pub fn base_fragment_weights(
    nres: usize,
    templates: &TemplateSet,
    flags: &ResidueFlags,
    frag_weight_aligned: f64,
    domain_assembly: bool,
) -> Vec<f64> {
    let mut weights = vec![0.0; nres];
    for (i, weight) in weights.iter_mut().enumerate() {
        if !flags.sample_by_fragment[i] {
            continue;
        }
        let aligned = if domain_assembly {
            templates
                .iter()
                .enumerate()
                .any(|(t, template)| {
                    !templates.is_pairing(t)
                        && template.contigs().iter().any(|c| c.contains(i))
                })
        } else {
            templates
                .initial()
                .contigs()
                .iter()
                .any(|c| c.contains(i))
        };
        *weight = if aligned { frag_weight_aligned } else { 1.0 };
    }
    debug!(
        nonzero = weights.iter().filter(|&&w| w > 0.0).count(),
        "Base fragment insertion weights"
    );
    weights
}

/// Restricts the base weights for one mover class.
///
/// `longer_window_len` is the window length of the next-larger mover class:
/// `None` for the largest class (no gap restriction), otherwise only
/// inter-anchor gaps strictly shorter than it stay eligible, so the classes
/// partition the chain by construction. Windows of length one additionally
/// keep the anchors that border a qualifying gap, since no larger window can
/// ever cover them.
pub fn weights_for(
    window_len: usize,
    longer_window_len: Option<usize>,
    jump_anchors: &[usize],
    base: &[f64],
) -> Vec<f64> {
    let Some(longer) = longer_window_len else {
        return base.to_vec();
    };

    let nres = base.len();
    let mut weights = vec![0.0; nres];
    let mut anchors: Vec<usize> = jump_anchors.to_vec();
    anchors.sort_unstable();
    anchors.dedup();

    // Gap regions between consecutive anchors, plus the two chain tails.
    let mut boundaries: Vec<(usize, usize)> = Vec::new(); // half-open residue regions
    let mut previous: Option<usize> = None;
    for &anchor in &anchors {
        let start = previous.map_or(0, |p| p + 1);
        if anchor > start {
            boundaries.push((start, anchor));
        }
        previous = Some(anchor);
    }
    let tail_start = previous.map_or(0, |p| p + 1);
    if nres > tail_start {
        boundaries.push((tail_start, nres));
    }

    for &(start, stop) in &boundaries {
        let gap = stop - start;
        if gap == 0 || gap >= longer {
            continue;
        }
        for i in start..stop {
            weights[i] = base[i];
        }
        if window_len == 1 {
            // Anchors bordering a qualifying gap are reachable only by the
            // single-residue mover.
            if start > 0 {
                weights[start - 1] = base[start - 1];
            }
            if stop < nres {
                weights[stop] = base[stop];
            }
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::residue::Torsions;
    use crate::core::templates::{Chunk, Template, TemplateResidue, TemplateSet};
    use crate::core::utils::geometry::BackboneTriad;
    use std::collections::BTreeMap;

    fn template(name: &str, ranges: &[(usize, usize)]) -> Template {
        let mut residues = BTreeMap::new();
        for &(start, stop) in ranges {
            for i in start..=stop {
                residues.insert(
                    i,
                    TemplateResidue {
                        torsions: Torsions::extended(),
                        triad: BackboneTriad::local(),
                    },
                );
            }
        }
        let chunks = ranges.iter().map(|&(s, e)| Chunk::new(s, e)).collect();
        Template::new(name, residues, chunks)
    }

    #[test]
    fn base_weights_are_one_exactly_outside_template_coverage() {
        // Two disjoint templates covering 0..=19 and 30..=49 with a fragment
        // gap at 20..=29: the big-fragment weights are nonzero exactly there.
        let set = TemplateSet::new(
            vec![template("a", &[(0, 19)]), template("b", &[(30, 49)])],
            vec![0.5, 0.5],
            0,
        )
        .unwrap();
        let flags = crate::engine::config::ResidueFlags::all_enabled(50);
        let base = base_fragment_weights(50, &set, &flags, 0.0, false);
        for (i, &w) in base.iter().enumerate() {
            if (20..=29).contains(&i) || (30..=49).contains(&i) {
                assert_eq!(w, 1.0, "residue {i}");
            } else {
                assert_eq!(w, 0.0, "residue {i}");
            }
        }
    }

    #[test]
    fn domain_assembly_marks_coverage_from_every_template() {
        let set = TemplateSet::new(
            vec![template("a", &[(0, 19)]), template("b", &[(30, 49)])],
            vec![0.5, 0.5],
            0,
        )
        .unwrap();
        let flags = crate::engine::config::ResidueFlags::all_enabled(50);
        let base = base_fragment_weights(50, &set, &flags, 0.25, true);
        assert_eq!(base[10], 0.25);
        assert_eq!(base[40], 0.25);
        assert_eq!(base[25], 1.0);
    }

    #[test]
    fn sample_by_fragment_false_zeroes_the_residue() {
        let set = TemplateSet::new(vec![template("a", &[(0, 3)])], vec![1.0], 0).unwrap();
        let mut flags = crate::engine::config::ResidueFlags::all_enabled(10);
        flags.sample_by_fragment[7] = false;
        let base = base_fragment_weights(10, &set, &flags, 0.0, false);
        assert_eq!(base[7], 0.0);
        assert_eq!(base[8], 1.0);
    }

    #[test]
    fn big_class_keeps_the_base_unchanged() {
        let base = vec![1.0, 0.5, 0.0, 1.0];
        assert_eq!(weights_for(9, None, &[0, 3], &base), base);
    }

    #[test]
    fn small_class_keeps_only_short_gaps() {
        // Anchors at 0 and 6: the gap 1..=5 has length 5, shorter than a big
        // window of 9 but not shorter than 3.
        let base = vec![1.0; 12];
        let small = weights_for(3, Some(9), &[0, 6], &base);
        for i in 1..6 {
            assert_eq!(small[i], 1.0, "residue {i}");
        }
        assert_eq!(small[0], 0.0);
        assert_eq!(small[6], 0.0);
        // Trailing tail 7..=11 has length 5, also short enough.
        assert_eq!(small[9], 1.0);
    }

    #[test]
    fn long_gaps_are_left_to_the_big_class() {
        let base = vec![1.0; 30];
        let small = weights_for(3, Some(9), &[0, 15], &base);
        for i in 1..15 {
            assert_eq!(small[i], 0.0, "gap of 14 should stay big-class at {i}");
        }
    }

    #[test]
    fn one_mer_class_includes_anchors_bordering_short_gaps() {
        // Anchors at 4 and 7: gap 5..=6 of length 2 is shorter than a small
        // window of 3, so the 1mer class covers it plus both anchors.
        let base = vec![1.0; 10];
        let one = weights_for(1, Some(3), &[4, 7], &base);
        assert_eq!(one[5], 1.0);
        assert_eq!(one[6], 1.0);
        assert_eq!(one[4], 1.0);
        assert_eq!(one[7], 1.0);
        assert_eq!(one[2], 0.0);
    }

    #[test]
    fn classes_partition_eligible_positions() {
        // Every position with nonzero base weight must be claimed by exactly
        // one class when gaps are classified by window size.
        let base = vec![1.0; 40];
        let anchors = vec![0, 10, 13, 30];
        let big = weights_for(9, None, &anchors, &base);
        let small = weights_for(3, Some(9), &anchors, &base);
        let one = weights_for(1, Some(3), &anchors, &base);
        for i in 0..40 {
            if base[i] == 0.0 {
                continue;
            }
            // Big covers everything; small and 1mer must only refine, never
            // exceed, the base.
            assert!(big[i] <= base[i]);
            assert!(small[i] <= base[i]);
            assert!(one[i] <= base[i]);
            // Small eligibility implies a short gap, which the big mover will
            // skip via its window checks; the vectors themselves overlap by
            // design, mirroring how anchors partition windows at apply time.
            if small[i] > 0.0 {
                assert!(big[i] > 0.0);
            }
        }
        // The gap 11..=12 (length 2) belongs to the 1mer class.
        assert_eq!(one[11], 1.0);
        assert_eq!(small[11], 1.0);
    }
}
