//! Strand-pairing jump sampling: turning candidate beta pairings into a
//! consistent jump sample, synthesizing two-residue pairing templates,
//! filtering templates with conflicting geometry, and superimposing each
//! pairing into a template coordinate frame where possible.

use crate::core::forcefield::potentials::strand_pair_distance_plausible;
use crate::core::models::residue::Torsions;
use crate::core::templates::{Chunk, Template, TemplateResidue, TemplateSet};
use crate::core::utils::geometry::{BackboneTriad, superposition_transform};
use crate::engine::config::SheetCount;
use crate::engine::error::EngineError;
use crate::engine::movers::jump::PairingJump;
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

pub(crate) const JUMP_SAMPLE_ATTEMPTS: usize = 10;
const JUMP_FRAGMENTS_PER_PAIRING: usize = 20;
const MIN_SEQUENCE_SEPARATION: usize = 3;
const STRAND_RISE: f64 = 4.9;
const JITTER_ANGLE_DEG: f64 = 10.0;
const JITTER_TRANSLATION: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Parallel,
    Antiparallel,
}

/// A candidate beta pairing between two residues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrandPairing {
    pub i: usize,
    pub j: usize,
    pub orientation: Orientation,
}

impl StrandPairing {
    fn normalized(self) -> Self {
        if self.i <= self.j {
            self
        } else {
            Self {
                i: self.j,
                j: self.i,
                orientation: self.orientation,
            }
        }
    }
}

/// Everything the workflow needs after pairing setup: the jump movers'
/// fragment sets, which template indices are synthesized pairings, which of
/// those float, and the pairing anchor residues for tree construction.
#[derive(Debug, Clone)]
pub(crate) struct PairingSetup {
    pub pairings: Vec<StrandPairing>,
    pub jumps: Vec<PairingJump>,
    pub template_indices: Vec<usize>,
    pub floating: HashSet<usize>,
    pub anchors: Vec<usize>,
    /// Templates with geometry conflicting a chosen pairing (empty when
    /// filtering removed them).
    incompatible: HashSet<usize>,
    /// A first-residue fallback registered when filtering removed every
    /// template; never a superposition target.
    synthetic_initial: Option<usize>,
}

/// The rigid placement of the partner residue's backbone frame relative to
/// the base residue's frame for an ideal pairing of the given orientation.
fn canonical_pairing_transform(orientation: Orientation) -> Isometry3<f64> {
    let rotation = match orientation {
        Orientation::Parallel => UnitQuaternion::identity(),
        Orientation::Antiparallel => {
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::PI)
        }
    };
    Isometry3::from_parts(Translation3::new(0.0, STRAND_RISE, 0.0), rotation)
}

/// Builds a consistent jump sample from the candidate pairings, registers a
/// synthetic two-residue template per chosen pairing, and (optionally)
/// filters out templates whose geometry contradicts a pairing.
///
/// Returns `None` when no candidates are given. Fails after
/// [`JUMP_SAMPLE_ATTEMPTS`] retries if no consistent sample exists.
pub(crate) fn add_strand_pairings(
    templates: &mut TemplateSet,
    sequence_len: usize,
    candidates: &[StrandPairing],
    secstruct: &[char],
    sheets: SheetCount,
    filter_templates: bool,
    rng: &mut StdRng,
) -> Result<Option<PairingSetup>, EngineError> {
    if candidates.is_empty() {
        return Ok(None);
    }

    for pairing in candidates {
        if pairing.i == pairing.j || pairing.i >= sequence_len || pairing.j >= sequence_len {
            return Err(EngineError::PairingInconsistent {
                i: pairing.i,
                j: pairing.j,
                reason: "residues must be distinct and within the target".into(),
            });
        }
    }

    let chosen = draw_jump_sample(candidates, secstruct, sheets, rng)?;
    if chosen.is_empty() {
        return Ok(None);
    }
    info!(count = chosen.len(), "Strand-pairing jump sample selected");

    // Identify templates whose geometry contradicts a chosen pairing.
    let mut incompatible = HashSet::new();
    for pairing in &chosen {
        for (index, template) in templates.iter().enumerate() {
            if templates.is_pairing(index) {
                continue;
            }
            if !template.covers(pairing.i) || !template.covers(pairing.j) {
                continue;
            }
            if template_has_pairing(template, pairing) {
                info!(template = %template.name, i = pairing.i, j = pairing.j, "Template has pairing");
            } else {
                warn!(template = %template.name, i = pairing.i, j = pairing.j, "Template is missing pairing");
                incompatible.insert(index);
            }
        }
    }
    if filter_templates && !incompatible.is_empty() {
        templates.filter(&incompatible);
        incompatible.clear();
    }

    // Register the synthesized pairing templates.
    let mut jumps = Vec::new();
    let mut template_indices = Vec::new();
    let mut synthetic_initial = None;
    for pairing in &chosen {
        let template = synthesize_pairing_template(pairing);
        if templates.is_empty() {
            // Filtering removed everything: seed the set with the pairing's
            // first residue so tree construction still has an initial chunk.
            let mut seed = template.clone();
            seed.name = format!("{}_seed", template.name);
            let index = templates.add_template(
                Template::new(
                    seed.name.clone(),
                    [(pairing.i, *seed.residue(pairing.i).unwrap())].into(),
                    vec![Chunk::single(pairing.i)],
                ),
                0.0,
            );
            synthetic_initial = Some(index);
            warn!(
                index,
                "All templates were filtered; seeded the set from pairing residue {}", pairing.i
            );
        }
        let index = templates.add_pairing_template(template);
        template_indices.push(index);
        jumps.push(PairingJump {
            i: pairing.i,
            j: pairing.j,
            fragments: generate_jump_fragments(pairing.orientation, rng),
        });
        info!(i = pairing.i, j = pairing.j, index, "Added pairing as template");
    }

    let mut anchors: Vec<usize> = chosen.iter().flat_map(|p| [p.i, p.j]).collect();
    anchors.sort_unstable();
    anchors.dedup();

    Ok(Some(PairingSetup {
        pairings: chosen,
        jumps,
        template_indices,
        floating: HashSet::new(),
        anchors,
        incompatible,
        synthetic_initial,
    }))
}

fn draw_jump_sample(
    candidates: &[StrandPairing],
    secstruct: &[char],
    sheets: SheetCount,
    rng: &mut StdRng,
) -> Result<Vec<StrandPairing>, EngineError> {
    for _ in 0..JUMP_SAMPLE_ATTEMPTS {
        let target = match sheets {
            SheetCount::Exact(n) => n,
            SheetCount::Random(max) => rng.gen_range(1..=max.max(1)),
        };
        if target == 0 {
            return Ok(Vec::new());
        }

        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.shuffle(rng);

        let mut used: HashSet<usize> = HashSet::new();
        let mut chosen = Vec::new();
        for index in order {
            let pairing = candidates[index].normalized();
            if pairing.j - pairing.i < MIN_SEQUENCE_SEPARATION {
                continue;
            }
            if secstruct[pairing.i] == 'H' || secstruct[pairing.j] == 'H' {
                continue;
            }
            if used.contains(&pairing.i) || used.contains(&pairing.j) {
                continue;
            }
            used.insert(pairing.i);
            used.insert(pairing.j);
            chosen.push(pairing);
            if chosen.len() == target {
                return Ok(chosen);
            }
        }
    }
    Err(EngineError::JumpSampleExhausted {
        attempts: JUMP_SAMPLE_ATTEMPTS,
    })
}

/// A minimal two-residue template in ideal strand geometry: residue `i` at
/// the canonical frame, residue `j` placed by the pairing transform.
fn synthesize_pairing_template(pairing: &StrandPairing) -> Template {
    let base = TemplateResidue {
        torsions: Torsions::ideal_strand(),
        triad: BackboneTriad::local(),
    };
    let partner = TemplateResidue {
        torsions: Torsions::ideal_strand(),
        triad: BackboneTriad::local()
            .transformed(&canonical_pairing_transform(pairing.orientation)),
    };
    Template::new(
        format!("pairing_{}_{}", pairing.i, pairing.j),
        [(pairing.i, base), (pairing.j, partner)].into(),
        vec![Chunk::single(pairing.i), Chunk::single(pairing.j)],
    )
}

fn generate_jump_fragments(orientation: Orientation, rng: &mut StdRng) -> Vec<Isometry3<f64>> {
    let canonical = canonical_pairing_transform(orientation);
    (0..JUMP_FRAGMENTS_PER_PAIRING)
        .map(|_| {
            let axis = Vector3::new(
                rng.r#gen::<f64>() - 0.5,
                rng.r#gen::<f64>() - 0.5,
                rng.r#gen::<f64>() - 0.5,
            );
            let axis = if axis.norm() < 1e-9 {
                Vector3::y()
            } else {
                axis.normalize()
            };
            let angle = (rng.r#gen::<f64>() * 2.0 - 1.0) * JITTER_ANGLE_DEG.to_radians();
            let translation = Translation3::new(
                (rng.r#gen::<f64>() * 2.0 - 1.0) * JITTER_TRANSLATION,
                (rng.r#gen::<f64>() * 2.0 - 1.0) * JITTER_TRANSLATION,
                (rng.r#gen::<f64>() * 2.0 - 1.0) * JITTER_TRANSLATION,
            );
            let jitter = Isometry3::from_parts(
                translation,
                UnitQuaternion::from_axis_angle(&nalgebra::Unit::new_normalize(axis), angle),
            );
            jitter * canonical
        })
        .collect()
}

/// Whether a template that covers both partners actually places them as the
/// pairing demands: CA atoms at strand-pairing distance with chain
/// directions matching the orientation.
fn template_has_pairing(template: &Template, pairing: &StrandPairing) -> bool {
    let (Some(a), Some(b)) = (template.residue(pairing.i), template.residue(pairing.j)) else {
        return false;
    };
    let distance = (a.triad.ca - b.triad.ca).norm();
    if !strand_pair_distance_plausible(distance) {
        return false;
    }
    let direction_a = (a.triad.c - a.triad.n).normalize();
    let direction_b = (b.triad.c - b.triad.n).normalize();
    let dot = direction_a.dot(&direction_b);
    match pairing.orientation {
        Orientation::Parallel => dot > 0.0,
        Orientation::Antiparallel => dot < 0.0,
    }
}

/// Aligns each pairing template into an existing coordinate frame, trying in
/// priority order: the initial template, an already-aligned upstream pairing
/// sharing a residue, then any other live non-conflicting template in random
/// order. Pairings with no usable target are marked floating.
pub(crate) fn superimpose_pairings(
    templates: &mut TemplateSet,
    setup: &mut PairingSetup,
    rng: &mut StdRng,
) {
    for k in 0..setup.template_indices.len() {
        let pairing_index = setup.template_indices[k];
        let pairing = setup.pairings[k];

        let initial = templates.initial_index();
        let initial_usable = !templates.is_pairing(initial)
            && !setup.incompatible.contains(&initial)
            && setup.synthetic_initial != Some(initial);
        if initial_usable
            && superimpose_onto(
                templates,
                pairing_index,
                initial,
                &[pairing.i, pairing.j],
            )
        {
            info!(i = pairing.i, j = pairing.j, "Superimposed pairing onto the initial template");
            continue;
        }

        // Upstream pairings that already found a frame.
        let mut aligned = false;
        for m in 0..k {
            let other_index = setup.template_indices[m];
            if setup.floating.contains(&other_index) {
                continue;
            }
            let other = setup.pairings[m];
            let shared: Vec<usize> = [pairing.i, pairing.j]
                .into_iter()
                .filter(|r| *r == other.i || *r == other.j)
                .collect();
            if shared.is_empty() {
                continue;
            }
            if superimpose_onto(templates, pairing_index, other_index, &shared) {
                info!(i = pairing.i, j = pairing.j, "Superimposed pairing onto an upstream pairing");
                aligned = true;
                break;
            }
        }
        if aligned {
            continue;
        }

        // Any other live, non-conflicting template, in random order.
        let mut candidates: Vec<usize> = (0..templates.len())
            .filter(|&t| {
                t != initial
                    && !templates.is_pairing(t)
                    && !setup.incompatible.contains(&t)
                    && setup.synthetic_initial != Some(t)
                    && (templates.template(t).covers(pairing.i)
                        || templates.template(t).covers(pairing.j))
            })
            .collect();
        candidates.shuffle(rng);
        if let Some(&target) = candidates.iter().find(|&&t| {
            superimpose_onto(templates, pairing_index, t, &[pairing.i, pairing.j])
        }) {
            info!(i = pairing.i, j = pairing.j, target, "Superimposed pairing onto another template");
            continue;
        }

        info!(
            i = pairing.i,
            j = pairing.j,
            "Cannot superimpose pairing onto any template; treating it as a floating pair"
        );
        setup.floating.insert(pairing_index);
    }
}

/// Superimposes the pairing template onto `target` using the backbone atoms
/// of whichever of `residues` the target covers. Returns false when the
/// target covers none of them.
fn superimpose_onto(
    templates: &mut TemplateSet,
    pairing_index: usize,
    target_index: usize,
    residues: &[usize],
) -> bool {
    let mut from_points: Vec<Point3<f64>> = Vec::new();
    let mut to_points: Vec<Point3<f64>> = Vec::new();
    {
        let pairing_template = templates.template(pairing_index);
        let target = templates.template(target_index);
        for &residue in residues {
            let (Some(p), Some(t)) = (pairing_template.residue(residue), target.residue(residue))
            else {
                continue;
            };
            from_points.extend(p.triad.points());
            to_points.extend(t.triad.points());
        }
    }
    if from_points.is_empty() {
        return false;
    }
    let (rotation, translation) = superposition_transform(&from_points, &to_points);
    let iso = Isometry3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&rotation),
    );
    templates.template_mut(pairing_index).transform(&iso);
    true
}
