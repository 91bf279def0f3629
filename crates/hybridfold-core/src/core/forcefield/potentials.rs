//! Pure evaluators for the individual energy terms. All operate on CA-level
//! geometry; each returns an unweighted energy that the owning
//! [`ScoreFunction`](super::scoring::ScoreFunction) scales.

use crate::core::models::conformation::Conformation;
use crate::core::utils::geometry::{BOND_C_N, BOND_N_CA, extend_chain_atom};

const CLASH_RADIUS: f64 = 4.0;
const BURIAL_RADIUS: f64 = 10.0;
const BURIAL_SATURATION: f64 = 12.0;
const CONTACT_RADIUS: f64 = 8.0;
const STRAND_PAIR_MIN: f64 = 4.0;
const STRAND_PAIR_MAX: f64 = 5.5;
const HELIX_STRAND_MAX: f64 = 7.0;
const HYDROPATHY_SCALE: f64 = 4.5;

/// Options for the strand-strand register term. Strand pairs closer in
/// sequence than `seq_sep_cutoff` are down-weighted, ramping linearly with
/// separation and scaled by `low_strand`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrandWeights {
    pub low_strand: f64,
    pub seq_sep_cutoff: usize,
}

impl Default for StrandWeights {
    fn default() -> Self {
        Self {
            low_strand: 1.0,
            seq_sep_cutoff: 11,
        }
    }
}

/// Quadratic soft-sphere repulsion between CA atoms.
pub fn clash_energy(conformation: &Conformation) -> f64 {
    let cas = conformation.ca_positions();
    let mut energy = 0.0;
    for i in 0..cas.len() {
        for j in i + 2..cas.len() {
            let d = (cas[i] - cas[j]).norm();
            if d < CLASH_RADIUS {
                let overlap = (CLASH_RADIUS - d) / CLASH_RADIUS;
                energy += overlap * overlap;
            }
        }
    }
    energy
}

/// Burial preference: hydrophobic residues are rewarded for high CA
/// neighbor counts, polar residues penalized.
pub fn env_energy(conformation: &Conformation) -> f64 {
    let cas = conformation.ca_positions();
    let mut energy = 0.0;
    for i in 0..cas.len() {
        let neighbors = (0..cas.len())
            .filter(|&j| j != i && (cas[i] - cas[j]).norm() < BURIAL_RADIUS)
            .count();
        let burial = (neighbors as f64 / BURIAL_SATURATION).min(1.0);
        let hydropathy = conformation.amino_acid(i).hydropathy() / HYDROPATHY_SCALE;
        energy -= hydropathy * burial;
    }
    energy
}

/// Hydrophobic contact reward between sequence-distant residue pairs.
pub fn pair_energy(conformation: &Conformation) -> f64 {
    let cas = conformation.ca_positions();
    let mut energy = 0.0;
    for i in 0..cas.len() {
        let hi = (conformation.amino_acid(i).hydropathy() / HYDROPATHY_SCALE).max(0.0);
        if hi == 0.0 {
            continue;
        }
        for j in i + 4..cas.len() {
            let hj = (conformation.amino_acid(j).hydropathy() / HYDROPATHY_SCALE).max(0.0);
            if hj == 0.0 {
                continue;
            }
            if (cas[i] - cas[j]).norm() < CONTACT_RADIUS {
                energy -= hi * hj;
            }
        }
    }
    energy
}

/// Strand-strand register reward for spatially adjacent strand residues.
pub fn ss_pair_energy(conformation: &Conformation, options: &StrandWeights) -> f64 {
    let mut energy = 0.0;
    for i in 0..conformation.len() {
        if conformation.secstruct(i) != 'E' {
            continue;
        }
        for j in i + 3..conformation.len() {
            if conformation.secstruct(j) != 'E' {
                continue;
            }
            let d = (conformation.ca(i) - conformation.ca(j)).norm();
            if (STRAND_PAIR_MIN..=STRAND_PAIR_MAX).contains(&d) {
                let separation = j - i;
                let factor = if separation < options.seq_sep_cutoff {
                    options.low_strand * separation as f64 / options.seq_sep_cutoff as f64
                } else {
                    1.0
                };
                energy -= factor;
            }
        }
    }
    energy
}

/// Helix-strand packing reward.
pub fn hs_pair_energy(conformation: &Conformation) -> f64 {
    let mut energy = 0.0;
    for i in 0..conformation.len() {
        if conformation.secstruct(i) != 'H' {
            continue;
        }
        for j in 0..conformation.len() {
            if conformation.secstruct(j) != 'E' || i.abs_diff(j) < 4 {
                continue;
            }
            let d = (conformation.ca(i) - conformation.ca(j)).norm();
            if (STRAND_PAIR_MIN..=HELIX_STRAND_MAX).contains(&d) {
                energy -= 0.25;
            }
        }
    }
    energy
}

/// Penalty per strand that has no spatial partner strand.
pub fn sheet_energy(conformation: &Conformation) -> f64 {
    let strands = strand_runs(conformation);
    let mut lonely = 0usize;
    for (a, strand) in strands.iter().enumerate() {
        let paired = strands.iter().enumerate().any(|(b, other)| {
            a != b
                && strand.iter().any(|&i| {
                    other
                        .iter()
                        .any(|&j| (conformation.ca(i) - conformation.ca(j)).norm() <= STRAND_PAIR_MAX)
                })
        });
        if !paired {
            lonely += 1;
        }
    }
    0.5 * lonely as f64
}

/// Deviation of the peptide bond length across every cut in the tree.
pub fn linear_chainbreak_energy(conformation: &Conformation) -> f64 {
    conformation
        .tree()
        .cuts()
        .iter()
        .map(|&c| {
            let d = (conformation.triad(c + 1).n - conformation.triad(c).c).norm();
            (d - BOND_C_N).abs()
        })
        .sum()
}

/// Deviation between the chain continuation predicted from the residue before
/// each cut and the actual placement of the residue after it.
pub fn overlap_chainbreak_energy(conformation: &Conformation) -> f64 {
    use crate::core::utils::geometry::{ANGLE_C_N_CA, ANGLE_CA_C_N};
    conformation
        .tree()
        .cuts()
        .iter()
        .map(|&c| {
            let before = conformation.triad(c);
            let after = conformation.triad(c + 1);
            let torsions = conformation.torsions(c);
            let predicted_n = extend_chain_atom(
                &before.n,
                &before.ca,
                &before.c,
                BOND_C_N,
                ANGLE_CA_C_N,
                torsions.psi,
            );
            let predicted_ca = extend_chain_atom(
                &before.ca,
                &before.c,
                &predicted_n,
                BOND_N_CA,
                ANGLE_C_N_CA,
                torsions.omega,
            );
            (predicted_n - after.n).norm() + (predicted_ca - after.ca).norm()
        })
        .sum()
}

/// Flat-bottomed CA-CA distance bounds carried by the conformation.
pub fn constraint_energy(conformation: &Conformation) -> f64 {
    conformation
        .constraints()
        .iter()
        .map(|bound| bound.penalty((conformation.ca(bound.i) - conformation.ca(bound.j)).norm()))
        .sum()
}

fn strand_runs(conformation: &Conformation) -> Vec<Vec<usize>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for i in 0..conformation.len() {
        if conformation.secstruct(i) == 'E' {
            current.push(i);
        } else if current.len() >= 2 {
            runs.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }
    if current.len() >= 2 {
        runs.push(current);
    }
    runs
}

// Used by the strand-pairing sampler to test template compatibility.
pub fn strand_pair_distance_plausible(d: f64) -> bool {
    (3.5..=7.0).contains(&d)
}
