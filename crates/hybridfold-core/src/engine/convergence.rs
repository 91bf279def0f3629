use crate::core::models::conformation::Conformation;
use tracing::{info, trace};

const CHECK_EVERY_ACCEPTS: u64 = 200;
const BIG_FRAG_RMSD_THRESHOLD: f64 = 3.0;
const SMALL_FRAG_RMSD_THRESHOLD: f64 = 1.5;

/// Tracks which eligible residues have had their extended-chain starting
/// geometry replaced at least once. Drives the first stage's early exit.
#[derive(Debug, Clone)]
pub struct TouchTracker {
    eligible: Vec<bool>,
    touched: Vec<bool>,
}

impl TouchTracker {
    pub fn new(eligible: Vec<bool>) -> Self {
        let len = eligible.len();
        Self {
            eligible,
            touched: vec![false; len],
        }
    }

    /// Marks an accepted move's residue span as touched.
    pub fn mark_span(&mut self, start: usize, stop: usize) {
        for i in start..=stop.min(self.touched.len() - 1) {
            self.touched[i] = true;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.eligible
            .iter()
            .zip(self.touched.iter())
            .all(|(&eligible, &touched)| !eligible || touched)
    }

    pub fn untouched(&self) -> Vec<usize> {
        self.eligible
            .iter()
            .zip(self.touched.iter())
            .enumerate()
            .filter(|&(_, (&eligible, &touched))| eligible && !touched)
            .map(|(i, _)| i)
            .collect()
    }
}

/// The third-stage convergence predicate: every 200 accepted moves, compare
/// CA RMSD over the big- and small-fragment-eligible residue subsets against
/// the conformation 200 accepts earlier. Converged once the big subset moves
/// less than 3 A and the small subset less than 1.5 A. When both subsets are
/// empty the RMSDs degenerate to zero and the check keeps the loop running
/// rather than halting it.
pub struct ConvergenceChecker {
    big_residues: Vec<usize>,
    small_residues: Vec<usize>,
    reference: Option<Conformation>,
    last_accepts: u64,
}

impl ConvergenceChecker {
    pub fn new(big_residues: Vec<usize>, small_residues: Vec<usize>) -> Self {
        Self {
            big_residues,
            small_residues,
            reference: None,
            last_accepts: 0,
        }
    }

    /// Returns true while sampling should continue.
    pub fn keep_going(&mut self, conformation: &Conformation, accepts: u64) -> bool {
        let Some(reference) = self.reference.as_ref() else {
            self.reference = Some(conformation.clone());
            return true;
        };
        if accepts % CHECK_EVERY_ACCEPTS != 0 {
            return true;
        }
        if accepts <= self.last_accepts {
            return true;
        }
        self.last_accepts = accepts;

        let rms_big = conformation.ca_rmsd_subset(reference, &self.big_residues);
        let rms_small = conformation.ca_rmsd_subset(reference, &self.small_residues);
        self.reference = Some(conformation.clone());

        if rms_big >= BIG_FRAG_RMSD_THRESHOLD
            || rms_small >= SMALL_FRAG_RMSD_THRESHOLD
            || (rms_big == 0.0 && rms_small == 0.0)
        {
            trace!(rms_big, rms_small, "Convergence check: continuing");
            true
        } else {
            info!(rms_big, rms_small, "Stopping cycles due to convergence");
            false
        }
    }
}
