use super::{MoveOutcome, Mover};
use crate::core::fragments::FragmentLibrary;
use crate::core::kinematics::tree::KinematicTree;
use crate::core::models::conformation::Conformation;
use crate::engine::sampling::boltzmann_sample;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

/// Inverse temperature for the smooth selection bias over per-degree torsion
/// distances.
const SMOOTH_SELECTION_BETA: f64 = 0.05;

/// How a fragment is drawn once a frame has been chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentSelection {
    /// Uniform draw among the `n` top-ranked candidates (0 = all).
    TopN(usize),
    /// Boltzmann draw over torsion distance to the current window, biasing
    /// toward candidates that perturb the conformation least.
    Smooth { top_n: usize },
}

/// Weighted-random torsion-window replacement. The frame is drawn by the
/// per-residue weight at its start; frames whose window crosses a cut (i.e.
/// leaves its segment) are ineligible. An all-zero weight vector makes the
/// mover a permanent no-op.
pub struct FragmentTrialMover<'a> {
    library: &'a FragmentLibrary,
    selection: FragmentSelection,
    eligible_frames: Vec<usize>,
    distribution: Option<WeightedIndex<f64>>,
}

impl<'a> FragmentTrialMover<'a> {
    pub fn new(
        library: &'a FragmentLibrary,
        residue_weights: &[f64],
        tree: &KinematicTree,
        selection: FragmentSelection,
    ) -> Self {
        let window = library.window_len();
        let nres = residue_weights.len();
        let mut eligible_frames = Vec::new();
        let mut frame_weights = Vec::new();
        for (index, frame) in library.frames().iter().enumerate() {
            if frame.fragments.is_empty() {
                continue;
            }
            let stop = frame.start + window - 1;
            if stop >= nres || residue_weights[frame.start] <= 0.0 {
                continue;
            }
            if !tree.window_in_one_segment(frame.start, stop) {
                continue;
            }
            eligible_frames.push(index);
            frame_weights.push(residue_weights[frame.start]);
        }
        let distribution = WeightedIndex::new(&frame_weights).ok();
        Self {
            library,
            selection,
            eligible_frames,
            distribution,
        }
    }

    /// Number of frames this mover can actually insert at.
    pub fn total_frames(&self) -> usize {
        self.eligible_frames.len()
    }

    /// Average candidate count per frame in the underlying library.
    pub fn nr_frags(&self) -> usize {
        self.library.mean_fragments_per_frame()
    }

    fn pick_fragment(
        &self,
        conformation: &Conformation,
        frame_index: usize,
        rng: &mut StdRng,
    ) -> usize {
        let frame = &self.library.frames()[frame_index];
        let (top_n, smooth) = match self.selection {
            FragmentSelection::TopN(n) => (n, false),
            FragmentSelection::Smooth { top_n } => (top_n, true),
        };
        let pool = if top_n == 0 {
            frame.fragments.len()
        } else {
            top_n.min(frame.fragments.len())
        };
        if pool == 1 {
            return 0;
        }
        if !smooth {
            return rng.gen_range(0..pool);
        }
        let costs: Vec<f64> = frame.fragments[..pool]
            .iter()
            .map(|fragment| {
                fragment
                    .torsions
                    .iter()
                    .enumerate()
                    .map(|(offset, torsions)| {
                        torsions.distance(&conformation.torsions(frame.start + offset))
                    })
                    .sum()
            })
            .collect();
        boltzmann_sample(&costs, SMOOTH_SELECTION_BETA, rng).unwrap_or(0)
    }
}

impl<'a> Mover for FragmentTrialMover<'a> {
    fn apply(&mut self, conformation: &mut Conformation, rng: &mut StdRng) -> MoveOutcome {
        let Some(distribution) = self.distribution.as_ref() else {
            return MoveOutcome::NoOp;
        };
        let frame_index = self.eligible_frames[distribution.sample(rng)];
        let fragment_index = self.pick_fragment(conformation, frame_index, rng);
        let frame = &self.library.frames()[frame_index];
        let torsions = frame.fragments[fragment_index].torsions.clone();
        conformation.set_window_torsions(frame.start, &torsions);
        MoveOutcome::Moved {
            start: frame.start,
            stop: frame.start + torsions.len() - 1,
        }
    }

    fn name(&self) -> &'static str {
        "fragment_trial"
    }
}
