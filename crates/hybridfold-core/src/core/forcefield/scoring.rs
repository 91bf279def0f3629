use super::potentials::{self, StrandWeights};
use super::term::ScoreTerm;
use crate::core::models::conformation::Conformation;
use std::collections::BTreeMap;

/// A weighted composite of energy terms. Terms with zero weight are never
/// evaluated. Term order is fixed (BTreeMap) so that scores are bit-for-bit
/// reproducible across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreFunction {
    weights: BTreeMap<ScoreTerm, f64>,
    strand_weights: StrandWeights,
}

impl Default for ScoreFunction {
    fn default() -> Self {
        Self::empty()
    }
}

impl ScoreFunction {
    pub fn empty() -> Self {
        Self {
            weights: BTreeMap::new(),
            strand_weights: StrandWeights::default(),
        }
    }

    /// The full nominal profile from which the staged functions derive.
    pub fn default_base() -> Self {
        let mut function = Self::empty();
        function.set_weight(ScoreTerm::Vdw, 1.0);
        function.set_weight(ScoreTerm::Env, 1.0);
        function.set_weight(ScoreTerm::Pair, 1.0);
        function.set_weight(ScoreTerm::SsPair, 1.0);
        function.set_weight(ScoreTerm::HsPair, 1.0);
        function.set_weight(ScoreTerm::Sheet, 1.0);
        function.set_weight(ScoreTerm::LinearChainbreak, 1.0);
        function.set_weight(ScoreTerm::AtomPairConstraint, 0.5);
        function
    }

    pub fn set_weight(&mut self, term: ScoreTerm, weight: f64) {
        if weight == 0.0 {
            self.weights.remove(&term);
        } else {
            self.weights.insert(term, weight);
        }
    }

    pub fn weight(&self, term: ScoreTerm) -> f64 {
        self.weights.get(&term).copied().unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        self.weights.clear();
    }

    pub fn strand_weights(&self) -> StrandWeights {
        self.strand_weights
    }

    pub fn set_strand_weights(&mut self, strand_weights: StrandWeights) {
        self.strand_weights = strand_weights;
    }

    pub fn score(&self, conformation: &Conformation) -> f64 {
        self.weights
            .iter()
            .map(|(&term, &weight)| weight * self.evaluate(term, conformation))
            .sum()
    }

    fn evaluate(&self, term: ScoreTerm, conformation: &Conformation) -> f64 {
        match term {
            ScoreTerm::Vdw => potentials::clash_energy(conformation),
            ScoreTerm::Env => potentials::env_energy(conformation),
            ScoreTerm::Pair => potentials::pair_energy(conformation),
            ScoreTerm::SsPair => potentials::ss_pair_energy(conformation, &self.strand_weights),
            ScoreTerm::HsPair => potentials::hs_pair_energy(conformation),
            ScoreTerm::Sheet => potentials::sheet_energy(conformation),
            ScoreTerm::LinearChainbreak => potentials::linear_chainbreak_energy(conformation),
            ScoreTerm::OverlapChainbreak => potentials::overlap_chainbreak_energy(conformation),
            ScoreTerm::AtomPairConstraint => potentials::constraint_energy(conformation),
        }
    }
}
