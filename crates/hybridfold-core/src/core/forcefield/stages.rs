//! The five staged score functions and their weight ramps.
//!
//! All five derive from one base profile. Stage 0 resolves clashes only;
//! stage 1 adds low-weight secondary-structure and pairwise terms; stages
//! 2/2b differ only in their strand-strand weighting profile and are
//! alternated inside the third sampling stage; the final function carries the
//! full profile. Chain-break weights ramp per macro-iteration; the formulas
//! live here so their boundary values are testable in one place.

use super::potentials::StrandWeights;
use super::scoring::ScoreFunction;
use super::term::ScoreTerm;

/// The staged functions, in order of increasing term coverage.
#[derive(Debug, Clone)]
pub struct StagedScoreFunctions {
    pub stage0: ScoreFunction,
    pub stage1: ScoreFunction,
    pub stage2: ScoreFunction,
    pub stage2b: ScoreFunction,
    pub final_stage: ScoreFunction,
}

impl StagedScoreFunctions {
    pub fn from_base(base: &ScoreFunction) -> Self {
        let chainbreak = base.weight(ScoreTerm::LinearChainbreak);
        let constraint = base.weight(ScoreTerm::AtomPairConstraint);

        let mut stage0 = ScoreFunction::empty();
        stage0.set_weight(ScoreTerm::Vdw, 0.1 * base.weight(ScoreTerm::Vdw));

        let mut stage1 = ScoreFunction::empty();
        stage1.set_weight(ScoreTerm::LinearChainbreak, 0.1 * chainbreak);
        stage1.set_weight(ScoreTerm::AtomPairConstraint, 0.1 * constraint);
        stage1.set_weight(ScoreTerm::Vdw, base.weight(ScoreTerm::Vdw));
        stage1.set_weight(ScoreTerm::Env, base.weight(ScoreTerm::Env));
        stage1.set_weight(ScoreTerm::Pair, base.weight(ScoreTerm::Pair));
        stage1.set_weight(ScoreTerm::HsPair, base.weight(ScoreTerm::HsPair));
        stage1.set_weight(ScoreTerm::SsPair, 0.3 * base.weight(ScoreTerm::SsPair));
        stage1.set_weight(ScoreTerm::Sheet, base.weight(ScoreTerm::Sheet));
        stage1.set_strand_weights(StrandWeights {
            low_strand: 1.0,
            seq_sep_cutoff: 11,
        });

        let mut stage2 = stage1.clone();
        stage2.set_weight(ScoreTerm::LinearChainbreak, 0.25 * chainbreak);
        stage2.set_weight(ScoreTerm::AtomPairConstraint, 0.25 * constraint);
        stage2.set_strand_weights(StrandWeights {
            low_strand: 1.0,
            seq_sep_cutoff: 6,
        });

        let mut stage2b = stage2.clone();
        stage2b.set_strand_weights(StrandWeights {
            low_strand: 1.0,
            seq_sep_cutoff: 11,
        });

        Self {
            stage0,
            stage1,
            stage2,
            stage2b,
            final_stage: base.clone(),
        }
    }
}

/// Chain-break weight for the single second-stage pass: one third of the
/// quarter-strength weight, scaled by the global increase factor.
pub fn stage2_chainbreak_weight(increase_factor: f64) -> f64 {
    0.25 / 3.0 * increase_factor
}

/// Chain-break weights for the two alternating third-stage functions at the
/// given macro-iteration progress in (0, 1]. Both ramp from zero.
pub fn stage3_chainbreak_weights(progress: f64, increase_factor: f64) -> (f64, f64) {
    let fact = progress * increase_factor / 3.0;
    (2.5 * fact, 0.5 * fact)
}

/// Chain-break weight for the final stage: ramps from 2.5/3 to 4/3 of the
/// increase factor across the three macro-iterations.
pub fn stage4_chainbreak_weight(progress: f64, increase_factor: f64) -> f64 {
    (1.5 * progress + 2.5) * increase_factor / 3.0
}

/// Overlap chain-break weight for the final stage: linear 0 to 1.
pub fn stage4_overlap_weight(progress: f64) -> f64 {
    progress
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage0_keeps_only_the_clash_term() {
        let staged = StagedScoreFunctions::from_base(&ScoreFunction::default_base());
        assert!((staged.stage0.weight(ScoreTerm::Vdw) - 0.1).abs() < 1e-12);
        for term in ScoreTerm::ALL {
            if term != ScoreTerm::Vdw {
                assert_eq!(staged.stage0.weight(term), 0.0, "{} leaked", term.name());
            }
        }
    }

    #[test]
    fn stage1_down_weights_chainbreak_and_ss_pair() {
        let staged = StagedScoreFunctions::from_base(&ScoreFunction::default_base());
        assert!((staged.stage1.weight(ScoreTerm::LinearChainbreak) - 0.1).abs() < 1e-12);
        assert!((staged.stage1.weight(ScoreTerm::SsPair) - 0.3).abs() < 1e-12);
        assert_eq!(staged.stage1.weight(ScoreTerm::Env), 1.0);
    }

    #[test]
    fn stage2_variants_differ_only_in_strand_profile() {
        let staged = StagedScoreFunctions::from_base(&ScoreFunction::default_base());
        assert_eq!(staged.stage2.strand_weights().seq_sep_cutoff, 6);
        assert_eq!(staged.stage2b.strand_weights().seq_sep_cutoff, 11);
        let mut normalized = staged.stage2b.clone();
        normalized.set_strand_weights(staged.stage2.strand_weights());
        assert_eq!(normalized, staged.stage2);
    }

    #[test]
    fn final_stage_is_the_base_profile() {
        let base = ScoreFunction::default_base();
        let staged = StagedScoreFunctions::from_base(&base);
        assert_eq!(staged.final_stage, base);
    }

    #[test]
    fn stage3_ramp_boundary_values_are_exact() {
        let k = 2.0;
        assert_eq!(stage3_chainbreak_weights(0.0, k), (0.0, 0.0));
        let (a, b) = stage3_chainbreak_weights(1.0, k);
        assert!((a - 2.5 * k / 3.0).abs() < 1e-12);
        assert!((b - 0.5 * k / 3.0).abs() < 1e-12);
    }

    #[test]
    fn stage4_ramp_boundary_values_are_exact() {
        let k = 2.0;
        assert!((stage4_chainbreak_weight(0.0, k) - 2.5 * k / 3.0).abs() < 1e-12);
        assert!((stage4_chainbreak_weight(1.0, k) - 4.0 * k / 3.0).abs() < 1e-12);
        assert_eq!(stage4_overlap_weight(0.0), 0.0);
        assert_eq!(stage4_overlap_weight(1.0), 1.0);
    }

    #[test]
    fn stage2_chainbreak_is_a_third_of_quarter_strength() {
        assert!((stage2_chainbreak_weight(3.0) - 0.25).abs() < 1e-12);
    }
}
