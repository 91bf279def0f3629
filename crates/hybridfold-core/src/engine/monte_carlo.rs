use crate::core::forcefield::scoring::ScoreFunction;
use crate::core::models::conformation::Conformation;
use rand::Rng;
use tracing::debug;

const AUTOTEMP_CHECK_INTERVAL: u64 = 100;
const AUTOTEMP_LOW_ACCEPTANCE: f64 = 0.2;
const AUTOTEMP_HIGH_ACCEPTANCE: f64 = 0.6;
const AUTOTEMP_FACTOR: f64 = 1.25;
const AUTOTEMP_MIN: f64 = 0.1;
const AUTOTEMP_MAX: f64 = 100.0;

/// The Metropolis criterion at a fixed temperature: downhill or equal moves
/// are always accepted, uphill moves with probability `exp(-delta / t)`.
pub fn metropolis(delta: f64, temperature: f64, rng: &mut impl Rng) -> bool {
    delta <= 0.0 || rng.r#gen::<f64>() < (-delta / temperature).exp()
}

#[derive(Debug, Clone)]
struct AutoTemp {
    window_trials: u64,
    window_accepts: u64,
}

/// Per-stage Monte Carlo bookkeeping: the last accepted conformation, the
/// best one seen so far, acceptance counters and the (optionally
/// self-adjusting) temperature. Only this controller mutates its state.
pub struct MonteCarlo {
    score_function: ScoreFunction,
    temperature: f64,
    autotemp: Option<AutoTemp>,
    last_accepted: Conformation,
    last_accepted_score: f64,
    lowest: Conformation,
    lowest_score: f64,
    trials: u64,
    accepts: u64,
}

impl MonteCarlo {
    pub fn new(
        conformation: &Conformation,
        score_function: ScoreFunction,
        temperature: f64,
    ) -> Self {
        let score = score_function.score(conformation);
        Self {
            score_function,
            temperature,
            autotemp: None,
            last_accepted: conformation.clone(),
            last_accepted_score: score,
            lowest: conformation.clone(),
            lowest_score: score,
            trials: 0,
            accepts: 0,
        }
    }

    /// Enables acceptance-rate temperature control: every
    /// `AUTOTEMP_CHECK_INTERVAL` trials the temperature is heated or cooled
    /// by a fixed factor to steer the acceptance rate into the target band.
    pub fn set_autotemp(&mut self, enabled: bool) {
        self.autotemp = enabled.then_some(AutoTemp {
            window_trials: 0,
            window_accepts: 0,
        });
    }

    /// Scores the proposal and applies the Metropolis criterion. On rejection
    /// the conformation is rolled back to the last accepted state. Returns
    /// whether the proposal was accepted.
    pub fn boltzmann(&mut self, conformation: &mut Conformation, rng: &mut impl Rng) -> bool {
        let score = self.score_function.score(conformation);
        let delta = score - self.last_accepted_score;
        let accepted = metropolis(delta, self.temperature, rng);

        self.trials += 1;
        if accepted {
            self.accepts += 1;
            self.last_accepted = conformation.clone();
            self.last_accepted_score = score;
            if score < self.lowest_score {
                self.lowest = conformation.clone();
                self.lowest_score = score;
            }
        } else {
            *conformation = self.last_accepted.clone();
        }

        self.update_autotemp(accepted);
        accepted
    }

    fn update_autotemp(&mut self, accepted: bool) {
        let Some(autotemp) = self.autotemp.as_mut() else {
            return;
        };
        autotemp.window_trials += 1;
        if accepted {
            autotemp.window_accepts += 1;
        }
        if autotemp.window_trials < AUTOTEMP_CHECK_INTERVAL {
            return;
        }
        let rate = autotemp.window_accepts as f64 / autotemp.window_trials as f64;
        autotemp.window_trials = 0;
        autotemp.window_accepts = 0;
        if rate < AUTOTEMP_LOW_ACCEPTANCE {
            self.temperature = (self.temperature * AUTOTEMP_FACTOR).min(AUTOTEMP_MAX);
            debug!(rate, temperature = self.temperature, "Autotemp: heating");
        } else if rate > AUTOTEMP_HIGH_ACCEPTANCE {
            self.temperature = (self.temperature / AUTOTEMP_FACTOR).max(AUTOTEMP_MIN);
            debug!(rate, temperature = self.temperature, "Autotemp: cooling");
        }
    }

    /// Overwrites the conformation with the best one seen so far.
    pub fn recover_low(&self, conformation: &mut Conformation) {
        *conformation = self.lowest.clone();
    }

    /// Re-seeds the bookkeeping from the given conformation, clearing the
    /// best-seen state but keeping counters and temperature.
    pub fn reset(&mut self, conformation: &Conformation) {
        let score = self.score_function.score(conformation);
        self.last_accepted = conformation.clone();
        self.last_accepted_score = score;
        self.lowest = conformation.clone();
        self.lowest_score = score;
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn num_trials(&self) -> u64 {
        self.trials
    }

    pub fn num_accepts(&self) -> u64 {
        self.accepts
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.accepts as f64 / self.trials as f64
        }
    }

    pub fn lowest_score(&self) -> f64 {
        self.lowest_score
    }

    pub fn last_accepted_score(&self) -> f64 {
        self.last_accepted_score
    }

    pub fn log_counters(&self, stage: &str) {
        debug!(
            stage,
            trials = self.trials,
            accepts = self.accepts,
            rate = self.acceptance_rate(),
            lowest = self.lowest_score,
            "Monte Carlo counters"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::term::ScoreTerm;
    use crate::core::models::residue::{Torsions, parse_sequence};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn conformation() -> Conformation {
        Conformation::extended(parse_sequence(&"A".repeat(12)).unwrap(), vec!['L'; 12])
    }

    fn clash_function() -> ScoreFunction {
        let mut f = ScoreFunction::empty();
        f.set_weight(ScoreTerm::Vdw, 1.0);
        f
    }

    #[test]
    fn downhill_moves_are_always_accepted() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            assert!(metropolis(-0.5, 2.0, &mut rng));
            assert!(metropolis(0.0, 2.0, &mut rng));
        }
    }

    #[test]
    fn uphill_acceptance_converges_to_the_boltzmann_factor() {
        let mut rng = StdRng::seed_from_u64(11);
        let (delta, temperature): (f64, f64) = (1.5, 2.0);
        let expected = (-delta / temperature).exp();
        let trials = 40_000;
        let accepted = (0..trials)
            .filter(|_| metropolis(delta, temperature, &mut rng))
            .count();
        let rate = accepted as f64 / trials as f64;
        assert!(
            (rate - expected).abs() < 0.01,
            "rate {rate} vs expected {expected}"
        );
    }

    /// A compact helical start under an end-to-end distance bound: stretching
    /// the chain back out is a large, certain uphill move.
    fn bounded_compact_chain() -> (Conformation, ScoreFunction) {
        let mut conf = conformation();
        conf.add_constraint(crate::core::models::conformation::DistanceBound {
            i: 0,
            j: 11,
            upper: 20.0,
            stdev: 1.0,
        });
        conf.set_window_torsions(0, &[Torsions::new(-57.0, -47.0, 180.0); 12]);
        let mut function = ScoreFunction::empty();
        function.set_weight(ScoreTerm::AtomPairConstraint, 1.0);
        (conf, function)
    }

    #[test]
    fn rejected_moves_roll_back_the_conformation() {
        let (mut conf, function) = bounded_compact_chain();
        // Near-zero temperature makes any uphill move a certain rejection.
        let mut mc = MonteCarlo::new(&conf, function, 1e-12);
        let mut rng = StdRng::seed_from_u64(5);
        let before = conf.ca_positions();

        conf.set_window_torsions(0, &[Torsions::extended(); 12]);
        let accepted = mc.boltzmann(&mut conf, &mut rng);

        assert!(!accepted);
        let after = conf.ca_positions();
        for (b, a) in before.iter().zip(after.iter()) {
            assert!((b - a).norm() < 1e-12);
        }
    }

    #[test]
    fn best_score_is_monotonically_non_increasing() {
        let mut conf = conformation();
        let mut mc = MonteCarlo::new(&conf, clash_function(), 2.0);
        let mut rng = StdRng::seed_from_u64(9);
        let mut best_history = vec![mc.lowest_score()];

        for i in 0..200 {
            let phi = -150.0 + (i as f64 * 37.0) % 300.0;
            let psi = 150.0 - (i as f64 * 53.0) % 300.0;
            conf.set_window_torsions(i % 10, &[Torsions::new(phi, psi, 180.0)]);
            mc.boltzmann(&mut conf, &mut rng);
            best_history.push(mc.lowest_score());
        }

        for pair in best_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12);
        }
    }

    #[test]
    fn recover_low_restores_the_best_conformation() {
        let (mut conf, function) = bounded_compact_chain();
        let best_score = function.score(&conf);
        let mut mc = MonteCarlo::new(&conf, function.clone(), 1000.0);
        let mut rng = StdRng::seed_from_u64(17);

        // The compact start satisfies the bound exactly; wander uphill at
        // high temperature, then recover the best-seen state.
        for _ in 0..20 {
            conf.set_window_torsions(0, &[Torsions::extended(); 12]);
            mc.boltzmann(&mut conf, &mut rng);
        }
        mc.recover_low(&mut conf);
        assert!((function.score(&conf) - best_score).abs() < 1e-12);
        assert!((mc.lowest_score() - best_score).abs() < 1e-12);
    }

    #[test]
    fn autotemp_heats_when_everything_is_rejected() {
        let (mut conf, function) = bounded_compact_chain();
        let mut mc = MonteCarlo::new(&conf, function, 1e-9);
        mc.set_autotemp(true);
        let mut rng = StdRng::seed_from_u64(23);
        let start_temp = mc.temperature();

        for _ in 0..AUTOTEMP_CHECK_INTERVAL + 1 {
            conf.set_window_torsions(0, &[Torsions::extended(); 12]);
            mc.boltzmann(&mut conf, &mut rng);
        }
        assert!(mc.temperature() > start_temp);
    }

    #[test]
    fn reset_reseeds_best_from_the_given_conformation() {
        let mut conf = conformation();
        let mut mc = MonteCarlo::new(&conf, clash_function(), 2.0);
        conf.set_window_torsions(2, &[Torsions::new(60.0, 60.0, 60.0); 6]);
        mc.reset(&conf);
        assert!((mc.lowest_score() - clash_function().score(&conf)).abs() < 1e-12);
        assert_eq!(mc.lowest_score(), mc.last_accepted_score());
    }
}
