use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Input cost list is empty, cannot perform sampling")]
    EmptyCosts,
    #[error("Invalid beta value: {0}. Beta must be positive for Boltzmann sampling")]
    InvalidBeta(f64),
    #[error("Failed to create weighted distribution: {source}")]
    Distribution {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// Draws an index with probability proportional to `exp(-beta * cost)`,
/// shifted by the minimum cost for numerical stability. Low-cost entries are
/// preferred; the smooth fragment mover uses this to bias toward candidates
/// close to the current torsions.
pub fn boltzmann_sample(
    costs: &[f64],
    beta: f64,
    rng: &mut impl Rng,
) -> Result<usize, SamplingError> {
    if costs.is_empty() {
        return Err(SamplingError::EmptyCosts);
    }
    if beta <= 0.0 {
        return Err(SamplingError::InvalidBeta(beta));
    }

    let min_cost = costs
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);

    let weights: Vec<f64> = costs.iter().map(|&c| (-(c - min_cost) * beta).exp()).collect();

    let total: f64 = weights.iter().sum();
    if total <= f64::EPSILON {
        // Numerical underflow: every non-minimal entry vanished. The minimum
        // itself always has weight 1, so fall back to it.
        let idx = costs
            .iter()
            .position(|&c| (c - min_cost).abs() < f64::EPSILON)
            .unwrap_or(0);
        return Ok(idx);
    }

    let dist = WeightedIndex::new(&weights)?;
    Ok(dist.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn empty_costs_are_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            boltzmann_sample(&[], 1.0, &mut rng),
            Err(SamplingError::EmptyCosts)
        ));
    }

    #[test]
    fn non_positive_beta_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            boltzmann_sample(&[1.0], 0.0, &mut rng),
            Err(SamplingError::InvalidBeta(_))
        ));
    }

    #[test]
    fn strongly_prefers_the_lowest_cost_at_high_beta() {
        let mut rng = StdRng::seed_from_u64(42);
        let costs = [50.0, 0.0, 50.0];
        let mut hits = [0usize; 3];
        for _ in 0..200 {
            hits[boltzmann_sample(&costs, 5.0, &mut rng).unwrap()] += 1;
        }
        assert_eq!(hits[1], 200);
    }

    #[test]
    fn equal_costs_sample_roughly_uniformly() {
        let mut rng = StdRng::seed_from_u64(42);
        let costs = [1.0, 1.0, 1.0, 1.0];
        let mut hits = [0usize; 4];
        for _ in 0..4000 {
            hits[boltzmann_sample(&costs, 1.0, &mut rng).unwrap()] += 1;
        }
        for &h in &hits {
            assert!((700..1300).contains(&h), "counts were {hits:?}");
        }
    }
}
