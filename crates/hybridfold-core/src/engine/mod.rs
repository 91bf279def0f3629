//! # Engine Module
//!
//! The stateful sampling machinery of the hybridization search: stochastic
//! movers and their weighted composition, the Monte Carlo controller with
//! autotemperature, residue-weight computation for the fragment movers, the
//! strand-pairing jump sampler, and the per-stage convergence checks.
//!
//! Everything here operates on the stateless models from [`crate::core`] and
//! is orchestrated by [`crate::workflows`].

pub mod config;
pub mod convergence;
pub mod error;
pub(crate) mod monte_carlo;
pub(crate) mod movers;
pub mod pairing;
pub mod progress;
pub(crate) mod sampling;
pub(crate) mod weights;
