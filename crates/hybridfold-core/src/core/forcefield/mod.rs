pub mod potentials;
pub mod scoring;
pub mod stages;
pub mod term;
