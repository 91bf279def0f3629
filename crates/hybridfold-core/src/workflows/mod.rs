//! # Workflows Module
//!
//! The public, user-facing layer: complete sampling procedures assembled
//! from the `core` and `engine` building blocks. [`hybridize::run`] is the
//! staged template/fragment hybridization search.

pub mod hybridize;
