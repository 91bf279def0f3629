//! # Core Module
//!
//! Foundational, stateless building blocks of the hybridization engine:
//! conformation and kinematic-tree models, template and fragment collections,
//! the composite score functions, and geometry utilities. Nothing in this
//! layer owns sampling state; that belongs to [`crate::engine`].

pub mod forcefield;
pub mod fragments;
pub mod kinematics;
pub mod models;
pub mod templates;
pub mod utils;
