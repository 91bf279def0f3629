use thiserror::Error;

use super::config::ConfigError;
use crate::core::fragments::FragmentError;
use crate::core::kinematics::builder::TreeBuildError;
use crate::core::models::residue::SequenceError;
use crate::core::templates::set::TemplateSetError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Sequence error: {source}")]
    Sequence {
        #[from]
        source: SequenceError,
    },

    #[error("Template set error: {source}")]
    TemplateSet {
        #[from]
        source: TemplateSetError,
    },

    #[error("Fragment library error: {source}")]
    Fragments {
        #[from]
        source: FragmentError,
    },

    #[error("Kinematic tree construction failed: {source}")]
    TreeBuild {
        #[from]
        source: TreeBuildError,
    },

    #[error("Input length mismatch for {what}: expected {expected}, found {found}")]
    InputMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("No consistent strand-pairing jump sample found after {attempts} attempts")]
    JumpSampleExhausted { attempts: usize },

    #[error("Strand pairing ({i}, {j}) is inconsistent: {reason}")]
    PairingInconsistent {
        i: usize,
        j: usize,
        reason: String,
    },
}
