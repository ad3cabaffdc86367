//! Error types for the mixer core.
//!
//! Every variant is a local rejection: the offending input or run is refused
//! and no session state changes.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MixerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MixerError {
    /// Concentration field was empty or not a number.
    #[error("concentration must be a valid non-negative number, got {0:?}")]
    InvalidConcentration(String),

    #[error("concentration must be non-negative, got {0}")]
    NegativeConcentration(f64),

    #[error("please enter a compound name")]
    EmptyCompoundName,

    /// Iteration count was not a positive integer.
    #[error("iterations must be a valid positive integer, got {0:?}")]
    InvalidIterations(String),

    #[error("total additive concentration must be a valid non-negative number, got {0:?}")]
    InvalidTotal(String),

    /// Only raised under the `reject` policy.
    #[error("compound {name:?} (normalized {key}) has no additive slot")]
    UnrecognizedCompound { name: String, key: String },

    #[error("scale factor must be a positive number, got {0}")]
    InvalidScale(f64),

    /// Only finished runs are recorded.
    #[error("run stopped after {completed} of {iterations} iterations")]
    RunIncomplete { completed: u32, iterations: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
