//! Errors in the library.
use thiserror::Error;

/// Errors raised by objectives and their collaborators.
///
/// Configuration errors are raised when an objective is built; batch errors
/// are raised before any numeric work of an update starts.
#[derive(Error, Debug, PartialEq)]
pub enum ObjectiveError {
    /// The objective needs behavior-policy log-propensities but the batch has none.
    #[error("{0} requires log-propensities (logP) in the transition batch")]
    MissingPropensity(String),

    /// The update rule is only defined for discrete action spaces.
    #[error("{0} is only implemented for discrete action spaces")]
    DiscreteActionRequired(String),

    /// A hyperparameter is out of its valid range.
    #[error("Invalid hyperparameter {name}: {reason}")]
    InvalidHyperparameter {
        /// Name of the hyperparameter.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Fields of a transition batch disagree on shape.
    #[error("Transition batch shape error: {0}")]
    BatchShape(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
