#![warn(missing_docs)]
//! Backend-agnostic building blocks of learning-update objectives.
//!
//! The tensor-level update rules live in `border-candle-objectives`; this crate
//! holds what they share regardless of the numeric backend:
//!
//! * [`record::Record`] - named scalar diagnostics returned by every update.
//! * [`ObjectiveError`] - configuration and batch-validation errors.
//! * [`PrngKey`] and [`PrngSequence`] - explicit, reproducible randomness.
//! * [`Hyperparams`] - hyperparameters passed at call time.
pub mod error;
pub mod record;
mod rng;
use std::collections::HashMap;

pub use error::ObjectiveError;
pub use rng::{PrngKey, PrngSequence};

/// Hyperparameters passed to an update at call time, keyed by name.
///
/// Passing them per call (rather than fixing them at construction) lets the
/// outer training loop schedule values such as an entropy coefficient.
pub type Hyperparams = HashMap<String, f64>;
