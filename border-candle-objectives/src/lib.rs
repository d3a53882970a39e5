//! Objective functions of value-based and policy-based reinforcement learning,
//! implemented with [candle](https://crates.io/crates/candle-core).
//!
//! An objective turns a batch of transitions into gradients with respect to
//! the parameters of a function approximator, together with diagnostics.
//! Parameters and internal state are immutable [`NamedTensors`](util::NamedTensors)
//! passed in by the caller, so the same approximator can be evaluated under
//! the parameters of a main and a target network.
//!
//! * [`PpoClip`] optimizes a [`StochasticPolicy`](model::StochasticPolicy)
//!   with the clipped surrogate objective.
//! * [`QLearning`] regresses a [`QFunction`](model::QFunction) on n-step
//!   bootstrapped targets.
//!
//! Both implement [`Objective`], which is all an outer training loop needs.
pub mod autodiff;
pub mod base;
pub mod mlp;
pub mod model;
pub mod policy;
pub mod ppo_clip;
pub mod q;
pub mod q_learning;
pub mod regularizer;
pub mod util;
pub use base::{Objective, TransitionBatch};
pub use border_objectives_core::{record, Hyperparams, ObjectiveError, PrngKey, PrngSequence};
pub use ppo_clip::{PpoClip, PpoClipConfig};
pub use q_learning::{QLearning, QLearningConfig};
