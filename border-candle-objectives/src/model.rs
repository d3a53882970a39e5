//! Interfaces of function approximators consumed by objectives.
//!
//! Approximators own no trainable state. Parameters and internal state are
//! passed in by reference and a new state is returned, so evaluating the main
//! and the target network only differs in the [`Params`] handed over.
use crate::util::NamedTensors;
use anyhow::Result;
use border_objectives_core::PrngKey;
use candle_core::Tensor;

/// Trainable weights of a function approximator.
pub type Params = NamedTensors;

/// Non-trainable internal state of a function approximator.
pub type FuncState = NamedTensors;

/// A function approximator evaluated on a batch of states.
pub trait FuncApprox {
    /// Output of the approximator, e.g. parameters of an action distribution.
    type Output;

    /// Evaluates the approximator.
    ///
    /// `is_training` switches stochastic regularization such as dropout on.
    fn apply(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        s: &Tensor,
        is_training: bool,
    ) -> Result<(Self::Output, FuncState)>;
}

/// A stochastic policy `π(a|s)`.
pub trait StochasticPolicy: FuncApprox {
    /// Returns `true` if actions are indices into a finite set.
    fn action_space_is_discrete(&self) -> bool;

    /// Turns raw actions into the representation [`StochasticPolicy::log_proba`] expects.
    fn action_preprocessor(&self, params: &Params, rng: PrngKey, a: &Tensor) -> Result<Tensor>;

    /// Log-probabilities of preprocessed actions, one per transition.
    fn log_proba(&self, dist_params: &Self::Output, x_a: &Tensor) -> Result<Tensor>;

    /// Entropy of the action distribution, one per transition.
    fn entropy(&self, dist_params: &Self::Output) -> Result<Tensor>;
}

/// An action-value function `q(s, a)`.
pub trait QFunction {
    /// Returns `true` if actions are indices into a finite set.
    fn action_space_is_discrete(&self) -> bool;

    /// Evaluates `q(s, a)` for the given actions; the output has shape `[batch]`.
    fn apply_type1(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        s: &Tensor,
        a: &Tensor,
        is_training: bool,
    ) -> Result<(Tensor, FuncState)>;

    /// Evaluates `q(s, ·)` for every discrete action; the output has shape
    /// `[batch, n_actions]`.
    fn apply_type2(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        s: &Tensor,
        is_training: bool,
    ) -> Result<(Tensor, FuncState)>;
}
