//! The contract shared by all update rules.
mod transition_batch;
use crate::model::{FuncState, Params};
use anyhow::Result;
use border_objectives_core::{record::Record, Hyperparams, ObjectiveError, PrngKey};
pub use transition_batch::TransitionBatch;

/// A learning-update rule.
///
/// The outer training loop only talks to this trait, so it does not depend on
/// whether it drives a policy objective or a TD update. An implementation holds
/// immutable hyperparameters and references to its function approximators; a
/// call is a pure function of its explicit arguments.
pub trait Objective {
    /// Rule-specific input besides the transition batch, e.g. advantages or
    /// the parameters of a target network.
    type Extra;

    /// Namespace of the keys in the returned metrics.
    const NAME: &'static str;

    /// Whether the batch must carry behavior-policy log-propensities.
    const REQUIRES_PROPENSITIES: bool;

    /// Current hyperparameters, including those of an attached regularizer.
    fn hyperparams(&self) -> Hyperparams;

    /// Rejects batches the rule cannot consume.
    fn check_batch(&self, transition_batch: &TransitionBatch) -> Result<()> {
        if Self::REQUIRES_PROPENSITIES && transition_batch.logp.is_none() {
            return Err(ObjectiveError::MissingPropensity(Self::NAME.to_string()).into());
        }
        Ok(())
    }

    /// Computes gradients with respect to `params`, the new internal state of
    /// the approximator and diagnostics.
    fn grads_and_metrics(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        transition_batch: &TransitionBatch,
        extra: &Self::Extra,
    ) -> Result<(Params, FuncState, Record)>;
}
