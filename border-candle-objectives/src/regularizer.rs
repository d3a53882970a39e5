//! Policy regularizers.
//!
//! A regularizer adds a per-transition penalty to a policy objective's loss.
//! It never changes the bare objective that is reported separately.
mod entropy;
use anyhow::Result;
use border_objectives_core::{record::Record, Hyperparams};
use candle_core::Tensor;
pub use entropy::EntropyRegularizer;

/// A penalty on the distribution parameters produced by a policy.
///
/// `D` is the distribution-parameter type of the policy.
pub trait PolicyRegularizer<D> {
    /// Namespace of the keys in [`PolicyRegularizer::metrics`].
    fn name(&self) -> &str;

    /// Default hyperparameters.
    fn hyperparams(&self) -> Hyperparams;

    /// Penalty of each transition, shape `[batch]`.
    fn apply(&self, dist_params: &D, hyperparams: &Hyperparams) -> Result<Tensor>;

    /// Diagnostics.
    fn metrics(&self, dist_params: &D, hyperparams: &Hyperparams) -> Result<Record>;
}
