//! Reverse-mode differentiation of a scalar loss with respect to [`Params`].
use crate::model::Params;
use anyhow::Result;
use candle_core::Tensor;
use log::trace;

/// Differentiates `loss_fn` with respect to `params`.
///
/// Each parameter is copied into a fresh [`candle_core::Var`] before `loss_fn`
/// is evaluated, so `params` itself is never tracked or mutated and any tensor
/// not derived from the argument handed to `loss_fn` (e.g. a target network's
/// parameters) is a constant. `loss_fn` returns the scalar loss together with
/// auxiliary outputs of the same forward pass, which are passed through.
///
/// Parameters the loss does not depend on get zero gradients.
///
/// # Panics
///
/// Panics if the loss is not a scalar.
pub fn grad_with_aux<A, F>(params: &Params, loss_fn: F) -> Result<(Params, A)>
where
    F: FnOnce(&Params) -> Result<(Tensor, A)>,
{
    let vars = params.to_vars()?;
    let tracked = Params::from(&vars);
    let (loss, aux) = loss_fn(&tracked)?;
    assert_eq!(loss.rank(), 0, "loss must be a scalar, got shape {:?}", loss.dims());

    trace!("backward()");
    let store = loss.backward()?;
    let grads = tracked.map(|_, t| match store.get(t) {
        Some(g) => Ok(g.clone()),
        None => Ok(t.zeros_like()?),
    })?;

    Ok((grads, aux))
}
