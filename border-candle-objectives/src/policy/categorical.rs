use crate::{
    mlp::{Mlp, MlpConfig},
    model::{FuncApprox, FuncState, Params, StochasticPolicy},
    util::OutDim,
};
use anyhow::Result;
use border_objectives_core::PrngKey;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::ops::{log_softmax, softmax};

/// Categorical policy over `n` discrete actions, parametrized by logits from an MLP.
///
/// Actions are `u32` or `i64` indices of shape `[batch]`.
#[derive(Clone, Debug)]
pub struct CategoricalPolicy {
    mlp: Mlp,
    n_actions: usize,
}

impl CategoricalPolicy {
    /// Builds a policy whose variables live under `pi`.
    ///
    /// The output dimension of `config` is the number of actions.
    pub fn new(config: MlpConfig) -> Self {
        let n_actions = config.get_out_dim();
        Self {
            mlp: Mlp::new("pi", config),
            n_actions,
        }
    }

    /// Number of actions.
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Draws initial parameters.
    pub fn init(&self, key: PrngKey, device: &Device) -> Result<Params> {
        self.mlp.init(key, device)
    }
}

impl FuncApprox for CategoricalPolicy {
    type Output = Tensor;

    fn apply(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        s: &Tensor,
        is_training: bool,
    ) -> Result<(Tensor, FuncState)> {
        let logits = self.mlp.forward(params, rng, s, is_training)?;
        Ok((logits, state.clone()))
    }
}

impl StochasticPolicy for CategoricalPolicy {
    fn action_space_is_discrete(&self) -> bool {
        true
    }

    /// One-hot encoding with shape `[batch, n_actions]`.
    fn action_preprocessor(&self, _params: &Params, _rng: PrngKey, a: &Tensor) -> Result<Tensor> {
        let a = a.to_dtype(DType::U32)?.unsqueeze(1)?;
        let ixs = Tensor::arange(0u32, self.n_actions as u32, a.device())?.unsqueeze(0)?;
        Ok(a.broadcast_eq(&ixs)?.to_dtype(DType::F32)?)
    }

    fn log_proba(&self, logits: &Tensor, x_a: &Tensor) -> Result<Tensor> {
        let logp = log_softmax(logits, D::Minus1)?;
        Ok((logp * x_a)?.sum(D::Minus1)?)
    }

    fn entropy(&self, logits: &Tensor) -> Result<Tensor> {
        let p = softmax(logits, D::Minus1)?;
        let logp = log_softmax(logits, D::Minus1)?;
        Ok((p * logp)?.sum(D::Minus1)?.neg()?)
    }
}
