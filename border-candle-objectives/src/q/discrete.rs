use crate::{
    mlp::{Mlp, MlpConfig},
    model::{FuncState, Params, QFunction},
    util::OutDim,
};
use anyhow::Result;
use border_objectives_core::PrngKey;
use candle_core::{DType, Device, Tensor, D};

/// Action-value function over `n` discrete actions.
///
/// The MLP maps a state to one value per action. Actions are `u32` or `i64`
/// indices of shape `[batch]`.
#[derive(Clone, Debug)]
pub struct DiscreteQ {
    mlp: Mlp,
    n_actions: usize,
}

impl DiscreteQ {
    /// Builds a q-function whose variables live under `q`.
    pub fn new(config: MlpConfig) -> Self {
        let n_actions = config.get_out_dim();
        Self {
            mlp: Mlp::new("q", config),
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

impl QFunction for DiscreteQ {
    fn action_space_is_discrete(&self) -> bool {
        true
    }

    fn apply_type1(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        s: &Tensor,
        a: &Tensor,
        is_training: bool,
    ) -> Result<(Tensor, FuncState)> {
        let (q_s, state_new) = self.apply_type2(params, state, rng, s, is_training)?;
        let ixs = a.to_dtype(DType::U32)?.unsqueeze(D::Minus1)?.contiguous()?;
        let q_sa = q_s.gather(&ixs, D::Minus1)?.squeeze(D::Minus1)?;
        Ok((q_sa, state_new))
    }

    fn apply_type2(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        s: &Tensor,
        is_training: bool,
    ) -> Result<(Tensor, FuncState)> {
        let q_s = self.mlp.forward(params, rng, s, is_training)?;
        debug_assert_eq!(q_s.dims()[1], self.n_actions);
        Ok((q_s, state.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_type1_selects_recorded_action() -> Result<()> {
        let q = DiscreteQ::new(MlpConfig::new(2, vec![8], 3, false));
        let params = q.init(PrngKey(5), &Device::Cpu)?;
        let state = FuncState::empty();
        let s = Tensor::from_slice(&[0.5f32, -1.0, 2.0, 0.0], (2, 2), &Device::Cpu)?;
        let a = Tensor::from_slice(&[2i64, 0], (2,), &Device::Cpu)?;

        let (q_s, _) = q.apply_type2(&params, &state, PrngKey(0), &s, false)?;
        let (q_sa, _) = q.apply_type1(&params, &state, PrngKey(0), &s, &a, false)?;
        let q_s = q_s.to_vec2::<f32>()?;
        let q_sa = q_sa.to_vec1::<f32>()?;

        assert_eq!(q_sa, vec![q_s[0][2], q_s[1][0]]);
        Ok(())
    }
}
