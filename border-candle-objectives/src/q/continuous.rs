use crate::{
    mlp::{Mlp, MlpConfig},
    model::{FuncState, Params, QFunction},
};
use anyhow::Result;
use border_objectives_core::{ObjectiveError, PrngKey};
use candle_core::{Device, Tensor, D};

/// Action-value function over continuous actions.
///
/// The MLP takes the concatenation of state and action and outputs a single
/// value, so the input dimension of its config must be `dim_obs + dim_act`.
#[derive(Clone, Debug)]
pub struct ContinuousQ {
    mlp: Mlp,
}

impl ContinuousQ {
    /// Builds a q-function whose variables live under `q`.
    pub fn new(config: MlpConfig) -> Self {
        Self {
            mlp: Mlp::new("q", config),
        }
    }

    /// Draws initial parameters.
    pub fn init(&self, key: PrngKey, device: &Device) -> Result<Params> {
        self.mlp.init(key, device)
    }
}

impl QFunction for ContinuousQ {
    fn action_space_is_discrete(&self) -> bool {
        false
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
        // scalar actions of shape [batch]
        let a = match a.rank() {
            1 => a.unsqueeze(D::Minus1)?,
            _ => a.clone(),
        };
        let xs = Tensor::cat(&[s, &a.to_dtype(s.dtype())?], D::Minus1)?;
        let q_sa = self
            .mlp
            .forward(params, rng, &xs, is_training)?
            .squeeze(D::Minus1)?;
        Ok((q_sa, state.clone()))
    }

    /// Not defined: there is no finite set of actions to enumerate.
    fn apply_type2(
        &self,
        _params: &Params,
        _state: &FuncState,
        _rng: PrngKey,
        _s: &Tensor,
        _is_training: bool,
    ) -> Result<(Tensor, FuncState)> {
        Err(ObjectiveError::DiscreteActionRequired("ContinuousQ::apply_type2".to_string()).into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_type1_shape_and_type2_error() -> Result<()> {
        let q = ContinuousQ::new(MlpConfig::new(3, vec![8], 1, false));
        let params = q.init(PrngKey(0), &Device::Cpu)?;
        let state = FuncState::empty();
        let s = Tensor::from_slice(&[0.5f32, -1.0, 2.0, 0.0], (2, 2), &Device::Cpu)?;
        let a = Tensor::from_slice(&[0.3f32, -0.3], (2, 1), &Device::Cpu)?;

        let (q_sa, _) = q.apply_type1(&params, &state, PrngKey(1), &s, &a, false)?;
        assert_eq!(q_sa.dims(), [2]);

        let err = q
            .apply_type2(&params, &state, PrngKey(1), &s, false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ObjectiveError>(),
            Some(ObjectiveError::DiscreteActionRequired(_))
        ));
        Ok(())
    }
}
