use super::QLearningConfig;
use crate::{
    autodiff::grad_with_aux,
    base::{Objective, TransitionBatch},
    model::{FuncState, Params, QFunction},
    util::{get_magnitude_quantiles, rms, scalar, CriticLoss, LossFn, ValueTransform},
};
use anyhow::Result;
use border_objectives_core::{record::Record, Hyperparams, ObjectiveError, PrngKey, PrngSequence};
use candle_core::{Tensor, D};
use log::{debug, trace};

/// Outputs of the forward pass carried alongside the loss.
struct LossAux {
    loss: Tensor,
    g: Tensor,
    q: Tensor,
    state_new: FuncState,
}

/// n-step Q-learning.
///
/// ```text
/// G = f(Rn + In · f⁻¹(max_a q_targ(S_next, a)))
/// L = loss(G, q(S, A))
/// ```
///
/// `In` is the discount accumulated over the n steps, zero on episode
/// termination. `f` is the configured value transform. The target is evaluated
/// with `q_targ` if one is given and with `q` otherwise, in both cases under
/// the separately supplied target parameters, and never differentiated.
pub struct QLearning<Q: QFunction> {
    q: Q,
    q_targ: Option<Q>,
    loss_function: LossFn,
    value_transform: ValueTransform,
}

fn require_discrete<Q: QFunction>(q: &Q) -> Result<()> {
    if q.action_space_is_discrete() {
        Ok(())
    } else {
        Err(ObjectiveError::DiscreteActionRequired("QLearning".to_string()).into())
    }
}

impl<Q: QFunction> QLearning<Q> {
    /// Constructs the objective from a configuration.
    ///
    /// Fails on a non-positive Huber threshold or log-transform scale.
    pub fn build(q: Q, q_targ: Option<Q>, config: QLearningConfig) -> Result<Self> {
        config.check()?;
        Self::new(
            q,
            q_targ,
            Some(config.critic_loss.loss_fn()),
            Some(ValueTransform::from(&config.value_transform)),
        )
    }

    /// Constructs the objective.
    ///
    /// Defaults to the Huber loss and the identity transform. Fails if either
    /// q-function is defined over a continuous action space.
    pub fn new(
        q: Q,
        q_targ: Option<Q>,
        loss_function: Option<LossFn>,
        value_transform: Option<ValueTransform>,
    ) -> Result<Self> {
        require_discrete(&q)?;
        if let Some(q_targ) = &q_targ {
            require_discrete(q_targ)?;
        }

        Ok(Self {
            q,
            q_targ,
            loss_function: loss_function.unwrap_or_else(|| CriticLoss::default().loss_fn()),
            value_transform: value_transform.unwrap_or_default(),
        })
    }

    /// The q-function being optimized.
    pub fn q(&self) -> &Q {
        &self.q
    }

    fn q_targ(&self) -> &Q {
        self.q_targ.as_ref().unwrap_or(&self.q)
    }

    /// Bootstrapped n-step target `G`, one per transition.
    pub fn target(
        &self,
        target_params: &Params,
        state: &FuncState,
        rng: PrngKey,
        transition_batch: &TransitionBatch,
    ) -> Result<Tensor> {
        let (q_s_next, _) =
            self.q_targ()
                .apply_type2(target_params, state, rng, transition_batch.s_next(), false)?;
        assert_eq!(
            q_s_next.rank(),
            2,
            "q_targ(S_next) must have shape [batch, n_actions], got {:?}",
            q_s_next.dims()
        );
        let f_inv_q = self
            .value_transform
            .inverse(&q_s_next.max(D::Minus1)?.detach())?;

        // terminal transitions drop the bootstrap term even if f⁻¹(q) is not finite
        let i_n = transition_batch.i_n();
        let bootstrap = i_n
            .ne(0.0)?
            .where_cond(&(i_n * f_inv_q)?, &i_n.zeros_like()?)?;
        let g = (transition_batch.rn() + bootstrap)?;
        Ok(self.value_transform.transform(&g)?)
    }

    fn loss_func(
        &self,
        params: &Params,
        target_params: &Params,
        state: &FuncState,
        rngs: &mut PrngSequence,
        transition_batch: &TransitionBatch,
    ) -> Result<(Tensor, LossAux)> {
        let g = self.target(target_params, state, rngs.next_key(), transition_batch)?;
        let (q, state_new) = self.q.apply_type1(
            params,
            state,
            rngs.next_key(),
            transition_batch.s(),
            transition_batch.a(),
            true,
        )?;
        let loss = (self.loss_function)(&g, &q)?;

        let aux = LossAux {
            loss: loss.detach(),
            g,
            q: q.detach(),
            state_new: state_new.map(|_, t| Ok(t.detach()))?,
        };
        Ok((loss, aux))
    }

    /// TD error `G - q(S, A)` without gradients.
    ///
    /// Uses the same target construction and key sequence as the loss, so
    /// the result matches the residual being regressed on. Typical use is
    /// updating priorities of a replay buffer.
    pub fn td_error(
        &self,
        params: &Params,
        target_params: &Params,
        state: &FuncState,
        rng: PrngKey,
        transition_batch: &TransitionBatch,
    ) -> Result<Tensor> {
        let mut rngs = PrngSequence::new(rng);
        let g = self.target(target_params, state, rngs.next_key(), transition_batch)?;
        let (q, _) = self.q.apply_type1(
            params,
            state,
            rngs.next_key(),
            transition_batch.s(),
            transition_batch.a(),
            false,
        )?;
        Ok((g - q)?)
    }
}

impl<Q: QFunction> Objective for QLearning<Q> {
    /// Parameters of the target network.
    type Extra = Params;

    const NAME: &'static str = "QLearning";

    const REQUIRES_PROPENSITIES: bool = false;

    fn hyperparams(&self) -> Hyperparams {
        Hyperparams::new()
    }

    fn grads_and_metrics(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        transition_batch: &TransitionBatch,
        target_params: &Params,
    ) -> Result<(Params, FuncState, Record)> {
        trace!("QLearning::grads_and_metrics()");
        self.check_batch(transition_batch)?;

        let mut rngs = PrngSequence::new(rng);
        let (grads, aux) = grad_with_aux(params, |p| {
            self.loss_func(p, target_params, state, &mut rngs, transition_batch)
        })?;

        // divergence between the main and the target network
        let (q_targ, _) = self.q_targ().apply_type1(
            target_params,
            state,
            rngs.next_key(),
            transition_batch.s(),
            transition_batch.a(),
            false,
        )?;
        let err = (&aux.q - &aux.g)?;
        let err_targ = (q_targ - &aux.q)?;

        let name = Self::NAME;
        let mut metrics = Record::empty();
        metrics.insert_scalar(format!("{}/loss", name), scalar(&aux.loss)?);
        metrics.insert_scalar(format!("{}/bias", name), scalar(&err.mean_all()?)?);
        metrics.insert_scalar(format!("{}/rmse", name), scalar(&rms(&err)?)?);
        metrics.insert_scalar(format!("{}/bias_targ", name), scalar(&err_targ.mean_all()?)?);
        metrics.insert_scalar(format!("{}/rmse_targ", name), scalar(&rms(&err_targ)?)?);
        metrics.merge_inplace(get_magnitude_quantiles(&grads, &format!("{}/grads_", name))?);

        debug!(
            "{}: loss = {:?}, rmse = {:?}",
            name,
            metrics.get_scalar(&format!("{}/loss", name)),
            metrics.get_scalar(&format!("{}/rmse", name))
        );

        Ok((grads, aux.state_new, metrics))
    }
}
