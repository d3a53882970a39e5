use super::PpoClipConfig;
use crate::{
    autodiff::grad_with_aux,
    base::{Objective, TransitionBatch},
    model::{FuncState, Params, StochasticPolicy},
    regularizer::PolicyRegularizer,
    util::{check_positive, get_magnitude_quantiles, scalar},
};
use anyhow::Result;
use border_objectives_core::{record::Record, Hyperparams, PrngKey, PrngSequence};
use candle_core::Tensor;
use log::{debug, trace};

type Regularizer<D> = Box<dyn PolicyRegularizer<D> + Send + Sync>;

/// Outputs of the forward pass carried alongside the loss.
struct LossAux<D> {
    loss: Tensor,
    loss_bare: Tensor,
    dist_params: D,
    log_pi: Tensor,
    state_new: FuncState,
}

/// Clipped ratio `clip(ρ, 1-ε, 1+ε)` and per-transition objective
/// `min(Adv·ρ, Adv·clip(ρ, 1-ε, 1+ε))`.
///
/// The elementwise minimum is a pessimistic bound: for positive advantages the
/// ratio is capped from above, for negative ones from below.
pub fn clipped_surrogate(
    adv: &Tensor,
    ratio: &Tensor,
    epsilon: f64,
) -> candle_core::Result<(Tensor, Tensor)> {
    let ratio_clip = ratio.clamp(1.0 - epsilon, 1.0 + epsilon)?;
    let objective = (adv * ratio)?.minimum(&(adv * &ratio_clip)?)?;
    Ok((ratio_clip, objective))
}

/// PPO-clip policy objective.
///
/// ```text
/// J(θ; s, a) = min(ρ_θ A(s, a), clip(ρ_θ, 1-ε, 1+ε) A(s, a)),   ρ_θ = π_θ(a|s) / π_old(a|s)
/// ```
///
/// The ratio is formed as `exp(log π_θ(a|s) - logP)`, where `logP` is the
/// log-propensity recorded from the behavior policy, so batches must carry it.
pub struct PpoClip<P: StochasticPolicy> {
    pi: P,
    regularizer: Option<Regularizer<P::Output>>,
    epsilon: f64,
}

fn check_epsilon(epsilon: f64) -> Result<()> {
    check_positive("epsilon", epsilon)
}

impl<P: StochasticPolicy> PpoClip<P> {
    /// Constructs the objective for policy `pi`.
    pub fn build(pi: P, config: PpoClipConfig) -> Result<Self> {
        check_epsilon(config.epsilon)?;
        Ok(Self {
            pi,
            regularizer: None,
            epsilon: config.epsilon,
        })
    }

    /// Attaches a regularizer whose penalty is added to the loss.
    pub fn regularizer<R>(mut self, regularizer: R) -> Self
    where
        R: PolicyRegularizer<P::Output> + Send + Sync + 'static,
    {
        self.regularizer = Some(Box::new(regularizer));
        self
    }

    /// Clip radius.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The policy being optimized.
    pub fn pi(&self) -> &P {
        &self.pi
    }

    fn objective_func(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        transition_batch: &TransitionBatch,
        adv: &Tensor,
        epsilon: f64,
    ) -> Result<(Tensor, P::Output, Tensor, FuncState)> {
        let mut rngs = PrngSequence::new(rng);
        let logp = transition_batch.logp()?;

        let (dist_params, state_new) =
            self.pi
                .apply(params, state, rngs.next_key(), transition_batch.s(), true)?;

        let x_a = self
            .pi
            .action_preprocessor(params, rngs.next_key(), transition_batch.a())?;
        let log_pi = self.pi.log_proba(&dist_params, &x_a)?;
        let ratio = (&log_pi - logp)?.exp()?;
        assert_eq!(adv.rank(), 1, "Adv must have shape [batch], got {:?}", adv.dims());
        assert_eq!(ratio.rank(), 1, "ratio must have shape [batch], got {:?}", ratio.dims());

        let (ratio_clip, objective) = clipped_surrogate(adv, &ratio, epsilon)?;
        assert_eq!(ratio_clip.rank(), 1);
        assert_eq!(objective.rank(), 1);

        Ok((objective, dist_params, log_pi, state_new))
    }

    #[allow(clippy::too_many_arguments)]
    fn loss_func(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        transition_batch: &TransitionBatch,
        adv: &Tensor,
        epsilon: f64,
        reg_hparams: &Hyperparams,
    ) -> Result<(Tensor, LossAux<P::Output>)> {
        let (objective, dist_params, log_pi, state_new) =
            self.objective_func(params, state, rng, transition_batch, adv, epsilon)?;

        // objective is maximized, loss is minimized
        let loss_bare = objective.mean_all()?.neg()?;

        let loss = match &self.regularizer {
            None => loss_bare.clone(),
            Some(reg) => {
                let penalty = reg.apply(&dist_params, reg_hparams)?.mean_all()?;
                (&loss_bare + penalty)?
            }
        };

        let aux = LossAux {
            loss: loss.detach(),
            loss_bare: loss_bare.detach(),
            dist_params,
            log_pi: log_pi.detach(),
            state_new: state_new.map(|_, t| Ok(t.detach()))?,
        };
        Ok((loss, aux))
    }

    /// Like [`Objective::grads_and_metrics`] with explicit hyperparameters.
    ///
    /// `reg_hparams` is passed to the regularizer, if any; use it to schedule
    /// e.g. an entropy coefficient.
    #[allow(clippy::too_many_arguments)]
    pub fn grads_and_metrics_with(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        transition_batch: &TransitionBatch,
        adv: &Tensor,
        epsilon: f64,
        reg_hparams: &Hyperparams,
    ) -> Result<(Params, FuncState, Record)> {
        trace!("PpoClip::grads_and_metrics()");
        self.check_batch(transition_batch)?;
        check_epsilon(epsilon)?;

        let (grads, aux) = grad_with_aux(params, |p| {
            self.loss_func(p, state, rng, transition_batch, adv, epsilon, reg_hparams)
        })?;

        let name = Self::NAME;
        let mut metrics = Record::empty();
        metrics.insert_scalar(format!("{}/loss", name), scalar(&aux.loss)?);
        metrics.insert_scalar(format!("{}/loss_bare", name), scalar(&aux.loss_bare)?);

        // sampled KL-divergence of the current policy from the behavior policy
        let logp = transition_batch.logp()?;
        let kl_div_old = (logp.exp()? * (logp - &aux.log_pi)?)?.mean_all()?;
        metrics.insert_scalar(format!("{}/kl_div_old", name), scalar(&kl_div_old)?);

        metrics.merge_inplace(get_magnitude_quantiles(&grads, &format!("{}/grads_", name))?);

        if let Some(reg) = &self.regularizer {
            metrics.merge_inplace(reg.metrics(&aux.dist_params, reg_hparams)?);
        }

        debug!(
            "{}: loss = {:?}, loss_bare = {:?}",
            name,
            metrics.get_scalar(&format!("{}/loss", name)),
            metrics.get_scalar(&format!("{}/loss_bare", name))
        );

        Ok((grads, aux.state_new, metrics))
    }
}

impl<P: StochasticPolicy> Objective for PpoClip<P> {
    /// Advantages, one per transition.
    type Extra = Tensor;

    const NAME: &'static str = "PpoClip";

    const REQUIRES_PROPENSITIES: bool = true;

    fn hyperparams(&self) -> Hyperparams {
        let mut hparams = match &self.regularizer {
            Some(reg) => reg.hyperparams(),
            None => Hyperparams::new(),
        };
        hparams.insert("epsilon".to_string(), self.epsilon);
        hparams
    }

    fn grads_and_metrics(
        &self,
        params: &Params,
        state: &FuncState,
        rng: PrngKey,
        transition_batch: &TransitionBatch,
        adv: &Tensor,
    ) -> Result<(Params, FuncState, Record)> {
        let hparams = self.hyperparams();
        self.grads_and_metrics_with(
            params,
            state,
            rng,
            transition_batch,
            adv,
            self.epsilon,
            &hparams,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        mlp::MlpConfig, policy::CategoricalPolicy, regularizer::EntropyRegularizer,
    };
    use border_objectives_core::ObjectiveError;
    use candle_core::{DType, Device};

    fn t(v: &[f32]) -> Tensor {
        Tensor::from_slice(v, (v.len(),), &Device::Cpu).unwrap()
    }

    /// Single-layer categorical policy over two actions with zero weights,
    /// i.e. the uniform policy.
    fn uniform_policy() -> Result<(CategoricalPolicy, Params)> {
        let pi = CategoricalPolicy::new(MlpConfig::new(2, vec![], 2, false));
        let params = pi.init(PrngKey(0), &Device::Cpu)?.zeros_like()?;
        Ok((pi, params))
    }

    fn batch(logp: Option<Tensor>, n: usize) -> Result<TransitionBatch> {
        let s = Tensor::ones((n, 2), DType::F32, &Device::Cpu)?;
        let a = Tensor::zeros((n,), DType::U32, &Device::Cpu)?;
        let rn = Tensor::zeros((n,), DType::F32, &Device::Cpu)?;
        TransitionBatch::new(s.clone(), a, logp, rn.clone(), rn, s)
    }

    #[test]
    fn test_clip_is_monotone_and_bounded() -> Result<()> {
        let ratio: Vec<f32> = (0..41).map(|i| i as f32 * 0.1).collect();
        let adv = t(&vec![1.0; ratio.len()]);
        for epsilon in [0.05, 0.2, 0.5, 1.0] {
            let (ratio_clip, _) = clipped_surrogate(&adv, &t(&ratio), epsilon)?;
            let ratio_clip = ratio_clip.to_vec1::<f32>()?;
            for w in ratio_clip.windows(2) {
                assert!(w[0] <= w[1]);
            }
            for v in ratio_clip {
                assert!(v >= (1.0 - epsilon) as f32 && v <= (1.0 + epsilon) as f32);
            }
        }
        Ok(())
    }

    #[test]
    fn test_objective_never_exceeds_unclipped() -> Result<()> {
        let epsilon = 0.2;
        let ratio = t(&[0.5, 0.9, 1.0, 1.1, 1.5, 0.5, 0.9, 1.0, 1.1, 1.5]);
        let adv = t(&[1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0, -1.0]);
        let (_, objective) = clipped_surrogate(&adv, &ratio, epsilon)?;
        let bare = (&adv * &ratio)?.to_vec1::<f32>()?;
        let objective = objective.to_vec1::<f32>()?;

        // Adv > 0: clipped only when ratio > 1 + epsilon
        assert_eq!(objective[0..4], bare[0..4]);
        assert!(objective[4] < bare[4]);
        assert!((objective[4] - 1.2).abs() < 1e-6);

        // Adv < 0: clipped only when ratio < 1 - epsilon
        assert!(objective[5] < bare[5]);
        assert!((objective[5] + 0.8).abs() < 1e-6);
        assert_eq!(objective[6..10], bare[6..10]);
        Ok(())
    }

    #[test]
    fn test_rejects_non_positive_epsilon() -> Result<()> {
        let (pi, _) = uniform_policy()?;
        let err = PpoClip::build(pi, PpoClipConfig::default().epsilon(0.0))
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<ObjectiveError>(),
            Some(ObjectiveError::InvalidHyperparameter { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_gradient_of_unclipped_objective() -> Result<()> {
        let (pi, params) = uniform_policy()?;
        let ppo = PpoClip::build(pi, PpoClipConfig::default())?;
        let state = FuncState::empty();

        // logP equal to the current log-probability, so the ratio is one
        let s = t(&[1.0, 2.0]).reshape((1, 2))?;
        let a = Tensor::from_slice(&[0u32], (1,), &Device::Cpu)?;
        let logp = t(&[-(2f32.ln())]);
        let zeros = t(&[0.0]);
        let batch = TransitionBatch::new(s.clone(), a, Some(logp), zeros.clone(), zeros, s)?;
        let adv = t(&[1.0]);

        let (grads, _, metrics) = ppo.grads_and_metrics(&params, &state, PrngKey(0), &batch, &adv)?;

        // loss = -π(a|s)/π_old(a|s); d loss/d logits = -(onehot(a) - π) · ρ = [-0.5, 0.5]
        let gb = grads.get("pi.ln0.bias")?.to_vec1::<f32>()?;
        assert!((gb[0] + 0.5).abs() < 1e-5 && (gb[1] - 0.5).abs() < 1e-5);
        let gw = grads.get("pi.ln0.weight")?.to_vec2::<f32>()?;
        assert!((gw[0][0] + 0.5).abs() < 1e-5 && (gw[0][1] + 1.0).abs() < 1e-5);
        assert!((gw[1][0] - 0.5).abs() < 1e-5 && (gw[1][1] - 1.0).abs() < 1e-5);

        assert!((metrics.get_scalar("PpoClip/loss")? + 1.0).abs() < 1e-5);
        assert!(metrics.get_scalar("PpoClip/kl_div_old")?.abs() < 1e-6);
        assert!((metrics.get_scalar("PpoClip/grads_max")? - 1.0).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_entropy_regularizer_adds_to_loss_only() -> Result<()> {
        let (pi, params) = uniform_policy()?;
        let reg = EntropyRegularizer::new(&pi, 0.5);
        let ppo = PpoClip::build(pi, PpoClipConfig::default())?.regularizer(reg);

        let hparams = ppo.hyperparams();
        assert_eq!(hparams.get("epsilon"), Some(&0.2));
        assert_eq!(hparams.get("beta"), Some(&0.5));

        let batch = batch(Some(t(&[-(2f32.ln()); 3])), 3)?;
        let adv = t(&[1.0, 0.5, -1.0]);
        let (_, _, metrics) =
            ppo.grads_and_metrics(&params, &FuncState::empty(), PrngKey(1), &batch, &adv)?;

        let loss = metrics.get_scalar("PpoClip/loss")?;
        let loss_bare = metrics.get_scalar("PpoClip/loss_bare")?;
        assert!((loss - (loss_bare - 0.5 * 2f32.ln())).abs() < 1e-5);
        assert!((metrics.get_scalar("EntropyRegularizer/entropy")? - 2f32.ln()).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_scheduled_regularizer_coefficient() -> Result<()> {
        let (pi, params) = uniform_policy()?;
        let reg = EntropyRegularizer::new(&pi, 0.5);
        let ppo = PpoClip::build(pi, PpoClipConfig::default())?.regularizer(reg);
        let batch = batch(Some(t(&[-(2f32.ln()); 2])), 2)?;
        let adv = t(&[1.0, -1.0]);
        let hparams = Hyperparams::from([("beta".to_string(), 0.0)]);

        let (_, _, metrics) = ppo.grads_and_metrics_with(
            &params,
            &FuncState::empty(),
            PrngKey(1),
            &batch,
            &adv,
            0.2,
            &hparams,
        )?;
        assert_eq!(
            metrics.get_scalar("PpoClip/loss")?,
            metrics.get_scalar("PpoClip/loss_bare")?
        );
        assert_eq!(metrics.get_scalar("EntropyRegularizer/beta")?, 0.0);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "Adv must have shape [batch]")]
    fn test_rank2_advantages_fail_fast() {
        let (pi, params) = uniform_policy().unwrap();
        let ppo = PpoClip::build(pi, PpoClipConfig::default()).unwrap();
        let batch = batch(Some(t(&[-(2f32.ln()); 2])), 2).unwrap();
        let adv = Tensor::ones((2, 1), DType::F32, &Device::Cpu).unwrap();
        let _ = ppo.grads_and_metrics(&params, &FuncState::empty(), PrngKey(0), &batch, &adv);
    }
}
