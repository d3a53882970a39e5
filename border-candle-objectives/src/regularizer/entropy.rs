use super::PolicyRegularizer;
use crate::{model::StochasticPolicy, util::scalar};
use anyhow::{Context, Result};
use border_objectives_core::{record::Record, Hyperparams};
use candle_core::Tensor;

/// Entropy bonus, expressed as the penalty `-beta · H[π(·|s)]`.
///
/// The coefficient is read from the `beta` hyperparameter on every call so that
/// it can be annealed by the caller.
#[derive(Clone, Debug)]
pub struct EntropyRegularizer<P> {
    pi: P,
    beta: f64,
}

impl<P: StochasticPolicy + Clone> EntropyRegularizer<P> {
    /// Creates a regularizer for `pi` with default coefficient `beta`.
    pub fn new(pi: &P, beta: f64) -> Self {
        Self {
            pi: pi.clone(),
            beta,
        }
    }
}

fn beta(hyperparams: &Hyperparams) -> Result<f64> {
    hyperparams
        .get("beta")
        .copied()
        .context("EntropyRegularizer needs hyperparameter beta")
}

impl<P: StochasticPolicy> PolicyRegularizer<P::Output> for EntropyRegularizer<P> {
    fn name(&self) -> &str {
        "EntropyRegularizer"
    }

    fn hyperparams(&self) -> Hyperparams {
        Hyperparams::from([("beta".to_string(), self.beta)])
    }

    fn apply(&self, dist_params: &P::Output, hyperparams: &Hyperparams) -> Result<Tensor> {
        let entropy = self.pi.entropy(dist_params)?;
        Ok(entropy.affine(-beta(hyperparams)?, 0.0)?)
    }

    fn metrics(&self, dist_params: &P::Output, hyperparams: &Hyperparams) -> Result<Record> {
        let entropy = self.pi.entropy(dist_params)?.mean_all()?;
        let mut record = Record::empty();
        record.insert_scalar(format!("{}/beta", self.name()), beta(hyperparams)? as f32);
        record.insert_scalar(format!("{}/entropy", self.name()), scalar(&entropy)?);
        Ok(record)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{mlp::MlpConfig, policy::CategoricalPolicy};
    use candle_core::Device;

    #[test]
    fn test_entropy_penalty_of_uniform_policy() -> Result<()> {
        let pi = CategoricalPolicy::new(MlpConfig::new(2, vec![], 2, false));
        let reg = EntropyRegularizer::new(&pi, 0.1);
        let logits = Tensor::zeros((3, 2), candle_core::DType::F32, &Device::Cpu)?;
        let hparams = reg.hyperparams();

        let penalty = reg.apply(&logits, &hparams)?.to_vec1::<f32>()?;
        assert_eq!(penalty.len(), 3);
        for v in penalty {
            assert!((v + 0.1 * 2f32.ln()).abs() < 1e-6);
        }

        let metrics = reg.metrics(&logits, &hparams)?;
        assert!((metrics.get_scalar("EntropyRegularizer/beta")? - 0.1).abs() < 1e-7);
        assert!((metrics.get_scalar("EntropyRegularizer/entropy")? - 2f32.ln()).abs() < 1e-6);

        // scheduled coefficient overrides the default
        let hparams = Hyperparams::from([("beta".to_string(), 0.0)]);
        let penalty = reg.apply(&logits, &hparams)?.to_vec1::<f32>()?;
        assert_eq!(penalty, vec![0.0; 3]);
        Ok(())
    }
}
