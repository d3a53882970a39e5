use super::MlpConfig;
use crate::util::NamedTensors;
use anyhow::Result;
use border_objectives_core::{PrngKey, PrngSequence};
use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder, VarMap};
use rand::Rng;

/// Multilayer perceptron with ReLU activation function.
///
/// The network owns no variables. Its weights are read from a [`NamedTensors`]
/// under `{prefix}.ln{i}.weight` and `{prefix}.ln{i}.bias`, so the same network
/// can be evaluated with the parameters of a main and a target network.
#[derive(Clone, Debug)]
pub struct Mlp {
    prefix: String,
    config: MlpConfig,
}

fn dropout(xs: &Tensor, p: f64, key: PrngKey) -> Result<Tensor> {
    let mut rng = key.rng();
    let scale = (1.0 / (1.0 - p)) as f32;
    let mask = (0..xs.elem_count())
        .map(|_| if rng.gen::<f64>() < p { 0.0 } else { scale })
        .collect::<Vec<f32>>();
    let mask = Tensor::from_vec(mask, xs.dims(), xs.device())?.to_dtype(xs.dtype())?;
    Ok(xs.mul(&mask)?)
}

impl Mlp {
    /// Creates an MLP whose variables live under `prefix`.
    pub fn new(prefix: impl Into<String>, config: MlpConfig) -> Self {
        Self {
            prefix: prefix.into(),
            config,
        }
    }

    /// Configuration of the network.
    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    fn var_names(&self, i: usize) -> (String, String) {
        (
            format!("{}.ln{}.weight", self.prefix, i),
            format!("{}.ln{}.bias", self.prefix, i),
        )
    }

    /// Draws initial parameters from `U(-1/sqrt(in_dim), 1/sqrt(in_dim))`.
    pub fn init(&self, key: PrngKey, device: &Device) -> Result<NamedTensors> {
        let mut rng = key.rng();
        let mut params = NamedTensors::empty();

        for (i, (in_dim, out_dim)) in self.config.layer_dims().into_iter().enumerate() {
            let bound = 1.0 / (in_dim as f32).sqrt();
            let w = (0..in_dim * out_dim)
                .map(|_| rng.gen_range(-bound..bound))
                .collect::<Vec<f32>>();
            let b = (0..out_dim)
                .map(|_| rng.gen_range(-bound..bound))
                .collect::<Vec<f32>>();
            let (name_w, name_b) = self.var_names(i);
            params.insert(name_w, Tensor::from_vec(w, (out_dim, in_dim), device)?);
            params.insert(name_b, Tensor::from_vec(b, (out_dim,), device)?);
        }

        Ok(params)
    }

    /// Creates the variables of the network in a [`VarMap`] with the default
    /// initializer of [`candle_nn::linear`] and returns a copy of them.
    pub fn init_varmap(&self, varmap: &VarMap, device: &Device) -> Result<NamedTensors> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device).pp(&self.prefix);
        for (i, (in_dim, out_dim)) in self.config.layer_dims().into_iter().enumerate() {
            linear(in_dim, out_dim, vb.pp(format!("ln{}", i)))?;
        }
        NamedTensors::copy_from(varmap)
    }

    /// Forward pass.
    ///
    /// `rng` drives dropout masks and is ignored unless `is_training` is `true`.
    pub fn forward(
        &self,
        params: &NamedTensors,
        rng: PrngKey,
        xs: &Tensor,
        is_training: bool,
    ) -> Result<Tensor> {
        let layer_dims = self.config.layer_dims();
        let n_layers = layer_dims.len();
        let mut rngs = PrngSequence::new(rng);
        let mut xs = xs.clone();

        for i in 0..n_layers {
            let (name_w, name_b) = self.var_names(i);
            let layer = Linear::new(params.get(&name_w)?.clone(), Some(params.get(&name_b)?.clone()));
            xs = layer.forward(&xs)?;

            if i < n_layers - 1 {
                xs = xs.relu()?;
                if is_training && self.config.dropout > 0.0 {
                    xs = dropout(&xs, self.config.dropout, rngs.next_key())?;
                }
            }
        }

        match self.config.activation_out {
            false => Ok(xs),
            true => Ok(xs.relu()?),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn obs() -> Result<Tensor> {
        Ok(Tensor::from_slice(
            &[0.1f32, -0.2, 0.3, 0.4, 0.5, -0.6],
            (2, 3),
            &Device::Cpu,
        )?)
    }

    #[test]
    fn test_init_is_reproducible() -> Result<()> {
        let mlp = Mlp::new("mlp", MlpConfig::new(3, vec![8], 2, false));
        let p1 = mlp.init(PrngKey(42), &Device::Cpu)?;
        let p2 = mlp.init(PrngKey(42), &Device::Cpu)?;

        assert_eq!(p1.len(), 4);
        for ((k1, t1), (k2, t2)) in p1.iter().zip(p2.iter()) {
            assert_eq!(k1, k2);
            assert_eq!(
                t1.flatten_all()?.to_vec1::<f32>()?,
                t2.flatten_all()?.to_vec1::<f32>()?
            );
        }
        Ok(())
    }

    #[test]
    fn test_forward_shape() -> Result<()> {
        let mlp = Mlp::new("q", MlpConfig::new(3, vec![16, 16], 4, false));
        let params = mlp.init(PrngKey(0), &Device::Cpu)?;
        let ys = mlp.forward(&params, PrngKey(1), &obs()?, false)?;
        assert_eq!(ys.dims(), [2, 4]);
        Ok(())
    }

    #[test]
    fn test_varmap_names_match() -> Result<()> {
        let mlp = Mlp::new("pi", MlpConfig::new(3, vec![8], 2, false));
        let varmap = VarMap::new();
        let params = mlp.init_varmap(&varmap, &Device::Cpu)?;

        assert!(params.get("pi.ln0.weight").is_ok());
        assert!(params.get("pi.ln1.bias").is_ok());
        let ys = mlp.forward(&params, PrngKey(0), &obs()?, false)?;
        assert_eq!(ys.dims(), [2, 2]);
        Ok(())
    }

    #[test]
    fn test_dropout_only_in_training() -> Result<()> {
        let config = MlpConfig::new(3, vec![64], 2, false).dropout(0.5);
        let mlp = Mlp::new("mlp", config);
        let params = mlp.init(PrngKey(3), &Device::Cpu)?;
        let xs = obs()?;

        let eval1 = mlp.forward(&params, PrngKey(1), &xs, false)?;
        let eval2 = mlp.forward(&params, PrngKey(2), &xs, false)?;
        assert_eq!(
            eval1.flatten_all()?.to_vec1::<f32>()?,
            eval2.flatten_all()?.to_vec1::<f32>()?
        );

        let train1 = mlp.forward(&params, PrngKey(1), &xs, true)?;
        let train1_ = mlp.forward(&params, PrngKey(1), &xs, true)?;
        let train2 = mlp.forward(&params, PrngKey(2), &xs, true)?;
        assert_eq!(
            train1.flatten_all()?.to_vec1::<f32>()?,
            train1_.flatten_all()?.to_vec1::<f32>()?
        );
        assert_ne!(
            train1.flatten_all()?.to_vec1::<f32>()?,
            train2.flatten_all()?.to_vec1::<f32>()?
        );
        Ok(())
    }
}
