use crate::util::OutDim;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: usize,
    pub(super) units: Vec<usize>,
    pub(super) out_dim: usize,
    pub(super) activation_out: bool,
    #[serde(default)]
    pub(super) dropout: f64,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `units` - Widths of hidden layers. An empty vector gives a single linear layer.
    /// * `activation_out` - If `true`, ReLU is applied to the output.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize, activation_out: bool) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
            dropout: 0.0,
        }
    }

    /// Sets the dropout probability of hidden activations.
    ///
    /// Dropout is active only when the network is evaluated in training mode.
    pub fn dropout(mut self, p: f64) -> Self {
        self.dropout = p;
        self
    }

    /// Input dimension.
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Constructs [`MlpConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load MLP config from {:?}", path.as_ref());
        Ok(b)
    }

    /// Saves [`MlpConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save MLP config to {:?}", path.as_ref());
        Ok(())
    }

    /// Pairs of `(in_dim, out_dim)` of the linear layers.
    pub(super) fn layer_dims(&self) -> Vec<(usize, usize)> {
        let mut dims = Vec::with_capacity(self.units.len() + 2);
        dims.push(self.in_dim);
        dims.extend(self.units.iter().copied());
        dims.push(self.out_dim);
        dims.windows(2).map(|w| (w[0], w[1])).collect()
    }
}

impl OutDim for MlpConfig {
    fn get_out_dim(&self) -> usize {
        self.out_dim
    }
}
