//! Configuration of [`QLearning`](super::QLearning).
use crate::util::{CriticLoss, ValueTransformConfig};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`QLearning`](super::QLearning).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct QLearningConfig {
    /// Regression loss between targets and predictions.
    #[serde(default)]
    pub critic_loss: CriticLoss,

    /// Transform applied around the bootstrapped value.
    #[serde(default)]
    pub value_transform: ValueTransformConfig,
}

impl QLearningConfig {
    /// Sets the critic loss.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Sets the value transform.
    pub fn value_transform(mut self, v: ValueTransformConfig) -> Self {
        self.value_transform = v;
        self
    }

    /// Validates the loss and transform settings.
    pub fn check(&self) -> Result<()> {
        self.critic_loss.check()?;
        self.value_transform.check()
    }

    /// Constructs [`QLearningConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load Q-learning config from {:?}", path.as_ref());
        Ok(b)
    }

    /// Saves [`QLearningConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save Q-learning config to {:?}", path.as_ref());
        Ok(())
    }
}
