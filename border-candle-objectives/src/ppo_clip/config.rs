//! Configuration of [`PpoClip`](super::PpoClip).
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`PpoClip`](super::PpoClip).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoClipConfig {
    /// Clip radius of the probability ratio.
    pub epsilon: f64,
}

impl Default for PpoClipConfig {
    fn default() -> Self {
        Self { epsilon: 0.2 }
    }
}

impl PpoClipConfig {
    /// Sets the clip radius.
    pub fn epsilon(mut self, v: f64) -> Self {
        self.epsilon = v;
        self
    }

    /// Constructs [`PpoClipConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load PPO-clip config from {:?}", path.as_ref());
        Ok(b)
    }

    /// Saves [`PpoClipConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save PPO-clip config to {:?}", path.as_ref());
        Ok(())
    }
}
