//! Regression losses used to fit value functions to bootstrapped targets.
//!
//! Every loss takes the target first and the prediction second and reduces to
//! a scalar by taking the mean over the batch.
use candle_core::{Result, Tensor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A scalar-valued loss `(y_true, y_pred) -> L`.
pub type LossFn = Arc<dyn Fn(&Tensor, &Tensor) -> Result<Tensor> + Send + Sync>;

/// Huber loss with threshold `delta`.
///
/// Quadratic for residuals smaller than `delta`, linear beyond. With
/// `delta = 1` this is the smooth L1 loss.
pub fn huber(y_true: &Tensor, y_pred: &Tensor, delta: f64) -> Result<Tensor> {
    let err = (y_pred - y_true)?.abs()?;
    let err_clipped = err.minimum(delta)?;
    let quadratic = err_clipped.sqr()?.affine(0.5, 0.0)?;
    let linear = (err - &err_clipped)?.affine(delta, 0.0)?;
    (quadratic + linear)?.mean_all()
}

/// Mean squared error.
pub fn mse(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    candle_nn::loss::mse(y_pred, y_true)
}

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Huber loss.
    Huber {
        /// Threshold between the quadratic and the linear regime.
        delta: f64,
    },
}

impl Default for CriticLoss {
    fn default() -> Self {
        Self::Huber { delta: 1.0 }
    }
}

impl CriticLoss {
    /// Rejects a non-positive Huber threshold.
    pub fn check(&self) -> anyhow::Result<()> {
        match self {
            Self::Mse => Ok(()),
            Self::Huber { delta } => super::check_positive("delta", *delta),
        }
    }

    /// Returns the loss as a closure.
    pub fn loss_fn(&self) -> LossFn {
        match self {
            Self::Mse => Arc::new(mse),
            Self::Huber { delta } => {
                let delta = *delta;
                Arc::new(move |y_true: &Tensor, y_pred: &Tensor| huber(y_true, y_pred, delta))
            }
        }
    }
}
