//! Utilities.
mod named_tensors;
mod quantiles;
pub mod value_losses;
mod value_transform;
use anyhow::Result;
use border_objectives_core::ObjectiveError;
use candle_core::{DType, Tensor};
pub use named_tensors::NamedTensors;
pub use quantiles::get_magnitude_quantiles;
pub use value_losses::{CriticLoss, LossFn};
pub use value_transform::{ValueTransform, ValueTransformConfig};

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> usize;
}

/// Reads a rank-0 tensor as `f32`.
pub fn scalar(t: &Tensor) -> Result<f32> {
    Ok(t.to_dtype(DType::F32)?.to_scalar::<f32>()?)
}

/// Fails with [`ObjectiveError::InvalidHyperparameter`] unless `value > 0`.
///
/// NaN is rejected.
pub fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ObjectiveError::InvalidHyperparameter {
            name: name.to_string(),
            reason: format!("must be positive, got {}", value),
        }
        .into())
    }
}

/// Root mean square of all elements.
pub fn rms(t: &Tensor) -> Result<Tensor> {
    Ok(t.sqr()?.mean_all()?.sqrt()?)
}
