//! Transforms that rescale returns before they are regressed on.
use candle_core::{Result, Tensor};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

type TensorFn = Arc<dyn Fn(&Tensor) -> Result<Tensor> + Send + Sync>;

/// A pair of mutually inverse functions `(f, f⁻¹)`.
///
/// Bootstrapped targets are built as `f(Rn + In · f⁻¹(q))`, so `q` lives in the
/// transformed space while rewards are summed in the original one.
#[derive(Clone)]
pub struct ValueTransform {
    transform_func: TensorFn,
    inverse_func: TensorFn,
}

impl fmt::Debug for ValueTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueTransform")
    }
}

impl Default for ValueTransform {
    fn default() -> Self {
        Self::identity()
    }
}

fn sign(x: &Tensor) -> Result<Tensor> {
    x.ge(0.0)?.to_dtype(x.dtype())?.affine(2.0, -1.0)
}

impl ValueTransform {
    /// Builds a transform from a function and its inverse.
    pub fn new<F, G>(transform_func: F, inverse_func: G) -> Self
    where
        F: Fn(&Tensor) -> Result<Tensor> + Send + Sync + 'static,
        G: Fn(&Tensor) -> Result<Tensor> + Send + Sync + 'static,
    {
        Self {
            transform_func: Arc::new(transform_func),
            inverse_func: Arc::new(inverse_func),
        }
    }

    /// The identity pair.
    pub fn identity() -> Self {
        Self::new(|x: &Tensor| Ok(x.clone()), |x: &Tensor| Ok(x.clone()))
    }

    /// Logarithmic squashing of large magnitudes.
    ///
    /// `f(x) = sign(x) · scale · ln(1 + |x| / scale)`.
    pub fn log_transform(scale: f64) -> Self {
        Self::new(
            move |x: &Tensor| {
                let y = x.abs()?.affine(1.0 / scale, 1.0)?.log()?.affine(scale, 0.0)?;
                y * sign(x)?
            },
            move |y: &Tensor| {
                let x = y.abs()?.affine(1.0 / scale, 0.0)?.exp()?.affine(scale, -scale)?;
                x * sign(y)?
            },
        )
    }

    /// Applies `f`.
    pub fn transform(&self, x: &Tensor) -> Result<Tensor> {
        (self.transform_func)(x)
    }

    /// Applies `f⁻¹`.
    pub fn inverse(&self, y: &Tensor) -> Result<Tensor> {
        (self.inverse_func)(y)
    }
}

/// Serializable choice of a built-in [`ValueTransform`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub enum ValueTransformConfig {
    /// No rescaling.
    #[default]
    Identity,

    /// See [`ValueTransform::log_transform`].
    Log {
        /// Magnitude below which the transform is close to linear.
        scale: f64,
    },
}

impl ValueTransformConfig {
    /// Rejects a non-positive scale of the log transform.
    pub fn check(&self) -> anyhow::Result<()> {
        match self {
            Self::Identity => Ok(()),
            Self::Log { scale } => super::check_positive("scale", *scale),
        }
    }
}

impl From<&ValueTransformConfig> for ValueTransform {
    fn from(config: &ValueTransformConfig) -> Self {
        match config {
            ValueTransformConfig::Identity => ValueTransform::identity(),
            ValueTransformConfig::Log { scale } => ValueTransform::log_transform(*scale),
        }
    }
}
