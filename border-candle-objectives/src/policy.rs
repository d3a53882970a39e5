//! Stochastic policies.
mod categorical;
pub use categorical::CategoricalPolicy;
