//! Multilayer perceptron evaluated as a pure function of its parameters.
mod base;
mod config;
pub use base::Mlp;
pub use config::MlpConfig;
