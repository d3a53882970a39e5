//! n-step Q-learning with a bootstrapped target.
mod base;
mod config;
pub use base::QLearning;
pub use config::QLearningConfig;
