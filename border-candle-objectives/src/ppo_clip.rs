//! PPO-clip policy objective.
mod base;
mod config;
pub use base::{clipped_surrogate, PpoClip};
pub use config::PpoClipConfig;
