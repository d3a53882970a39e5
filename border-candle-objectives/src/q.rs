//! Action-value functions.
mod continuous;
mod discrete;
pub use continuous::ContinuousQ;
pub use discrete::DiscreteQ;
