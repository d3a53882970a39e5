//! Named diagnostics returned by objectives.
//!
//! Every update returns a [`Record`] whose keys are namespaced by the name of the
//! component that produced them, e.g. `PpoClip/loss` or `QLearning/rmse_targ`.
//! Values are diagnostics only; nothing in an update reads them back.
//!
//! ```rust
//! use border_objectives_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("QLearning/loss", 0.25);
//! record.insert("QLearning/bias", RecordValue::Scalar(-0.1));
//! assert_eq!(record.get_scalar("QLearning/loss").unwrap(), 0.25);
//! ```
mod base;

pub use base::{Record, RecordValue};
