//! Core engine types: errors, RNG, variables, notifications, configuration.
//!
//! These are the leaf building blocks every other module depends on.

pub mod config;
pub mod error;
pub mod notify;
pub mod number;
pub mod rng;
pub mod variables;

pub use config::EngineConfig;
pub use error::{DefinitionError, EngineError, EvalError, Result, UsageError};
pub use notify::{Notification, NotificationQueue};
pub use number::PersistedNumber;
pub use rng::{draw, gate, weighted_sample, GameRng, RandomSource, RngSnapshot, SequenceRng};
pub use variables::{valid_bounds, PersistedVariable, Variable, VariableStore};
