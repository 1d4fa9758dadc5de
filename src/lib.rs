/// Block Lift simulation core.
///
/// `domain` holds the pure data model and terrain rules, `sim` the engine
/// that mutates it and talks to collaborators through events and the
/// level loader/saver traits.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;

pub use error::{EngineError, InvariantViolation, LoadError, SaveError};
pub use sim::lifecycle::Engine;
