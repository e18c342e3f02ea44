//! Alert decision engine for barometric pressure drops.
//!
//! One call to [`engine::DecisionEngine::decide`] is one decision cycle:
//! the pressure delta is evaluated first, then the quiet-hours window,
//! then the cooldown since the last actual send. The engine never touches
//! storage itself; it returns the memory the caller must persist.

pub mod cooldown;
pub mod delta;
pub mod engine;
pub mod error;
pub mod window;

#[cfg(test)]
mod tests;

pub use engine::{AlertPolicy, DecisionEngine, DecisionOutcome};
pub use error::{AlertError, Result};
