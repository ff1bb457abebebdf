//! A model is a square system of equations in the current, lagged and expected future
//! values of its endogenous variables, driven by exogenous shocks.
//!
//! Models are defined either in code with a [`ModelBuilder`] or declaratively with a
//! [`ModelDefinition`] (which can be read from TOML). Building parses and validates
//! every equation once; a model that builds is structurally sound.
//!
//! The [`Model`] then runs the solution pipeline on demand:
//! steady state, linearisation, rational-expectations solution,
//! and from the solution impulse responses, simulations and moments.
//! Each stage is cached on the model.

mod builder;
mod definition;
mod runtime;
mod validation;

#[cfg(test)]
mod tests;

// Public re-exports
pub use builder::ModelBuilder;
pub use definition::{ModelDefinition, ShockCovariance};
pub use runtime::Model;
