//! Ready-made DSGE models.
//!
//! Each module provides a parameter struct with sensible defaults, a
//! [`ModelDefinition`](dsge_core::model::ModelDefinition) built from it and the
//! closed-form steady state, so the numerical steady state can be checked.

pub mod ar1;
pub mod new_keynesian;
#[cfg(feature = "python")]
pub mod python;
pub mod rbc;
