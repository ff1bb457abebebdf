//! Python extension module `dsge._lib`.
//!
//! The solver itself lives in `dsge-core`; ready-made models in `dsge-models`.

pub use dsge_core;
pub use dsge_models;

mod python;
