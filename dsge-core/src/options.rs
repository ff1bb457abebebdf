//! Numerical settings for the solver pipeline.
//!
//! All option structs deserialize with `#[serde(default)]`, so a partial
//! TOML/JSON table only overrides the values it names.

use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Settings for the Newton iteration used to find the steady state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonOptions {
    /// Convergence threshold on the Euclidean norm of the residual vector.
    /// Default: 1e-8
    pub tolerance: FloatValue,

    /// Maximum number of Newton steps before giving up.
    /// Default: 100
    pub max_iterations: usize,
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 100,
        }
    }
}

/// Settings for classifying generalized eigenvalues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityOptions {
    /// Eigenvalues whose modulus lies within this distance of 1 are reported
    /// as boundary cases. They are classified as stable, so unit roots are kept
    /// in the solution.
    /// Default: 1e-6
    pub boundary_tolerance: FloatValue,
}

impl Default for StabilityOptions {
    fn default() -> Self {
        Self {
            boundary_tolerance: 1e-6,
        }
    }
}

/// Settings for the discrete Lyapunov solver used for theoretical moments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyapunovOptions {
    /// Convergence threshold on the largest absolute change between doubling steps.
    /// Default: 1e-12
    pub tolerance: FloatValue,

    /// Maximum number of doubling steps.
    /// Each step doubles the horizon covered, so 100 is far beyond what a
    /// stationary system needs.
    /// Default: 100
    pub max_iterations: usize,
}

impl Default for LyapunovOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 100,
        }
    }
}

/// All numerical settings used by a [`Model`](crate::model::Model).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub steady_state: NewtonOptions,
    pub stability: StabilityOptions,
    pub lyapunov: LyapunovOptions,
}

/// Settings for stochastic simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// Number of periods returned.
    /// Default: 1000
    pub periods: usize,

    /// Number of initial periods simulated and then discarded.
    /// Default: 100
    pub burn_in: usize,

    /// Seed for the shock generator.
    /// Default: 42
    pub seed: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            periods: 1000,
            burn_in: 100,
            seed: 42,
        }
    }
}
