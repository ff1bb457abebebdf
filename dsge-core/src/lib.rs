//! Solver for dynamic stochastic general equilibrium (DSGE) models.
//!
//! A model is declared as named variables, shocks and parameters plus equations
//! written as text, e.g. `"k = (1-delta)*k(-1) + i"`. The pipeline is
//!
//! 1. [`model::ModelBuilder::build`] parses and validates the equations and
//!    differentiates them symbolically,
//! 2. [`model::Model::steady_state`] finds the deterministic steady state by Newton's method,
//! 3. [`model::Model::linearize`] produces $A\,E_t[y_{t+1}] + B\,y_t + C\,y_{t-1} + D\,\varepsilon_t = 0$,
//! 4. [`model::Model::solve`] applies the Blanchard-Kahn conditions and returns the policy
//!    function $y_t = P\,y_{t-1} + Q\,\varepsilon_t$,
//! 5. impulse responses, simulations and theoretical moments are computed from the policy.
//!
//! ```
//! use dsge_core::model::ModelBuilder;
//!
//! let mut model = ModelBuilder::new()
//!     .with_variables(["x"])
//!     .with_shocks(["e"])
//!     .with_parameter("rho", 0.9)
//!     .with_equation("x = rho*x(-1) + e")
//!     .build()
//!     .unwrap();
//!
//! let policy = model.policy().unwrap();
//! assert!((policy.transition()[(0, 0)] - 0.9).abs() < 1e-10);
//! ```

pub mod errors;
pub mod linearize;
pub mod model;
pub mod moments;
pub mod options;
#[cfg(feature = "python")]
pub mod python;
pub mod simulate;
pub mod solver;
pub mod steady_state;
pub mod symbolic;
pub mod utils;

/// Floating point type used throughout.
pub type FloatValue = f64;
