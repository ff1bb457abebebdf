//! Deterministic steady state.
//!
//! At the steady state every variable takes the same value in every period and
//! all shocks are zero. Collapsing `x(-1)`, `x` and `x(+1)` onto a single unknown
//! per variable gives a square nonlinear system `F(x) = 0`, solved with Newton's method
//!
//! $$ x_{k+1} = x_k - J(x_k)^{-1} F(x_k) $$
//!
//! where $J$ is the Jacobian of the collapsed system, obtained by summing the
//! symbolic derivatives over the three timings of each variable.
//!
//! Newton's method is local: if several steady states exist the one returned is
//! the one whose basin of attraction contains the initial guess. The solver never
//! retries on its own; callers can retry from another guess.

use crate::errors::{DSGEResult, SteadyStateError};
use crate::model::Model;
use crate::options::NewtonOptions;
use crate::utils::linear_algebra::checked_lu;
use crate::FloatValue;
use log::{debug, info};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Steady-state values of the endogenous variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteadyState {
    variables: Vec<String>,
    values: Vec<FloatValue>,
    residual_norm: FloatValue,
    iterations: usize,
}

impl SteadyState {
    pub(crate) fn new(
        variables: Vec<String>,
        values: Vec<FloatValue>,
        residual_norm: FloatValue,
        iterations: usize,
    ) -> Self {
        Self {
            variables,
            values,
            residual_norm,
            iterations,
        }
    }

    /// Values in model variable order.
    pub fn values(&self) -> &[FloatValue] {
        &self.values
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Value of a single variable, if it exists.
    pub fn get(&self, name: &str) -> Option<FloatValue> {
        self.variables
            .iter()
            .position(|v| v == name)
            .map(|i| self.values[i])
    }

    /// Norm of the static residuals at the reported values.
    pub fn residual_norm(&self) -> FloatValue {
        self.residual_norm
    }

    /// Number of Newton steps taken. Zero when the values were supplied directly.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FloatValue)> {
        self.variables
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Converts the steady state into an equivalent hashmap
    pub fn to_hashmap(&self) -> HashMap<String, FloatValue> {
        self.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

/// Solve for the steady state starting from `initial_guess` (in model variable order).
pub fn solve_steady_state(
    model: &Model,
    initial_guess: &[FloatValue],
    options: &NewtonOptions,
) -> DSGEResult<SteadyState> {
    let n = model.n_variables();
    if initial_guess.len() != n {
        return Err(SteadyStateError::InitialGuessLength {
            expected: n,
            got: initial_guess.len(),
        }
        .into());
    }

    let mut x = DVector::from_column_slice(initial_guess);
    let mut residual_norm = FloatValue::INFINITY;

    for iteration in 0..=options.max_iterations {
        let residuals = DVector::from_vec(model.residuals(x.as_slice()));
        if residuals.iter().any(|r| !r.is_finite()) {
            return Err(SteadyStateError::NonFinite {
                iteration,
                iterate: x.as_slice().to_vec(),
            }
            .into());
        }

        residual_norm = residuals.norm();
        debug!(
            "Newton iteration {}: residual norm {:e}",
            iteration, residual_norm
        );

        if residual_norm < options.tolerance {
            info!(
                "Steady state found after {} iteration(s), residual norm {:e}",
                iteration, residual_norm
            );
            return Ok(SteadyState {
                variables: model.variables().to_vec(),
                values: x.as_slice().to_vec(),
                residual_norm,
                iterations: iteration,
            });
        }

        if iteration == options.max_iterations {
            break;
        }

        let jacobian = model.static_jacobian(x.as_slice());
        if jacobian.iter().any(|j| !j.is_finite()) {
            return Err(SteadyStateError::NonFinite {
                iteration,
                iterate: x.as_slice().to_vec(),
            }
            .into());
        }

        let step = checked_lu(jacobian)
            .and_then(|lu| lu.solve(&residuals))
            .ok_or_else(|| SteadyStateError::SingularJacobian {
                iteration,
                iterate: x.as_slice().to_vec(),
                residual_norm,
            })?;

        x -= step;
    }

    Err(SteadyStateError::NotConverged {
        iterations: options.max_iterations,
        iterate: x.as_slice().to_vec(),
        residual_norm,
    }
    .into())
}

/// Accept a steady state computed elsewhere (for example in closed form),
/// after checking that it solves the static model within `tolerance`.
pub fn verify_steady_state(
    model: &Model,
    values: &[FloatValue],
    tolerance: FloatValue,
) -> DSGEResult<SteadyState> {
    let n = model.n_variables();
    if values.len() != n {
        return Err(SteadyStateError::InitialGuessLength {
            expected: n,
            got: values.len(),
        }
        .into());
    }

    let residuals = model.residuals(values);
    let residual_norm = residuals.iter().map(|r| r * r).sum::<FloatValue>().sqrt();
    if !(residual_norm < tolerance) {
        return Err(SteadyStateError::NotASteadyState {
            residuals,
            residual_norm,
        }
        .into());
    }

    Ok(SteadyState {
        variables: model.variables().to_vec(),
        values: values.to_vec(),
        residual_norm,
        iterations: 0,
    })
}
