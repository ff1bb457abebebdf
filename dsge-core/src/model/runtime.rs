//! Model struct and the solve pipeline.

use crate::errors::{DSGEError, DSGEResult, ModelSpecError};
use crate::linearize::{linearize, LinearSystem};
use crate::moments::{theoretical_moments, Moments};
use crate::options::{SimulationOptions, SolverOptions};
use crate::simulate::{self, Trajectory};
use crate::solver::{solve_linear_re, PolicyFunction, RationalExpectationsSolution};
use crate::steady_state::{solve_steady_state, verify_steady_state, SteadyState};
use crate::symbolic::{EvalPoint, Equation, Symbol};
use crate::FloatValue;
use log::info;
use nalgebra::DMatrix;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::builder::parse_equations;

/// A DSGE model: named variables, shocks and parameters tied together by equations
/// in `y(-1)`, `y` and `y(+1)`.
///
/// The model owns everything derived from its definition. The steady state, the
/// linearised system and the rational-expectations solution are computed on first
/// use and cached, so repeated calls are cheap and return identical results.
/// Replacing the steady state (see [`Model::compute_steady_state`]) discards the
/// linearisation and solution built on the old one.
///
/// Parameters are fixed for the lifetime of a model.
/// Use [`Model::with_updated_parameters`] to get a new model with different values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    variables: Vec<String>,
    shocks: Vec<String>,
    parameters: Vec<(String, FloatValue)>,
    equations: Vec<Equation>,
    /// Default starting point of the steady-state search
    initial_values: Vec<FloatValue>,
    shock_covariance: DMatrix<FloatValue>,
    options: SolverOptions,

    #[serde(skip)]
    steady_state: Option<SteadyState>,
    #[serde(skip)]
    linear_system: Option<LinearSystem>,
    #[serde(skip)]
    solution: Option<RationalExpectationsSolution>,
}

impl Model {
    pub(crate) fn new(
        variables: Vec<String>,
        shocks: Vec<String>,
        parameters: Vec<(String, FloatValue)>,
        equations: Vec<Equation>,
        initial_values: Vec<FloatValue>,
        shock_covariance: DMatrix<FloatValue>,
        options: SolverOptions,
    ) -> Self {
        Self {
            variables,
            shocks,
            parameters,
            equations,
            initial_values,
            shock_covariance,
            options,
            steady_state: None,
            linear_system: None,
            solution: None,
        }
    }

    /// Endogenous variables in model order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn shocks(&self) -> &[String] {
        &self.shocks
    }

    pub fn parameters(&self) -> &[(String, FloatValue)] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<FloatValue> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn initial_values(&self) -> &[FloatValue] {
        &self.initial_values
    }

    pub fn shock_covariance(&self) -> &DMatrix<FloatValue> {
        &self.shock_covariance
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn n_shocks(&self) -> usize {
        self.shocks.len()
    }

    pub fn variable_index(&self, name: &str) -> DSGEResult<usize> {
        self.variables
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| DSGEError::UnknownVariable(name.to_string()))
    }

    pub fn shock_index(&self, name: &str) -> DSGEResult<usize> {
        self.shocks
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| DSGEError::UnknownShock(name.to_string()))
    }

    /// A copy of this model with some parameter values replaced.
    ///
    /// The equations are parsed again and nothing cached is carried over.
    pub fn with_updated_parameters<I, S>(&self, updates: I) -> DSGEResult<Model>
    where
        I: IntoIterator<Item = (S, FloatValue)>,
        S: AsRef<str>,
    {
        let mut parameters = self.parameters.clone();
        for (name, value) in updates {
            let name = name.as_ref();
            let slot = parameters
                .iter_mut()
                .find(|(n, _)| n == name)
                .ok_or_else(|| ModelSpecError::UnknownParameter(name.to_string()))?;
            slot.1 = value;
        }

        let sources: Vec<String> = self
            .equations
            .iter()
            .map(|eq| eq.source().to_string())
            .collect();
        let equations = parse_equations(&self.variables, &self.shocks, &parameters, &sources)?;

        Ok(Model::new(
            self.variables.clone(),
            self.shocks.clone(),
            parameters,
            equations,
            self.initial_values.clone(),
            self.shock_covariance.clone(),
            self.options.clone(),
        ))
    }

    /// Residuals of the static model: every timing of a variable takes `values`, shocks are zero.
    pub fn residuals(&self, values: &[FloatValue]) -> Vec<FloatValue> {
        let shocks = vec![0.0; self.n_shocks()];
        let point = EvalPoint::stationary(values, &shocks);
        self.equations.iter().map(|eq| eq.evaluate(&point)).collect()
    }

    /// Residuals of the dynamic model at an arbitrary point.
    pub fn dynamic_residuals(&self, point: &EvalPoint) -> Vec<FloatValue> {
        self.equations.iter().map(|eq| eq.evaluate(point)).collect()
    }

    /// Jacobian of [`Model::residuals`].
    ///
    /// The derivatives with respect to the lag, current and lead symbols of a variable
    /// are summed, as all three move together in the static model.
    pub fn static_jacobian(&self, values: &[FloatValue]) -> DMatrix<FloatValue> {
        let n = self.n_variables();
        let shocks = vec![0.0; self.n_shocks()];
        let point = EvalPoint::stationary(values, &shocks);

        let mut jacobian = DMatrix::<FloatValue>::zeros(self.equations.len(), n);
        for (row, equation) in self.equations.iter().enumerate() {
            for (symbol, derivative) in equation.derivatives() {
                if let Symbol::Variable { index, .. } = symbol {
                    jacobian[(row, index)] += derivative.evaluate(&|s| point.value(s));
                }
            }
        }
        jacobian
    }

    /// Solve for the steady state and cache it.
    ///
    /// Starts from `initial_guess`, or from the model's initial values if `None`.
    /// Any cached linearisation and solution are discarded.
    pub fn compute_steady_state(
        &mut self,
        initial_guess: Option<&[FloatValue]>,
    ) -> DSGEResult<&SteadyState> {
        let guess = initial_guess.unwrap_or(&self.initial_values);
        let steady_state = solve_steady_state(self, guess, &self.options.steady_state)?;
        Ok(self.replace_steady_state(steady_state))
    }

    /// Use a steady state computed elsewhere, after checking that it solves the model
    /// to within the steady-state tolerance.
    pub fn check_steady_state(&mut self, values: &[FloatValue]) -> DSGEResult<&SteadyState> {
        let steady_state = verify_steady_state(self, values, self.options.steady_state.tolerance)?;
        Ok(self.replace_steady_state(steady_state))
    }

    fn replace_steady_state(&mut self, steady_state: SteadyState) -> &SteadyState {
        self.linear_system = None;
        self.solution = None;
        self.steady_state.insert(steady_state)
    }

    /// The cached steady state, solving from the initial values if there is none.
    pub fn steady_state(&mut self) -> DSGEResult<&SteadyState> {
        let steady_state = match self.steady_state.take() {
            Some(steady_state) => steady_state,
            None => solve_steady_state(self, &self.initial_values, &self.options.steady_state)?,
        };
        Ok(self.steady_state.insert(steady_state))
    }

    /// The linearised system around the steady state.
    pub fn linearize(&mut self) -> DSGEResult<&LinearSystem> {
        let system = match self.linear_system.take() {
            Some(system) => system,
            None => {
                let steady_state = self.steady_state()?.clone();
                linearize(self, &steady_state)
            }
        };
        Ok(self.linear_system.insert(system))
    }

    /// Solve the model, computing whatever is not cached yet.
    pub fn solve(&mut self) -> DSGEResult<&RationalExpectationsSolution> {
        let solution = match self.solution.take() {
            Some(solution) => solution,
            None => {
                let options = self.options.stability.clone();
                let solution = solve_linear_re(self.linearize()?, &options)?;
                info!(
                    "Solved model with {} variable(s) and {} shock(s)",
                    self.n_variables(),
                    self.n_shocks()
                );
                solution
            }
        };
        Ok(self.solution.insert(solution))
    }

    pub fn policy(&mut self) -> DSGEResult<&PolicyFunction> {
        Ok(&self.solve()?.policy)
    }

    /// Response of every variable to a unit impulse in `shock`, in deviations from steady state.
    pub fn impulse_response(&mut self, shock: &str, horizon: usize) -> DSGEResult<Trajectory> {
        self.impulse_response_scaled(shock, 1.0, horizon)
    }

    /// Response to an impulse of `size` in `shock`.
    pub fn impulse_response_scaled(
        &mut self,
        shock: &str,
        size: FloatValue,
        horizon: usize,
    ) -> DSGEResult<Trajectory> {
        let index = self.shock_index(shock)?;
        simulate::impulse_response_scaled(self.policy()?, index, size, horizon)
    }

    /// Response to a one standard deviation impulse in `shock`.
    pub fn impulse_response_std(&mut self, shock: &str, horizon: usize) -> DSGEResult<Trajectory> {
        let index = self.shock_index(shock)?;
        let size = self.shock_covariance[(index, index)].sqrt();
        self.impulse_response_scaled(shock, size, horizon)
    }

    /// Stochastic simulation with shocks drawn from the model's shock covariance.
    pub fn simulate(&mut self, options: &SimulationOptions) -> DSGEResult<Trajectory> {
        let covariance = self.shock_covariance.clone();
        simulate::simulate(self.policy()?, &covariance, options)
    }

    /// Simulate along a given shock path (`periods x n_shocks`).
    pub fn simulate_with_shocks(
        &mut self,
        shocks: ArrayView2<FloatValue>,
    ) -> DSGEResult<Trajectory> {
        simulate::simulate_with_shocks(self.policy()?, shocks)
    }

    /// Theoretical moments of the solved model.
    pub fn moments(&mut self) -> DSGEResult<Moments> {
        let covariance = self.shock_covariance.clone();
        let options = self.options.lyapunov.clone();
        theoretical_moments(self.policy()?, &covariance, &options)
    }
}
