//! Python bindings for the solver pipeline.
//!
//! ```python
//! from dsge._lib.core import Model
//!
//! model = Model(
//!     variables=["x"],
//!     shocks=["e"],
//!     parameters={"rho": 0.9},
//!     equations=["x = rho*x(-1) + e"],
//! )
//! P, Q = model.policy()
//! irf = model.irf("e", 20)
//! ```

use crate::errors::DSGEError;
use crate::model::{Model, ModelDefinition};
use crate::moments::Moments;
use crate::options::SimulationOptions;
use crate::utils::linear_algebra::to_array2;
use crate::FloatValue;
use num::complex::Complex64;
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;
use std::collections::HashMap;

pub mod exceptions {
    use pyo3::create_exception;
    use pyo3::exceptions::{PyException, PyUserWarning};

    create_exception!(core, DSGEError, PyException, "Base class of solver errors.");
    create_exception!(
        core,
        ModelSpecError,
        DSGEError,
        "The model definition is malformed."
    );
    create_exception!(
        core,
        SteadyStateError,
        DSGEError,
        "The steady-state search failed."
    );
    create_exception!(
        core,
        IndeterminacyError,
        DSGEError,
        "Too few explosive eigenvalues: the model has many stable solutions."
    );
    create_exception!(
        core,
        NoStableSolutionError,
        DSGEError,
        "Too many explosive eigenvalues: the model has no stable solution."
    );
    create_exception!(
        core,
        BoundaryEigenvalueWarning,
        PyUserWarning,
        "An eigenvalue lies within tolerance of the unit circle."
    );
}

impl From<DSGEError> for PyErr {
    fn from(err: DSGEError) -> PyErr {
        let message = err.to_string();
        match err {
            DSGEError::ModelSpec(_) => exceptions::ModelSpecError::new_err(message),
            DSGEError::SteadyState(_) => exceptions::SteadyStateError::new_err(message),
            DSGEError::Indeterminacy { .. } => exceptions::IndeterminacyError::new_err(message),
            DSGEError::NoStableSolution { .. } => {
                exceptions::NoStableSolutionError::new_err(message)
            }
            DSGEError::UnknownVariable(_) | DSGEError::UnknownShock(_) => {
                PyKeyError::new_err(message)
            }
            DSGEError::InvalidShockPath { .. }
            | DSGEError::InvalidShockCovariance(_)
            | DSGEError::VariableMismatch { .. }
            | DSGEError::Config(_) => PyValueError::new_err(message),
            _ => exceptions::DSGEError::new_err(message),
        }
    }
}

/// A DSGE model.
///
/// Parameters
/// ----------
/// variables : list[str]
///     Endogenous variables, in order
/// shocks : list[str]
///     Exogenous shocks, in order
/// parameters : dict[str, float]
/// equations : list[str]
///     One equation per variable, e.g. ``"x = rho*x(-1) + e"``
/// shock_variances : dict[str, float], optional
///     Shocks not listed have unit variance
/// initial_values : dict[str, float], optional
///     Starting point of the steady-state search
///
/// Raises
/// ------
/// ModelSpecError
///     If the definition is malformed
#[pyclass]
#[pyo3(name = "Model")]
#[derive(Debug, Clone)]
pub struct PyModel(pub Model);

#[pymethods]
impl PyModel {
    #[new]
    #[pyo3(signature = (variables, shocks, parameters, equations, shock_variances=None, initial_values=None))]
    fn new(
        variables: Vec<String>,
        shocks: Vec<String>,
        parameters: HashMap<String, FloatValue>,
        equations: Vec<String>,
        shock_variances: Option<HashMap<String, FloatValue>>,
        initial_values: Option<HashMap<String, FloatValue>>,
    ) -> PyResult<Self> {
        let definition = ModelDefinition {
            variables,
            shocks,
            parameters: parameters.into_iter().collect(),
            equations,
            initial_values: initial_values.unwrap_or_default().into_iter().collect(),
            shock_variances: shock_variances.unwrap_or_default().into_iter().collect(),
            ..Default::default()
        };
        Ok(Self(definition.build()?))
    }

    /// Build a model from the contents of a TOML definition.
    #[staticmethod]
    fn from_toml(content: &str) -> PyResult<Self> {
        Ok(Self(ModelDefinition::from_toml_str(content)?.build()?))
    }

    #[getter]
    fn variables(&self) -> Vec<String> {
        self.0.variables().to_vec()
    }

    #[getter]
    fn shocks(&self) -> Vec<String> {
        self.0.shocks().to_vec()
    }

    #[getter]
    fn parameters(&self) -> HashMap<String, FloatValue> {
        self.0.parameters().iter().cloned().collect()
    }

    /// A new model with some parameter values replaced.
    fn with_parameters(&self, parameters: HashMap<String, FloatValue>) -> PyResult<Self> {
        Ok(Self(self.0.with_updated_parameters(parameters)?))
    }

    /// Steady-state values by variable name.
    ///
    /// Without ``initial_guess`` the cached steady state is returned, solving for it
    /// from the model's initial values the first time.
    #[pyo3(signature = (initial_guess=None))]
    fn steady_state(
        &mut self,
        initial_guess: Option<Vec<FloatValue>>,
    ) -> PyResult<HashMap<String, FloatValue>> {
        let steady_state = match initial_guess {
            Some(guess) => self.0.compute_steady_state(Some(guess.as_slice()))?,
            None => self.0.steady_state()?,
        };
        Ok(steady_state.to_hashmap())
    }

    /// Use a known steady state instead of solving for it.
    fn set_steady_state(&mut self, values: Vec<FloatValue>) -> PyResult<()> {
        self.0.check_steady_state(&values)?;
        Ok(())
    }

    /// The matrices ``(A, B, C, D)`` of the linearised model.
    #[allow(clippy::type_complexity)]
    fn linearize<'py>(
        &mut self,
        py: Python<'py>,
    ) -> PyResult<(
        Bound<'py, PyArray2<FloatValue>>,
        Bound<'py, PyArray2<FloatValue>>,
        Bound<'py, PyArray2<FloatValue>>,
        Bound<'py, PyArray2<FloatValue>>,
    )> {
        let system = self.0.linearize()?;
        Ok((
            to_array2(&system.a).into_pyarray_bound(py),
            to_array2(&system.b).into_pyarray_bound(py),
            to_array2(&system.c).into_pyarray_bound(py),
            to_array2(&system.d).into_pyarray_bound(py),
        ))
    }

    /// Solve the model.
    ///
    /// Emits a ``BoundaryEigenvalueWarning`` for every eigenvalue on the unit circle.
    fn solve(&mut self, py: Python<'_>) -> PyResult<()> {
        let messages: Vec<String> = self
            .0
            .solve()?
            .warnings
            .iter()
            .map(|w| w.to_string())
            .collect();
        let category = py.get_type_bound::<exceptions::BoundaryEigenvalueWarning>();
        for message in messages {
            PyErr::warn_bound(py, category.as_any(), &message, 1)?;
        }
        Ok(())
    }

    /// The policy matrices ``(P, Q)`` of ``y_t = P y_{t-1} + Q e_t``.
    fn policy<'py>(
        &mut self,
        py: Python<'py>,
    ) -> PyResult<(Bound<'py, PyArray2<FloatValue>>, Bound<'py, PyArray2<FloatValue>>)> {
        self.solve(py)?;
        let policy = self.0.policy()?;
        Ok((
            to_array2(policy.transition()).into_pyarray_bound(py),
            to_array2(policy.impact()).into_pyarray_bound(py),
        ))
    }

    /// Generalized eigenvalues sorted by modulus. Infinite ones are ``inf``.
    fn eigenvalues<'py>(&mut self, py: Python<'py>) -> PyResult<Bound<'py, PyArray1<Complex64>>> {
        let eigenvalues = self.0.solve()?.diagnostics.eigenvalues.clone();
        Ok(PyArray1::from_vec_bound(py, eigenvalues))
    }

    /// Impulse response to a unit shock, ``horizon x n_variables``.
    ///
    /// With ``std=True`` the impulse is one standard deviation instead.
    #[pyo3(signature = (shock, horizon=40, std=false))]
    fn irf<'py>(
        &mut self,
        py: Python<'py>,
        shock: &str,
        horizon: usize,
        std: bool,
    ) -> PyResult<Bound<'py, PyArray2<FloatValue>>> {
        self.solve(py)?;
        let trajectory = if std {
            self.0.impulse_response_std(shock, horizon)?
        } else {
            self.0.impulse_response(shock, horizon)?
        };
        Ok(trajectory.into_values().into_pyarray_bound(py))
    }

    /// Stochastic simulation in deviations from steady state, ``periods x n_variables``.
    #[pyo3(signature = (periods=1000, burn_in=100, seed=42))]
    fn simulate<'py>(
        &mut self,
        py: Python<'py>,
        periods: usize,
        burn_in: usize,
        seed: u64,
    ) -> PyResult<Bound<'py, PyArray2<FloatValue>>> {
        self.solve(py)?;
        let options = SimulationOptions {
            periods,
            burn_in,
            seed,
        };
        Ok(self.0.simulate(&options)?.into_values().into_pyarray_bound(py))
    }

    fn moments(&mut self, py: Python<'_>) -> PyResult<PyMoments> {
        self.solve(py)?;
        Ok(PyMoments(self.0.moments()?))
    }

    fn __repr__(&self) -> String {
        format!(
            "<Model variables={:?} shocks={:?}>",
            self.0.variables(),
            self.0.shocks()
        )
    }
}

/// Theoretical moments of a solved model.
#[pyclass]
#[pyo3(name = "Moments")]
#[derive(Debug, Clone)]
pub struct PyMoments(pub Moments);

#[pymethods]
impl PyMoments {
    #[getter]
    fn variables(&self) -> Vec<String> {
        self.0.variables().to_vec()
    }

    #[getter]
    fn covariance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<FloatValue>> {
        to_array2(self.0.covariance()).into_pyarray_bound(py)
    }

    #[getter]
    fn std_devs(&self) -> Vec<FloatValue> {
        self.0.std_devs()
    }

    #[getter]
    fn correlation<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<FloatValue>> {
        to_array2(&self.0.correlation()).into_pyarray_bound(py)
    }

    #[getter]
    fn variance_decomposition<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<FloatValue>> {
        to_array2(self.0.variance_decomposition()).into_pyarray_bound(py)
    }

    /// Autocorrelations at lags ``1..=max_lag``, ``max_lag x n_variables``.
    #[pyo3(signature = (max_lag=5))]
    fn autocorrelation<'py>(
        &self,
        py: Python<'py>,
        max_lag: usize,
    ) -> Bound<'py, PyArray2<FloatValue>> {
        to_array2(&self.0.autocorrelation(max_lag)).into_pyarray_bound(py)
    }
}

#[pymodule]
pub fn core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add_class::<PyModel>()?;
    m.add_class::<PyMoments>()?;
    m.add("DSGEError", py.get_type_bound::<exceptions::DSGEError>())?;
    m.add("ModelSpecError", py.get_type_bound::<exceptions::ModelSpecError>())?;
    m.add(
        "SteadyStateError",
        py.get_type_bound::<exceptions::SteadyStateError>(),
    )?;
    m.add(
        "IndeterminacyError",
        py.get_type_bound::<exceptions::IndeterminacyError>(),
    )?;
    m.add(
        "NoStableSolutionError",
        py.get_type_bound::<exceptions::NoStableSolutionError>(),
    )?;
    m.add(
        "BoundaryEigenvalueWarning",
        py.get_type_bound::<exceptions::BoundaryEigenvalueWarning>(),
    )?;
    Ok(())
}
