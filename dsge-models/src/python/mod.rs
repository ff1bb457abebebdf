use dsge_core::python::PyModel;
use dsge_core::FloatValue;
use pyo3::prelude::*;
use pyo3::{pymodule, Bound, PyResult};

use crate::ar1::{self, AR1Parameters};
use crate::new_keynesian::{self, NewKeynesianParameters};
use crate::rbc::{self, RBCParameters};

/// AR(1) process ``x = (1 - rho)*mu + rho*x(-1) + e``.
#[pyfunction]
#[pyo3(signature = (rho=0.9, mean=0.0, variance=1.0))]
fn ar1_model(rho: FloatValue, mean: FloatValue, variance: FloatValue) -> PyResult<PyModel> {
    let parameters = AR1Parameters {
        rho,
        mean,
        variance,
    };
    Ok(PyModel(ar1::model(&parameters)?))
}

/// Three-equation New Keynesian model with a technology shock.
#[pyfunction]
#[pyo3(signature = (phi_pi=1.5, phi_x=0.125, rho_a=0.9))]
fn new_keynesian_model(
    phi_pi: FloatValue,
    phi_x: FloatValue,
    rho_a: FloatValue,
) -> PyResult<PyModel> {
    let parameters = NewKeynesianParameters {
        phi_pi,
        phi_x,
        rho_a,
        ..Default::default()
    };
    Ok(PyModel(new_keynesian::model(&parameters)?))
}

/// Stochastic growth model.
#[pyfunction]
#[pyo3(signature = (alpha=0.36, beta=0.99, delta=0.025, rho=0.95, sigma=0.01))]
fn rbc_model(
    alpha: FloatValue,
    beta: FloatValue,
    delta: FloatValue,
    rho: FloatValue,
    sigma: FloatValue,
) -> PyResult<PyModel> {
    let parameters = RBCParameters {
        alpha,
        beta,
        delta,
        rho,
        sigma,
    };
    Ok(PyModel(rbc::model(&parameters)?))
}

#[pymodule]
pub fn models(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ar1_model, m)?)?;
    m.add_function(wrap_pyfunction!(new_keynesian_model, m)?)?;
    m.add_function(wrap_pyfunction!(rbc_model, m)?)?;
    Ok(())
}
