use dsge_core::python::core;
use dsge_models::python::models;
use pyo3::prelude::*;
use pyo3::wrap_pymodule;

#[pymodule]
#[pyo3(name = "_lib")]
fn dsge(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_wrapped(wrap_pymodule!(core))?;
    m.add_wrapped(wrap_pymodule!(models))?;

    set_path(m, "dsge._lib.core", "core")?;
    set_path(m, "dsge._lib.models", "models")?;

    Ok(())
}

/// Register a submodule in `sys.modules` so that `from dsge._lib.core import ...` works.
fn set_path(m: &Bound<'_, PyModule>, path: &str, module: &str) -> PyResult<()> {
    let code = format!(
        "\
import sys
sys.modules['{path}'] = {module}
    "
    );
    m.py().run_bound(&code, None, Some(&m.dict()))
}
