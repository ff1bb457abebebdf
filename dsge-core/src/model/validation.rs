//! Validation functions for model building.

use crate::errors::ModelSpecError;
use crate::symbolic::{Equation, Symbol};
use log::debug;

/// A model must be square: one equation per endogenous variable.
pub(crate) fn verify_dimensions(
    n_variables: usize,
    n_equations: usize,
) -> Result<(), ModelSpecError> {
    if n_variables == 0 {
        return Err(ModelSpecError::NoVariables);
    }
    if n_variables != n_equations {
        return Err(ModelSpecError::EquationCountMismatch {
            equations: n_equations,
            variables: n_variables,
        });
    }
    Ok(())
}

/// Every declared variable has to appear in at least one equation, at any timing.
///
/// A variable that never appears leaves a zero column in every Jacobian, which would
/// otherwise only surface later as a singular steady-state or pencil.
pub(crate) fn verify_variables_used(
    variables: &[String],
    equations: &[Equation],
) -> Result<(), ModelSpecError> {
    let mut used = vec![false; variables.len()];
    for equation in equations {
        for symbol in equation.symbols() {
            if let Symbol::Variable { index, .. } = symbol {
                used[index] = true;
            }
        }
    }

    match used.iter().position(|u| !u) {
        Some(index) => Err(ModelSpecError::UnusedVariable(variables[index].clone())),
        None => Ok(()),
    }
}

/// Shocks that never appear are allowed but usually indicate a typo.
pub(crate) fn report_unused_shocks(shocks: &[String], equations: &[Equation]) {
    for (index, name) in shocks.iter().enumerate() {
        let used = equations
            .iter()
            .any(|eq| eq.symbols().any(|s| s == Symbol::Shock(index)));
        if !used {
            debug!("Shock '{}' does not appear in any equation", name);
        }
    }
}
