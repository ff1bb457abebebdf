//! First-order rational-expectations solver.
//!
//! Given the linearised model
//!
//! $$ A\,E_t[y_{t+1}] + B\,y_t + C\,y_{t-1} + D\,\varepsilon_t = 0 $$
//!
//! the solver looks for the unique bounded solution of the form
//!
//! $$ y_t = P\,y_{t-1} + Q\,\varepsilon_t. $$
//!
//! The matrix pencil of the stacked first-order system is decomposed with an ordered
//! complex Schur form ([`schur`]). Generalized eigenvalues are split into stable and
//! unstable ones and the Blanchard-Kahn order condition is checked ([`blanchard_kahn`]):
//! a unique bounded solution exists only when the number of stable eigenvalues equals
//! the number of variables. `P` is then recovered from the Schur vectors spanning the
//! stable subspace, and `Q` from the contemporaneous impact of the shocks.

mod blanchard_kahn;
mod schur;

pub use blanchard_kahn::{classify, BoundaryEigenvalueWarning, SolverDiagnostics, Stability};
pub use schur::GeneralizedEigenvalue;

use crate::errors::{DSGEError, DSGEResult};
use crate::linearize::LinearSystem;
use crate::options::StabilityOptions;
use crate::utils::linear_algebra::checked_lu;
use crate::FloatValue;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use schur::PencilSchur;
use serde::{Deserialize, Serialize};

/// Imaginary parts of `P` larger than this (relative to its largest entry) are reported.
const IMAGINARY_TOLERANCE: FloatValue = 1e-8;

/// The state-space solution $y_t = P\,y_{t-1} + Q\,\varepsilon_t$ in deviations from steady state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyFunction {
    transition: DMatrix<FloatValue>,
    impact: DMatrix<FloatValue>,
    variables: Vec<String>,
    shocks: Vec<String>,
}

impl PolicyFunction {
    pub fn new(
        transition: DMatrix<FloatValue>,
        impact: DMatrix<FloatValue>,
        variables: Vec<String>,
        shocks: Vec<String>,
    ) -> Self {
        Self {
            transition,
            impact,
            variables,
            shocks,
        }
    }

    /// `P`, `n_variables x n_variables`
    pub fn transition(&self) -> &DMatrix<FloatValue> {
        &self.transition
    }

    /// `Q`, `n_variables x n_shocks`
    pub fn impact(&self) -> &DMatrix<FloatValue> {
        &self.impact
    }

    /// Ordering of the rows (and of the columns of `P`).
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Ordering of the columns of `Q`.
    pub fn shocks(&self) -> &[String] {
        &self.shocks
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

    /// One step of the recursion.
    pub fn step(
        &self,
        previous: &DVector<FloatValue>,
        shocks: &DVector<FloatValue>,
    ) -> DVector<FloatValue> {
        &self.transition * previous + &self.impact * shocks
    }
}

/// A solved model: the policy function plus what the solver found on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RationalExpectationsSolution {
    pub policy: PolicyFunction,
    pub diagnostics: SolverDiagnostics,
    pub warnings: Vec<BoundaryEigenvalueWarning>,
}

impl RationalExpectationsSolution {
    pub fn policy(&self) -> &PolicyFunction {
        &self.policy
    }
}

/// Solve the linear rational-expectations model `system`.
///
/// Deterministic: identical inputs give bit-identical outputs.
pub fn solve_linear_re(
    system: &LinearSystem,
    options: &StabilityOptions,
) -> DSGEResult<RationalExpectationsSolution> {
    let n = system.n_variables();

    let mut schur = PencilSchur::new(system)?;
    let n_stable = schur.reorder(|v| classify(v, options).is_stable());
    let eigenvalues = schur.eigenvalues();

    let warnings = blanchard_kahn::boundary_warnings(&eigenvalues, options);
    let diagnostics =
        SolverDiagnostics::new(&eigenvalues, options, n, system.n_predetermined());
    debug!("Generalized eigenvalues: {:?}", diagnostics.eigenvalues);
    diagnostics.check_order_condition(n)?;
    debug_assert_eq!(n_stable, n);

    let transition = stable_transition(&schur, n, &diagnostics)?;
    let impact = shock_impact(system, &transition)?;

    let residual = &system.a * &transition * &transition + &system.b * &transition + &system.c;
    debug!("Residual of the matrix quadratic: {:e}", residual.amax());
    info!(
        "Blanchard-Kahn conditions satisfied: {} explosive eigenvalue(s) for {} jump variable(s)",
        diagnostics.n_explosive, diagnostics.n_jump
    );

    Ok(RationalExpectationsSolution {
        policy: PolicyFunction::new(
            transition,
            impact,
            system.variables.clone(),
            system.shocks.clone(),
        ),
        diagnostics,
        warnings,
    })
}

/// `P = Z21 Z11^{-1}` from the leading `n` Schur vectors.
fn stable_transition(
    schur: &PencilSchur,
    n: usize,
    diagnostics: &SolverDiagnostics,
) -> DSGEResult<DMatrix<FloatValue>> {
    let z11 = schur.u.view((0, 0), (n, n)).clone_owned();
    let z21 = schur.u.view((n, 0), (n, n)).clone_owned();

    // P Z11 = Z21  <=>  Z11^T P^T = Z21^T
    let transposed = checked_lu(z11.transpose())
        .and_then(|lu| lu.solve(&z21.transpose()))
        .ok_or_else(|| DSGEError::RankCondition {
            eigenvalues: diagnostics.eigenvalues.clone(),
        })?;
    let complex = transposed.transpose();

    let scale = complex.iter().map(|v| v.norm()).fold(1.0, FloatValue::max);
    let imaginary = complex.iter().map(|v| v.im.abs()).fold(0.0, FloatValue::max);
    if imaginary > IMAGINARY_TOLERANCE * scale {
        warn!(
            "Transition matrix has imaginary parts up to {:e}; they are discarded",
            imaginary
        );
    }

    Ok(complex.map(|v| v.re))
}

/// `Q = -(A P + B)^{-1} D`
fn shock_impact(
    system: &LinearSystem,
    transition: &DMatrix<FloatValue>,
) -> DSGEResult<DMatrix<FloatValue>> {
    let contemporaneous = &system.a * transition + &system.b;
    checked_lu(contemporaneous)
        .and_then(|lu| lu.solve(&system.d))
        .map(|solution| -solution)
        .ok_or(DSGEError::SingularImpact)
}
