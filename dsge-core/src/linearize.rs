//! First-order expansion around the steady state.
//!
//! Writing $\hat y_t = y_t - \bar y$, the linearised model is
//!
//! $$ A\,E_t[\hat y_{t+1}] + B\,\hat y_t + C\,\hat y_{t-1} + D\,\varepsilon_t = 0 $$
//!
//! where row $i$ of each matrix holds the partial derivatives of equation $i$ with
//! respect to the lead, current, lag and shock symbols, evaluated at the steady state.

use crate::model::Model;
use crate::steady_state::SteadyState;
use crate::symbolic::{EvalPoint, Symbol, Timing};
use crate::FloatValue;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Coefficient matrices of the linearised model.
///
/// `a`, `b` and `c` are `n_equations x n_variables`, `d` is `n_equations x n_shocks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSystem {
    /// Coefficients on $E_t[y_{t+1}]$
    pub a: DMatrix<FloatValue>,
    /// Coefficients on $y_t$
    pub b: DMatrix<FloatValue>,
    /// Coefficients on $y_{t-1}$
    pub c: DMatrix<FloatValue>,
    /// Coefficients on $\varepsilon_t$
    pub d: DMatrix<FloatValue>,
    pub variables: Vec<String>,
    pub shocks: Vec<String>,
}

impl LinearSystem {
    /// Build a system directly from its matrices, with generated names.
    ///
    /// Useful for systems that did not come from a [`Model`].
    pub fn from_matrices(
        a: DMatrix<FloatValue>,
        b: DMatrix<FloatValue>,
        c: DMatrix<FloatValue>,
        d: DMatrix<FloatValue>,
    ) -> Self {
        let variables = (0..a.ncols()).map(|i| format!("y{i}")).collect();
        let shocks = (0..d.ncols()).map(|i| format!("e{i}")).collect();
        Self {
            a,
            b,
            c,
            d,
            variables,
            shocks,
        }
    }

    pub fn n_variables(&self) -> usize {
        self.b.ncols()
    }

    pub fn n_shocks(&self) -> usize {
        self.d.ncols()
    }

    /// Number of variables that appear with a lead (non-zero column of `a`).
    pub fn n_forward_looking(&self) -> usize {
        count_nonzero_columns(&self.a)
    }

    /// Number of variables that appear with a lag (non-zero column of `c`).
    pub fn n_predetermined(&self) -> usize {
        count_nonzero_columns(&self.c)
    }
}

fn count_nonzero_columns(m: &DMatrix<FloatValue>) -> usize {
    m.column_iter()
        .filter(|col| col.iter().any(|v| *v != 0.0))
        .count()
}

/// Evaluate the Jacobians of the model equations at `steady_state`.
pub fn linearize(model: &Model, steady_state: &SteadyState) -> LinearSystem {
    let n = model.n_variables();
    let n_shocks = model.n_shocks();
    let shocks = vec![0.0; n_shocks];
    let point = EvalPoint::stationary(steady_state.values(), &shocks);

    let mut a = DMatrix::<FloatValue>::zeros(n, n);
    let mut b = DMatrix::<FloatValue>::zeros(n, n);
    let mut c = DMatrix::<FloatValue>::zeros(n, n);
    let mut d = DMatrix::<FloatValue>::zeros(n, n_shocks);

    for (row, equation) in model.equations().iter().enumerate() {
        for (symbol, derivative) in equation.derivatives() {
            let value = derivative.evaluate(&|s| point.value(s));
            match symbol {
                Symbol::Variable { index, timing } => match timing {
                    Timing::Lead => a[(row, index)] = value,
                    Timing::Current => b[(row, index)] = value,
                    Timing::Lag => c[(row, index)] = value,
                },
                Symbol::Shock(index) => d[(row, index)] = value,
            }
        }
    }

    LinearSystem {
        a,
        b,
        c,
        d,
        variables: model.variables().to_vec(),
        shocks: model.shocks().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelBuilder;
    use crate::options::NewtonOptions;
    use crate::steady_state::solve_steady_state;
    use approx::assert_relative_eq;

    #[test]
    fn test_linearize_ar1() {
        let model = ModelBuilder::new()
            .with_variables(["x"])
            .with_shocks(["e"])
            .with_parameter("rho", 0.9)
            .with_equation("x = rho*x(-1) + e")
            .build()
            .unwrap();
        let steady_state = solve_steady_state(&model, &[0.0], &NewtonOptions::default()).unwrap();
        let system = linearize(&model, &steady_state);

        assert_eq!(system.a, DMatrix::from_element(1, 1, 0.0));
        assert_eq!(system.b, DMatrix::from_element(1, 1, 1.0));
        assert_eq!(system.c, DMatrix::from_element(1, 1, -0.9));
        assert_eq!(system.d, DMatrix::from_element(1, 1, -1.0));
        assert_eq!(system.n_forward_looking(), 0);
        assert_eq!(system.n_predetermined(), 1);
    }

    #[test]
    fn test_linearize_nonlinear_euler_equation() {
        // c^(-2) = 0.5 * c(+1)^(-2) * r  with r = 2, steady state c = 1
        let model = ModelBuilder::new()
            .with_variables(["c", "r"])
            .with_equations(["c^(-2) = 0.5 * c(+1)^(-2) * r", "r = 2"])
            .build()
            .unwrap();
        let steady_state =
            solve_steady_state(&model, &[1.2, 1.5], &NewtonOptions::default()).unwrap();
        let system = linearize(&model, &steady_state);

        // d/dc(+1) of -0.5 c(+1)^(-2) r = 0.5 * 2 * c^(-3) * r = 2
        assert_relative_eq!(system.a[(0, 0)], 2.0, epsilon = 1e-8);
        // d/dc of c^(-2) = -2 c^(-3) = -2
        assert_relative_eq!(system.b[(0, 0)], -2.0, epsilon = 1e-8);
        // d/dr = -0.5 * c(+1)^(-2) = -0.5
        assert_relative_eq!(system.b[(0, 1)], -0.5, epsilon = 1e-8);
        assert_eq!(system.c, DMatrix::zeros(2, 2));
        assert_eq!(system.d.ncols(), 0);
        assert_eq!(system.n_forward_looking(), 1);
    }
}
