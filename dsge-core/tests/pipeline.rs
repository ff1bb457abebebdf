//! End-to-end tests of the solve pipeline.
//!
//! These go through the public API only: build a model, find its steady state,
//! solve it and check the outputs against closed forms or simulation.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use dsge_core::errors::{DSGEError, SteadyStateError};
use dsge_core::model::{Model, ModelBuilder, ModelDefinition};
use dsge_core::options::SimulationOptions;
use is_close::is_close;

fn ar1(rho: f64) -> Model {
    ModelBuilder::new()
        .with_variables(["x"])
        .with_shocks(["e"])
        .with_parameter("rho", rho)
        .with_equation("x = rho*x(-1) + e")
        .build()
        .unwrap()
}

mod ar1_process {
    use super::*;

    #[test]
    fn test_policy_and_irf() {
        for rho in [0.0, 0.5, 0.9, -0.7] {
            let mut model = ar1(rho);
            let policy = model.policy().unwrap();
            assert_abs_diff_eq!(policy.transition()[(0, 0)], rho, epsilon = 1e-12);
            assert_abs_diff_eq!(policy.impact()[(0, 0)], 1.0, epsilon = 1e-12);

            let irf = model.impulse_response("e", 20).unwrap();
            assert_eq!(irf.len(), 20);
            for (h, value) in irf.get("x").unwrap().iter().enumerate() {
                assert_abs_diff_eq!(*value, rho.powi(h as i32), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_solution_reports_eigenvalues() {
        let mut model = ar1(0.6);
        let solution = model.solve().unwrap();
        assert_eq!(solution.diagnostics.n_stable, 1);
        assert_eq!(solution.diagnostics.n_explosive, 0);
        assert!(solution
            .diagnostics
            .eigenvalues
            .iter()
            .any(|v| is_close!(v.re, 0.6) && v.im.abs() < 1e-10));
    }

    #[test]
    fn test_repeated_solves_are_identical() {
        // Separate models so neither solve can come from a cache
        let build = || {
            ModelBuilder::new()
                .with_variables(["x", "y"])
                .with_shocks(["e"])
                .with_equations(["x = 0.9*x(-1) + e", "y = 0.5*y(+1) + x"])
                .build()
                .unwrap()
        };
        let mut first_model = build();
        let mut second_model = build();
        let first = first_model.policy().unwrap().clone();
        let second = second_model.policy().unwrap().clone();
        assert_eq!(first, second);

        let irf_first = first_model.impulse_response("e", 10).unwrap();
        let irf_second = second_model.impulse_response("e", 10).unwrap();
        assert_eq!(irf_first, irf_second);
    }
}

mod steady_state {
    use super::*;

    /// Capital accumulation with a concave technology: k = s*k(-1)^alpha + (1-d)*k(-1)
    /// has the closed-form steady state k = (s/d)^(1/(1-alpha)).
    fn accumulation() -> Model {
        ModelBuilder::new()
            .with_variables(["k", "y"])
            .with_shocks(["e"])
            .with_parameters([("s", 0.2), ("alpha", 0.3), ("d", 0.1)])
            .with_equations([
                "y = exp(e)*k(-1)^alpha",
                "k = s*y + (1 - d)*k(-1)",
            ])
            .with_initial_value("k", 1.0)
            .with_initial_value("y", 1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_closed_form() {
        let mut model = accumulation();
        let expected_k = 2.0f64.powf(1.0 / 0.7);
        let steady_state = model.steady_state().unwrap();
        assert_relative_eq!(steady_state.get("k").unwrap(), expected_k, max_relative = 1e-6);
        assert_relative_eq!(
            steady_state.get("y").unwrap(),
            expected_k.powf(0.3),
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_residuals_round_trip() {
        let mut model = accumulation();
        let values = model.steady_state().unwrap().values().to_vec();
        let tolerance = model.options().steady_state.tolerance;
        let norm = model
            .residuals(&values)
            .iter()
            .map(|r| r * r)
            .sum::<f64>()
            .sqrt();
        assert!(norm < tolerance);
    }

    #[test]
    fn test_failure_keeps_last_iterate() {
        let mut model = ModelBuilder::new()
            .with_variables(["x"])
            .with_equation("x^2 + 1 = 0")
            .with_initial_value("x", 0.5)
            .build()
            .unwrap();
        // No real root, so Newton wanders until it runs out of iterations
        match model.steady_state() {
            Err(DSGEError::SteadyState(
                SteadyStateError::NotConverged { iterate, .. }
                | SteadyStateError::SingularJacobian { iterate, .. },
            )) => assert_eq!(iterate.len(), 1),
            other => panic!("expected a steady-state error, got {other:?}"),
        }
    }

    #[test]
    fn test_linearisation_at_closed_form() {
        let mut model = accumulation();
        let k = 2.0f64.powf(1.0 / 0.7);
        let y = k.powf(0.3);
        model.check_steady_state(&[k, y]).unwrap();

        // Around the steady state k = (1 - d + s*alpha*y/k) k(-1) + s*y*e
        let policy = model.policy().unwrap();
        let k_index = policy.variable_index("k").unwrap();
        let persistence = 0.9 + 0.2 * 0.3 * y / k;
        assert_relative_eq!(
            policy.transition()[(k_index, k_index)],
            persistence,
            epsilon = 1e-9
        );
        assert_relative_eq!(policy.impact()[(k_index, 0)], 0.2 * y, epsilon = 1e-9);
    }
}

mod moments {
    use super::*;

    #[test]
    fn test_simulation_matches_theory() {
        let mut model = ar1(0.5);
        let moments = model.moments().unwrap();
        assert_relative_eq!(moments.variance("x").unwrap(), 4.0 / 3.0, epsilon = 1e-12);

        let path = model
            .simulate(&SimulationOptions {
                periods: 400_000,
                burn_in: 1_000,
                seed: 42,
            })
            .unwrap();
        let sample = path.sample_covariance()[(0, 0)];
        assert_relative_eq!(sample, 4.0 / 3.0, max_relative = 0.015);

        let x = path.get("x").unwrap();
        let mean = path.mean()[0];
        let lagged: f64 = x
            .iter()
            .zip(x.iter().skip(1))
            .map(|(a, b)| (a - mean) * (b - mean))
            .sum::<f64>()
            / (x.len() - 1) as f64;
        assert_abs_diff_eq!(
            lagged / sample,
            moments.autocorrelation(1)[(0, 0)],
            epsilon = 0.01
        );
    }

    #[test]
    fn test_correlated_shocks() {
        let mut model = ModelBuilder::new()
            .with_variables(["x", "y"])
            .with_shocks(["e1", "e2"])
            .with_equations(["x = 0.5*x(-1) + e1", "y = 0.3*y(-1) + 0.2*x + e2"])
            .with_shock_covariance("e1", "e2", 0.5)
            .build()
            .unwrap();

        let theoretical = model.moments().unwrap().covariance().clone();
        let path = model
            .simulate(&SimulationOptions {
                periods: 400_000,
                burn_in: 1_000,
                seed: 42,
            })
            .unwrap();
        let sample = path.sample_covariance();
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(sample[(i, j)], theoretical[(i, j)], epsilon = 0.03);
            }
        }
    }
}

mod definitions {
    use super::*;

    #[test]
    fn test_toml_model() {
        let definition = ModelDefinition::from_toml_str(
            r#"
variables = ["x", "y"]
shocks = ["e"]
equations = [
    "x = rho*x(-1) + e",
    "y = x(+1)",
]

[parameters]
rho = 0.8

[shock_variances]
e = 0.01
"#,
        )
        .unwrap();
        let mut model = definition.build().unwrap();

        // y_t = E_t x_{t+1} = rho x_t
        let policy = model.policy().unwrap();
        assert_relative_eq!(policy.transition()[(1, 0)], 0.64, epsilon = 1e-10);
        assert_relative_eq!(policy.impact()[(1, 0)], 0.8, epsilon = 1e-10);
        assert_eq!(model.solve().unwrap().diagnostics.n_stable, 2);
    }
}
