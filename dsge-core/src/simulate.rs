//! Impulse responses and stochastic simulation of a solved model.
//!
//! Both iterate the policy function $y_t = P\,y_{t-1} + Q\,\varepsilon_t$ forward from
//! the steady state ($y_{-1} = 0$ in deviations). Every call starts again from
//! period zero; nothing is carried between calls.

use crate::errors::{DSGEError, DSGEResult};
use crate::options::SimulationOptions;
use crate::solver::PolicyFunction;
use crate::steady_state::SteadyState;
use crate::utils::linear_algebra::covariance_factor;
use crate::FloatValue;
use log::debug;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Values of every variable over time.
///
/// Rows are periods and columns follow [`Trajectory::variables`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    variables: Vec<String>,
    values: Array2<FloatValue>,
}

impl Trajectory {
    pub fn new(variables: Vec<String>, values: Array2<FloatValue>) -> Self {
        Self { variables, values }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// `periods x variables`
    pub fn values(&self) -> &Array2<FloatValue> {
        &self.values
    }

    pub fn into_values(self) -> Array2<FloatValue> {
        self.values
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Path of a single variable.
    pub fn get(&self, name: &str) -> DSGEResult<ArrayView1<'_, FloatValue>> {
        let index = self
            .variables
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| DSGEError::UnknownVariable(name.to_string()))?;
        Ok(self.values.column(index))
    }

    /// Values of every variable in period `t`.
    pub fn at(&self, t: usize) -> Option<ArrayView1<'_, FloatValue>> {
        (t < self.len()).then(|| self.values.row(t))
    }

    /// Convert deviations from the steady state into levels.
    ///
    /// The steady state must list the same variables in the same order.
    pub fn to_levels(&self, steady_state: &SteadyState) -> DSGEResult<Trajectory> {
        if steady_state.variables() != self.variables() {
            return Err(DSGEError::VariableMismatch {
                expected: self.variables.clone(),
                got: steady_state.variables().to_vec(),
            });
        }
        let mut values = self.values.clone();
        for (mut column, level) in values.axis_iter_mut(Axis(1)).zip(steady_state.values()) {
            column += *level;
        }
        Ok(Trajectory::new(self.variables.clone(), values))
    }

    /// Sample mean of each variable.
    pub fn mean(&self) -> Vec<FloatValue> {
        self.values
            .mean_axis(Axis(0))
            .map(|m| m.to_vec())
            .unwrap_or_else(|| vec![FloatValue::NAN; self.variables.len()])
    }

    /// Sample covariance matrix (divisor `T - 1`).
    pub fn sample_covariance(&self) -> DMatrix<FloatValue> {
        let n = self.variables.len();
        let periods = self.len();
        if periods < 2 {
            return DMatrix::from_element(n, n, FloatValue::NAN);
        }
        let means = self.mean();
        let mut covariance = DMatrix::<FloatValue>::zeros(n, n);
        for row in self.values.rows() {
            for i in 0..n {
                let di = row[i] - means[i];
                for j in 0..=i {
                    covariance[(i, j)] += di * (row[j] - means[j]);
                }
            }
        }
        for i in 0..n {
            for j in 0..=i {
                let value = covariance[(i, j)] / (periods - 1) as FloatValue;
                covariance[(i, j)] = value;
                covariance[(j, i)] = value;
            }
        }
        covariance
    }
}

/// Response to a one-unit impulse in shock `shock` at period zero.
///
/// Returns `horizon` periods: row `h` is $P^h Q e_{shock}$.
pub fn impulse_response(
    policy: &PolicyFunction,
    shock: usize,
    horizon: usize,
) -> DSGEResult<Trajectory> {
    impulse_response_scaled(policy, shock, 1.0, horizon)
}

/// Response to an impulse of `size` (for example one standard deviation) in shock `shock`.
pub fn impulse_response_scaled(
    policy: &PolicyFunction,
    shock: usize,
    size: FloatValue,
    horizon: usize,
) -> DSGEResult<Trajectory> {
    if shock >= policy.n_shocks() {
        return Err(DSGEError::UnknownShock(format!("#{shock}")));
    }

    let n = policy.n_variables();
    let mut values = Array2::<FloatValue>::zeros((horizon, n));
    let mut state: DVector<FloatValue> = policy.impact().column(shock) * size;
    for (h, mut row) in values.rows_mut().into_iter().enumerate() {
        if h > 0 {
            state = policy.transition() * &state;
        }
        for (target, value) in row.iter_mut().zip(state.iter()) {
            *target = *value;
        }
    }

    Ok(Trajectory::new(policy.variables().to_vec(), values))
}

/// Simulate with i.i.d. normal shocks drawn with covariance `shock_covariance`.
///
/// `options.burn_in` periods are simulated first and dropped. The same seed always
/// gives the same path.
pub fn simulate(
    policy: &PolicyFunction,
    shock_covariance: &DMatrix<FloatValue>,
    options: &SimulationOptions,
) -> DSGEResult<Trajectory> {
    let k = policy.n_shocks();
    if shock_covariance.nrows() != k || shock_covariance.ncols() != k {
        return Err(DSGEError::InvalidShockCovariance(format!(
            "expected a {k}x{k} matrix, got {}x{}",
            shock_covariance.nrows(),
            shock_covariance.ncols()
        )));
    }

    let factor = covariance_factor(shock_covariance)?;
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let total = options.burn_in + options.periods;
    debug!(
        "Simulating {} periods ({} burn-in) with seed {}",
        total, options.burn_in, options.seed
    );

    let mut draws = Array2::<FloatValue>::zeros((total, k));
    for mut row in draws.rows_mut() {
        let z = DVector::<FloatValue>::from_fn(k, |_, _| StandardNormal.sample(&mut rng));
        let shocks = &factor * z;
        for (target, value) in row.iter_mut().zip(shocks.iter()) {
            *target = *value;
        }
    }

    let path = simulate_with_shocks(policy, draws.view())?;
    let kept = path.values.slice(ndarray::s![options.burn_in.., ..]).to_owned();
    Ok(Trajectory::new(path.variables, kept))
}

/// Simulate with a supplied shock path (`periods x n_shocks`), starting from the steady state.
pub fn simulate_with_shocks(
    policy: &PolicyFunction,
    shocks: ArrayView2<'_, FloatValue>,
) -> DSGEResult<Trajectory> {
    let k = policy.n_shocks();
    if shocks.ncols() != k {
        return Err(DSGEError::InvalidShockPath {
            expected: k,
            got: shocks.ncols(),
        });
    }

    let n = policy.n_variables();
    let mut values = Array2::<FloatValue>::zeros((shocks.nrows(), n));
    let mut state = DVector::<FloatValue>::zeros(n);
    for (shock_row, mut row) in shocks.rows().into_iter().zip(values.rows_mut()) {
        let epsilon = DVector::from_iterator(k, shock_row.iter().copied());
        state = policy.step(&state, &epsilon);
        for (target, value) in row.iter_mut().zip(state.iter()) {
            *target = *value;
        }
    }

    Ok(Trajectory::new(policy.variables().to_vec(), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use nalgebra::dmatrix;
    use ndarray::array;

    fn ar1(rho: FloatValue) -> PolicyFunction {
        PolicyFunction::new(
            dmatrix![rho],
            dmatrix![1.0],
            vec!["x".to_string()],
            vec!["e".to_string()],
        )
    }

    #[test]
    fn test_irf_powers() {
        let irf = impulse_response(&ar1(0.8), 0, 10).unwrap();
        assert_eq!(irf.len(), 10);
        for (h, value) in irf.get("x").unwrap().iter().enumerate() {
            assert!(is_close!(*value, 0.8f64.powi(h as i32)));
        }
    }

    #[test]
    fn test_irf_is_restartable() {
        let policy = ar1(0.5);
        let first = impulse_response(&policy, 0, 5).unwrap();
        let second = impulse_response(&policy, 0, 5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_irf_scaled_and_levels() {
        let irf = impulse_response_scaled(&ar1(0.5), 0, 2.0, 3).unwrap();
        assert_eq!(irf.values(), &array![[2.0], [1.0], [0.5]]);

        let steady_state = SteadyState::new(vec!["x".to_string()], vec![10.0], 0.0, 0);
        let levels = irf.to_levels(&steady_state).unwrap();
        assert_eq!(levels.values(), &array![[12.0], [11.0], [10.5]]);
    }

    #[test]
    fn test_levels_need_matching_variables() {
        let irf = impulse_response(&ar1(0.5), 0, 3).unwrap();
        let steady_state = SteadyState::new(
            vec!["x".to_string(), "y".to_string()],
            vec![10.0, 1.0],
            0.0,
            0,
        );
        assert!(matches!(
            irf.to_levels(&steady_state),
            Err(DSGEError::VariableMismatch { .. })
        ));

        let renamed = SteadyState::new(vec!["z".to_string()], vec![10.0], 0.0, 0);
        assert!(irf.to_levels(&renamed).is_err());
    }

    #[test]
    fn test_indefinite_covariance_is_rejected() {
        let policy = PolicyFunction::new(
            DMatrix::zeros(3, 3),
            DMatrix::identity(3, 3),
            ["x1", "x2", "x3"].map(String::from).to_vec(),
            ["e1", "e2", "e3"].map(String::from).to_vec(),
        );
        let covariance = dmatrix![
            1.0, 0.9, 0.9;
            0.9, 1.0, -0.9;
            0.9, -0.9, 1.0
        ];
        assert!(matches!(
            simulate(&policy, &covariance, &SimulationOptions::default()),
            Err(DSGEError::InvalidShockCovariance(_))
        ));
    }

    #[test]
    fn test_irf_unknown_shock() {
        assert!(matches!(
            impulse_response(&ar1(0.5), 1, 3),
            Err(DSGEError::UnknownShock(_))
        ));
    }

    #[test]
    fn test_shock_path() {
        let shocks = array![[1.0], [0.0], [1.0]];
        let path = simulate_with_shocks(&ar1(0.5), shocks.view()).unwrap();
        assert_eq!(path.values(), &array![[1.0], [0.5], [1.25]]);

        let wrong = array![[1.0, 2.0]];
        assert!(matches!(
            simulate_with_shocks(&ar1(0.5), wrong.view()),
            Err(DSGEError::InvalidShockPath {
                expected: 1,
                got: 2
            })
        ));
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let policy = ar1(0.9);
        let covariance = dmatrix![1.0];
        let options = SimulationOptions {
            periods: 200,
            burn_in: 50,
            seed: 42,
        };

        let first = simulate(&policy, &covariance, &options).unwrap();
        let second = simulate(&policy, &covariance, &options).unwrap();
        assert_eq!(first.len(), 200);
        assert_eq!(first, second);

        let other = simulate(
            &policy,
            &covariance,
            &SimulationOptions {
                seed: 7,
                ..options.clone()
            },
        )
        .unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_zero_variance_shock_is_silent() {
        let policy = ar1(0.9);
        let path = simulate(&policy, &dmatrix![0.0], &SimulationOptions::default()).unwrap();
        assert!(path.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_sample_covariance() {
        let trajectory = Trajectory::new(
            vec!["a".to_string(), "b".to_string()],
            array![[1.0, 2.0], [3.0, 6.0], [5.0, 10.0]],
        );
        assert_eq!(trajectory.mean(), vec![3.0, 6.0]);
        let covariance = trajectory.sample_covariance();
        assert_eq!(covariance, dmatrix![4.0, 8.0; 8.0, 16.0]);
    }
}
