//! Theoretical (population) moments of the solved model.
//!
//! The unconditional covariance of $y_t$ solves the discrete Lyapunov equation
//!
//! $$ \Sigma = P \Sigma P^T + Q \Sigma_\varepsilon Q^T $$
//!
//! which has a unique solution when every eigenvalue of $P$ lies inside the unit
//! circle. Autocovariances follow as $\Gamma_k = P^k \Sigma$.

use crate::errors::{DSGEError, DSGEResult};
use crate::options::LyapunovOptions;
use crate::solver::PolicyFunction;
use crate::utils::linear_algebra::{covariance_factor, lyapunov_doubling, spectral_radius};
use crate::FloatValue;
use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Policies whose spectral radius is within this distance of 1 have no stationary distribution.
const STATIONARITY_MARGIN: FloatValue = 1e-10;

/// Second moments of the endogenous variables, in deviations from steady state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    variables: Vec<String>,
    shocks: Vec<String>,
    transition: DMatrix<FloatValue>,
    covariance: DMatrix<FloatValue>,
    variance_decomposition: DMatrix<FloatValue>,
}

impl Moments {
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn shocks(&self) -> &[String] {
        &self.shocks
    }

    /// Unconditional covariance matrix $\Sigma$.
    pub fn covariance(&self) -> &DMatrix<FloatValue> {
        &self.covariance
    }

    pub fn variance(&self, name: &str) -> DSGEResult<FloatValue> {
        let i = self.index(name)?;
        Ok(self.covariance[(i, i)])
    }

    pub fn std_devs(&self) -> Vec<FloatValue> {
        self.covariance
            .diagonal()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect()
    }

    /// Correlation matrix. Entries involving a variable with zero variance are NaN.
    pub fn correlation(&self) -> DMatrix<FloatValue> {
        let std_devs = self.std_devs();
        DMatrix::from_fn(self.covariance.nrows(), self.covariance.ncols(), |i, j| {
            let scale = std_devs[i] * std_devs[j];
            if scale > 0.0 {
                self.covariance[(i, j)] / scale
            } else {
                FloatValue::NAN
            }
        })
    }

    /// $\Gamma_k = E[y_t y_{t-k}^T] = P^k \Sigma$
    pub fn autocovariance(&self, lag: usize) -> DMatrix<FloatValue> {
        let mut gamma = self.covariance.clone();
        for _ in 0..lag {
            gamma = &self.transition * gamma;
        }
        gamma
    }

    /// Autocorrelation of every variable at lags `1..=max_lag`.
    ///
    /// Row `k - 1` holds lag `k`, columns follow [`Moments::variables`].
    pub fn autocorrelation(&self, max_lag: usize) -> DMatrix<FloatValue> {
        let n = self.variables.len();
        let mut result = DMatrix::<FloatValue>::zeros(max_lag, n);
        let mut gamma = self.covariance.clone();
        for k in 0..max_lag {
            gamma = &self.transition * gamma;
            for i in 0..n {
                let variance = self.covariance[(i, i)];
                result[(k, i)] = if variance > 0.0 {
                    gamma[(i, i)] / variance
                } else {
                    FloatValue::NAN
                };
            }
        }
        result
    }

    /// Share of each variable's variance due to each orthogonalised shock.
    ///
    /// `n_variables x n_shocks`; rows sum to one for variables with positive variance.
    /// Correlated shocks are orthogonalised with the Cholesky factor of their covariance,
    /// so the attribution depends on the shock ordering.
    pub fn variance_decomposition(&self) -> &DMatrix<FloatValue> {
        &self.variance_decomposition
    }

    fn index(&self, name: &str) -> DSGEResult<usize> {
        self.variables
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| DSGEError::UnknownVariable(name.to_string()))
    }
}

/// Compute the theoretical moments of `policy` under shocks with covariance `shock_covariance`.
pub fn theoretical_moments(
    policy: &PolicyFunction,
    shock_covariance: &DMatrix<FloatValue>,
    options: &LyapunovOptions,
) -> DSGEResult<Moments> {
    let p = policy.transition();
    let q = policy.impact();

    let radius = spectral_radius(p)?;
    if radius >= 1.0 - STATIONARITY_MARGIN {
        return Err(DSGEError::NotStationary {
            spectral_radius: radius,
        });
    }
    debug!("Spectral radius of the transition matrix: {}", radius);

    let w = q * shock_covariance * q.transpose();
    let covariance = lyapunov_doubling(p, &w, options.tolerance, options.max_iterations)?;

    let n = policy.n_variables();
    let k = policy.n_shocks();
    let factor = covariance_factor(shock_covariance)?;
    let mut variance_decomposition = DMatrix::<FloatValue>::zeros(n, k);
    for j in 0..k {
        let loading = q * factor.column(j);
        let w_j = &loading * loading.transpose();
        let partial = lyapunov_doubling(p, &w_j, options.tolerance, options.max_iterations)?;
        for i in 0..n {
            let total = covariance[(i, i)];
            variance_decomposition[(i, j)] = if total > 0.0 {
                partial[(i, i)] / total
            } else {
                FloatValue::NAN
            };
        }
    }

    Ok(Moments {
        variables: policy.variables().to_vec(),
        shocks: policy.shocks().to_vec(),
        transition: p.clone(),
        covariance,
        variance_decomposition,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::linear_algebra::lyapunov_direct;
    use approx::assert_relative_eq;
    use nalgebra::dmatrix;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn ar1(rho: FloatValue) -> PolicyFunction {
        PolicyFunction::new(dmatrix![rho], dmatrix![1.0], names("x", 1), names("e", 1))
    }

    #[test]
    fn test_ar1_moments() {
        let policy = ar1(0.5);
        let moments =
            theoretical_moments(&policy, &dmatrix![2.0], &LyapunovOptions::default()).unwrap();

        assert_relative_eq!(moments.variance("x0").unwrap(), 2.0 / 0.75, epsilon = 1e-10);
        assert_relative_eq!(moments.autocorrelation(3)[(2, 0)], 0.125, epsilon = 1e-10);
        assert_relative_eq!(moments.autocovariance(1)[(0, 0)], 1.0 / 0.75, epsilon = 1e-10);
        assert_relative_eq!(moments.variance_decomposition()[(0, 0)], 1.0, epsilon = 1e-10);
        assert!(moments.variance("y").is_err());
    }

    #[test]
    fn test_matches_direct_solution() {
        let p = dmatrix![0.6, 0.1, 0.0; 0.2, 0.3, 0.0; 0.5, 0.0, 0.0];
        let q = dmatrix![1.0, 0.0; 0.0, 1.0; 0.3, -0.2];
        let shock_covariance = dmatrix![1.0, 0.2; 0.2, 0.5];
        let policy = PolicyFunction::new(p.clone(), q.clone(), names("y", 3), names("e", 2));

        let moments =
            theoretical_moments(&policy, &shock_covariance, &LyapunovOptions::default()).unwrap();
        let direct = lyapunov_direct(&p, &(&q * &shock_covariance * q.transpose())).unwrap();
        assert_relative_eq!(moments.covariance().clone(), direct, epsilon = 1e-10);

        let correlation = moments.correlation();
        for i in 0..3 {
            assert_relative_eq!(correlation[(i, i)], 1.0, epsilon = 1e-12);
        }

        for i in 0..3 {
            let total: FloatValue = moments.variance_decomposition().row(i).sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_equal_shocks_split_variance() {
        // x = 0.5 x(-1) + e0 + e1 with independent unit shocks
        let policy = PolicyFunction::new(
            dmatrix![0.5],
            dmatrix![1.0, 1.0],
            names("x", 1),
            names("e", 2),
        );
        let moments = theoretical_moments(
            &policy,
            &DMatrix::identity(2, 2),
            &LyapunovOptions::default(),
        )
        .unwrap();
        assert_relative_eq!(moments.variance_decomposition()[(0, 0)], 0.5, epsilon = 1e-10);
        assert_relative_eq!(moments.variance_decomposition()[(0, 1)], 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_unit_root_is_not_stationary() {
        let policy = ar1(1.0);
        let err = theoretical_moments(&policy, &dmatrix![1.0], &LyapunovOptions::default())
            .unwrap_err();
        assert!(matches!(err, DSGEError::NotStationary { .. }));
    }

    #[test]
    fn test_zero_variance_variable() {
        // y has no dynamics and no shock loading
        let policy = PolicyFunction::new(
            dmatrix![0.5, 0.0; 0.0, 0.0],
            dmatrix![1.0; 0.0],
            names("y", 2),
            names("e", 1),
        );
        let moments =
            theoretical_moments(&policy, &dmatrix![1.0], &LyapunovOptions::default()).unwrap();
        assert_eq!(moments.std_devs()[1], 0.0);
        assert!(moments.correlation()[(0, 1)].is_nan());
        assert!(moments.variance_decomposition()[(1, 0)].is_nan());
    }
}
