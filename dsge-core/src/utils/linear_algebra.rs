//! Linear algebra utilities.

use crate::errors::{DSGEError, DSGEResult};
use crate::FloatValue;
use nalgebra::linalg::{Schur, SymmetricEigen, LU};
use nalgebra::{ComplexField, DMatrix, Dyn};
use ndarray::Array2;
use num::complex::Complex64;

/// Pivots smaller than this, after scaling rows and columns to unit maximum, are treated as zero.
const PIVOT_TOLERANCE: FloatValue = 1e-13;

/// Eigenvalues of a covariance below `-COVARIANCE_TOLERANCE` times its largest
/// eigenvalue mean the matrix is not positive semi-definite.
const COVARIANCE_TOLERANCE: FloatValue = 1e-10;

/// LU-factorise `matrix`, returning `None` if it is not square or numerically singular.
///
/// nalgebra's `LU::solve` only rejects exact zero pivots, which lets nearly singular
/// systems through with enormous solutions. Here the rows and then the columns of a
/// copy are scaled to a largest absolute entry of one, and a pivot of that copy counts
/// as zero if it is smaller than `PIVOT_TOLERANCE`. Badly scaled but regular systems
/// such as `diag(1e8, 1e-6)` are accepted.
///
/// # Example
/// ```
/// use dsge_core::utils::linear_algebra::checked_lu;
/// use nalgebra::{dmatrix, dvector};
///
/// let lu = checked_lu(dmatrix![2.0_f64, 1.0; 1.0, 3.0]).unwrap();
/// let x = lu.solve(&dvector![3.0_f64, 4.0]).unwrap();
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!((x[1] - 1.0).abs() < 1e-12);
///
/// assert!(checked_lu(dmatrix![1.0, 2.0; 2.0, 4.0]).is_none());
/// ```
pub fn checked_lu<T>(matrix: DMatrix<T>) -> Option<LU<T, Dyn, Dyn>>
where
    T: ComplexField<RealField = FloatValue>,
{
    if !matrix.is_square() {
        return None;
    }
    if matrix.is_empty() {
        return Some(matrix.lu());
    }

    let equilibrated = equilibrate(matrix.clone())?;
    let smallest_pivot = equilibrated
        .lu()
        .u()
        .diagonal()
        .iter()
        .map(|v| v.clone().modulus())
        .fold(FloatValue::INFINITY, FloatValue::min);

    if smallest_pivot <= PIVOT_TOLERANCE {
        None
    } else {
        Some(matrix.lu())
    }
}

/// Scale every row, then every column, to a largest absolute entry of one.
///
/// `None` if a row or column is zero or holds a non-finite value.
fn equilibrate<T>(mut matrix: DMatrix<T>) -> Option<DMatrix<T>>
where
    T: ComplexField<RealField = FloatValue>,
{
    let (rows, cols) = matrix.shape();
    for i in 0..rows {
        let scale = (0..cols)
            .map(|j| matrix[(i, j)].clone().modulus())
            .fold(0.0, FloatValue::max);
        if !(scale > 0.0) || !scale.is_finite() {
            return None;
        }
        for j in 0..cols {
            matrix[(i, j)] = matrix[(i, j)].clone().unscale(scale);
        }
    }
    for j in 0..cols {
        let scale = (0..rows)
            .map(|i| matrix[(i, j)].clone().modulus())
            .fold(0.0, FloatValue::max);
        if !(scale > 0.0) || !scale.is_finite() {
            return None;
        }
        for i in 0..rows {
            matrix[(i, j)] = matrix[(i, j)].clone().unscale(scale);
        }
    }
    Some(matrix)
}

/// Eigenvalues of a real square matrix, via a complex Schur decomposition.
pub fn eigenvalues(matrix: &DMatrix<FloatValue>) -> DSGEResult<Vec<Complex64>> {
    let n = matrix.nrows();
    if n == 0 {
        return Ok(vec![]);
    }
    let complex = matrix.map(|v| Complex64::new(v, 0.0));
    let schur = Schur::try_new(complex, FloatValue::EPSILON, 1000 * n).ok_or_else(|| {
        DSGEError::DecompositionFailed("Schur iteration did not converge".to_string())
    })?;
    let (_, t) = schur.unpack();

    let mut values: Vec<Complex64> = t.diagonal().iter().copied().collect();
    // Any unreduced 2x2 block still holds a valid pair of eigenvalues
    for k in 0..n.saturating_sub(1) {
        let scale = t[(k, k)].norm() + t[(k + 1, k + 1)].norm();
        if t[(k + 1, k)].norm() > FloatValue::EPSILON * scale {
            let (l1, l2) =
                eigenvalues_2x2(t[(k, k)], t[(k, k + 1)], t[(k + 1, k)], t[(k + 1, k + 1)]);
            values[k] = l1;
            values[k + 1] = l2;
        }
    }
    Ok(values)
}

/// Eigenvalues of the 2x2 matrix `[a b; c d]`.
pub(crate) fn eigenvalues_2x2(
    a: Complex64,
    b: Complex64,
    c: Complex64,
    d: Complex64,
) -> (Complex64, Complex64) {
    let half_trace = (a + d) * 0.5;
    let discriminant = ((a - d) * 0.5).powi(2) + b * c;
    let root = discriminant.sqrt();
    (half_trace + root, half_trace - root)
}

/// Largest eigenvalue modulus.
pub fn spectral_radius(matrix: &DMatrix<FloatValue>) -> DSGEResult<FloatValue> {
    Ok(eigenvalues(matrix)?
        .iter()
        .map(|l| l.norm())
        .fold(0.0, FloatValue::max))
}

/// Solve the discrete Lyapunov equation $\Sigma = A \Sigma A^T + W$ by doubling.
///
/// Each step adds the next $2^k$ terms of $\sum_j A^j W (A^T)^j$, so the number of
/// steps grows with the log of the persistence of `a`. `a` must have spectral radius below one.
pub fn lyapunov_doubling(
    a: &DMatrix<FloatValue>,
    w: &DMatrix<FloatValue>,
    tolerance: FloatValue,
    max_iterations: usize,
) -> DSGEResult<DMatrix<FloatValue>> {
    let mut sigma = w.clone();
    let mut power = a.clone();

    for _ in 0..max_iterations {
        let increment = &power * &sigma * power.transpose();
        sigma += &increment;
        power = &power * &power;

        let change = increment.amax();
        if !change.is_finite() {
            break;
        }
        if change <= tolerance * (1.0 + sigma.amax()) {
            return Ok(symmetrize(sigma));
        }
    }

    Err(DSGEError::DecompositionFailed(format!(
        "Lyapunov doubling did not converge in {} steps",
        max_iterations
    )))
}

/// Solve the discrete Lyapunov equation through the vectorised linear system
/// $(I - A \otimes A)\,\mathrm{vec}(\Sigma) = \mathrm{vec}(W)$.
///
/// The system has $n^2$ unknowns, so this is only practical for small models.
pub fn lyapunov_direct(
    a: &DMatrix<FloatValue>,
    w: &DMatrix<FloatValue>,
) -> DSGEResult<DMatrix<FloatValue>> {
    let n = a.nrows();
    let system = DMatrix::<FloatValue>::identity(n * n, n * n) - a.kronecker(a);
    let rhs = DMatrix::from_column_slice(n * n, 1, w.as_slice());

    let solution = checked_lu(system)
        .and_then(|lu| lu.solve(&rhs))
        .ok_or_else(|| {
            DSGEError::DecompositionFailed(
                "I - A (x) A is singular, the transition has a unit root".to_string(),
            )
        })?;

    Ok(symmetrize(DMatrix::from_column_slice(
        n,
        n,
        solution.as_slice(),
    )))
}

fn symmetrize(m: DMatrix<FloatValue>) -> DMatrix<FloatValue> {
    (&m + m.transpose()) * 0.5
}

/// A matrix `L` with `L * L^T = covariance`.
///
/// Diagonal covariances give the element-wise square root. Otherwise the Cholesky
/// factor is used, falling back to a symmetric eigendecomposition for covariances
/// that are only positive semi-definite. Matrices with a negative eigenvalue beyond
/// rounding are rejected with [`DSGEError::InvalidShockCovariance`].
pub fn covariance_factor(covariance: &DMatrix<FloatValue>) -> DSGEResult<DMatrix<FloatValue>> {
    let n = covariance.nrows();
    if covariance.ncols() != n {
        return Err(DSGEError::InvalidShockCovariance(format!(
            "expected a square matrix, got {}x{}",
            n,
            covariance.ncols()
        )));
    }
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(DSGEError::InvalidShockCovariance(
            "covariance has non-finite entries".to_string(),
        ));
    }
    if let Some(v) = covariance.diagonal().iter().find(|v| **v < 0.0) {
        return Err(DSGEError::InvalidShockCovariance(format!(
            "variances must be non-negative, got {v}"
        )));
    }

    let is_diagonal = (0..n).all(|i| (0..n).all(|j| i == j || covariance[(i, j)] == 0.0));
    if is_diagonal {
        return Ok(DMatrix::from_diagonal(&covariance.diagonal().map(|v| v.sqrt())));
    }

    if let Some(cholesky) = covariance.clone().cholesky() {
        return Ok(cholesky.l());
    }

    let eigen = SymmetricEigen::new(covariance.clone());
    let largest = eigen.eigenvalues.amax();
    let smallest = eigen.eigenvalues.min();
    if smallest < -COVARIANCE_TOLERANCE * largest {
        return Err(DSGEError::InvalidShockCovariance(format!(
            "covariance is not positive semi-definite (smallest eigenvalue {smallest:e})"
        )));
    }
    // Only rounding error is clipped here
    let roots = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    Ok(eigen.eigenvectors * DMatrix::from_diagonal(&roots))
}

/// Copy a nalgebra matrix into an ndarray array of the same shape.
pub fn to_array2(m: &DMatrix<FloatValue>) -> Array2<FloatValue> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn test_checked_lu_rejects_near_singular() {
        let nearly_singular = dmatrix![1.0, 1.0; 1.0, 1.0 + 1e-15];
        assert!(checked_lu(nearly_singular).is_none());
        assert!(checked_lu(DMatrix::<f64>::zeros(2, 2)).is_none());
        assert!(checked_lu(DMatrix::<f64>::zeros(2, 3)).is_none());

        let regular = dmatrix![1e-8, 0.0; 0.0, 2e-8];
        assert!(checked_lu(regular).is_some());
    }

    #[test]
    fn test_checked_lu_badly_scaled() {
        let rows = dmatrix![1e8, 0.0; 0.0, 1e-6];
        let lu = checked_lu(rows).unwrap();
        let x = lu.solve(&dvector![2e8, 3e-6]).unwrap();
        assert_relative_eq!(x, dvector![2.0, 3.0], epsilon = 1e-12);

        let columns = dmatrix![1e8, 1e-6; 1e8, 2e-6];
        assert!(checked_lu(columns).is_some());

        // Scaling does not rescue a singular matrix
        assert!(checked_lu(dmatrix![1e8, 2e8; 1e-6, 2e-6]).is_none());
        assert!(checked_lu(dmatrix![1e8, 0.0; 0.0, 0.0]).is_none());
    }

    #[test]
    fn test_checked_lu_complex() {
        let m = DMatrix::from_row_slice(
            2,
            2,
            &[
                Complex64::new(0.0, 1.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(0.0, 0.0),
            ],
        );
        let lu = checked_lu(m.clone()).unwrap();
        let b = DMatrix::from_element(2, 1, Complex64::new(1.0, 0.0));
        let x = lu.solve(&b).unwrap();
        let residual = m * x - b;
        assert!(residual.norm() < 1e-12);
    }

    #[test]
    fn test_eigenvalues_rotation() {
        // Rotation by 90 degrees scaled by 0.5 has eigenvalues +/- 0.5i
        let m = dmatrix![0.0, -0.5; 0.5, 0.0];
        let mut values = eigenvalues(&m).unwrap();
        values.sort_by(|a, b| a.im.total_cmp(&b.im));
        assert_relative_eq!(values[0].re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(values[0].im, -0.5, epsilon = 1e-12);
        assert_relative_eq!(values[1].im, 0.5, epsilon = 1e-12);
        assert_relative_eq!(spectral_radius(&m).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_lyapunov_scalar() {
        // sigma = rho^2 sigma + 1  =>  sigma = 1 / (1 - rho^2)
        let a = dmatrix![0.9];
        let w = dmatrix![1.0];
        let sigma = lyapunov_doubling(&a, &w, 1e-14, 100).unwrap();
        assert_relative_eq!(sigma[(0, 0)], 1.0 / (1.0 - 0.81), max_relative = 1e-10);
    }

    #[test]
    fn test_lyapunov_doubling_matches_direct() {
        let a = dmatrix![0.7, 0.2, 0.0; -0.1, 0.5, 0.3; 0.05, 0.0, 0.4];
        let w = dmatrix![1.0, 0.3, 0.0; 0.3, 0.5, 0.1; 0.0, 0.1, 0.2];

        let doubling = lyapunov_doubling(&a, &w, 1e-14, 100).unwrap();
        let direct = lyapunov_direct(&a, &w).unwrap();
        assert_relative_eq!(doubling, direct, epsilon = 1e-10);

        let residual = &a * &doubling * a.transpose() + &w - &doubling;
        assert!(residual.amax() < 1e-10, "residual {}", residual.amax());
    }

    #[test]
    fn test_lyapunov_unit_root_fails() {
        let a = dmatrix![1.0];
        let w = dmatrix![1.0];
        assert!(lyapunov_doubling(&a, &w, 1e-12, 20).is_err());
        assert!(lyapunov_direct(&a, &w).is_err());
    }

    #[test]
    fn test_covariance_factor() {
        let diagonal = dmatrix![4.0, 0.0; 0.0, 0.0];
        assert_eq!(covariance_factor(&diagonal).unwrap(), dmatrix![2.0, 0.0; 0.0, 0.0]);

        let correlated = dmatrix![1.0, 0.5; 0.5, 2.0];
        let l = covariance_factor(&correlated).unwrap();
        assert_relative_eq!(&l * l.transpose(), correlated, epsilon = 1e-12);

        // Perfectly correlated: only positive semi-definite
        let degenerate = dmatrix![1.0, 1.0; 1.0, 1.0];
        let l = covariance_factor(&degenerate).unwrap();
        assert_relative_eq!(&l * l.transpose(), degenerate, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_factor_rejects_indefinite() {
        // Every correlation is below one in absolute value, but the matrix has
        // eigenvalues 1.9, 1.9 and -0.8
        let indefinite = dmatrix![
            1.0, 0.9, 0.9;
            0.9, 1.0, -0.9;
            0.9, -0.9, 1.0
        ];
        assert!(matches!(
            covariance_factor(&indefinite),
            Err(DSGEError::InvalidShockCovariance(_))
        ));
        assert!(matches!(
            covariance_factor(&dmatrix![-1.0]),
            Err(DSGEError::InvalidShockCovariance(_))
        ));
    }

    #[test]
    fn test_to_array2() {
        let m = dmatrix![1.0, 2.0, 3.0; 4.0, 5.0, 6.0];
        let a = to_array2(&m);
        assert_eq!(a.shape(), &[2, 3]);
        assert_eq!(a[[1, 0]], 4.0);
        assert_eq!(a[[0, 2]], 3.0);
    }
}
