//! Ordered Schur decomposition of the linearised model's matrix pencil.
//!
//! The second-order system $A y_{t+1} + B y_t + C y_{t-1} = 0$ is stacked into the
//! first-order pencil $F z_{t+1} = G z_t$ with $z_t = [y_{t-1}; y_t]$,
//!
//! $$ F = \begin{bmatrix} I & 0 \\ 0 & A \end{bmatrix}, \quad
//!    G = \begin{bmatrix} 0 & I \\ -C & -B \end{bmatrix}. $$
//!
//! Its generalized eigenvalues $G v = \lambda F v$ are found through the shifted and
//! inverted matrix $M = (G - \sigma F)^{-1} F$, whose eigenvalues are
//! $\mu = 1 / (\lambda - \sigma)$. Infinite $\lambda$ (a singular `A`) map to $\mu = 0$.
//! A complex Schur form of $M$ is reordered so that the stable $\lambda$ come first,
//! making the leading Schur vectors a basis of the stable deflating subspace.

use crate::errors::{DSGEError, DSGEResult};
use crate::linearize::LinearSystem;
use crate::utils::linear_algebra::{checked_lu, eigenvalues_2x2};
use crate::FloatValue;
use log::debug;
use nalgebra::linalg::Schur;
use nalgebra::DMatrix;
use num::complex::Complex64;
use num::Zero;

/// Candidate shifts, tried in order. None of them is a "nice" number, so they are
/// unlikely to coincide with an eigenvalue of a hand-written model.
const SHIFTS: [FloatValue; 5] = [
    0.618_033_988_749_895,
    -0.854_101_966_249_685,
    1.324_717_957_244_746,
    2.2,
    -1.9,
];

/// A shifted pencil whose smallest LU pivot is below this fraction of its largest
/// entry is treated as singular.
const SHIFT_PIVOT_TOLERANCE: FloatValue = 1e-13;

/// Eigenvalues of `M` below this modulus, relative to the largest, are infinite.
const INFINITE_TOLERANCE: FloatValue = 1e-11;

/// A generalized eigenvalue of the pencil.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneralizedEigenvalue {
    Finite(Complex64),
    Infinite,
}

impl GeneralizedEigenvalue {
    pub fn modulus(&self) -> FloatValue {
        match self {
            Self::Finite(value) => value.norm(),
            Self::Infinite => FloatValue::INFINITY,
        }
    }

    /// Complex value, with infinite eigenvalues reported as `inf + 0i`.
    pub fn value(&self) -> Complex64 {
        match self {
            Self::Finite(value) => *value,
            Self::Infinite => Complex64::new(FloatValue::INFINITY, 0.0),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }
}

/// Schur form `M = U T U^H` of the shifted, inverted pencil.
#[derive(Debug, Clone)]
pub(crate) struct PencilSchur {
    /// Unitary Schur vectors.
    pub u: DMatrix<Complex64>,
    /// Upper triangular.
    pub t: DMatrix<Complex64>,
    shift: FloatValue,
    infinite_threshold: FloatValue,
}

impl PencilSchur {
    /// Decompose the pencil of `system`.
    pub fn new(system: &LinearSystem) -> DSGEResult<Self> {
        let n = system.n_variables();
        let (f, g) = pencil(system);

        let (shift, shifted) = SHIFTS
            .iter()
            .map(|&sigma| (sigma, shift_quality(&(&g - &f * sigma))))
            .filter(|(_, quality)| *quality > SHIFT_PIVOT_TOLERANCE)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(sigma, _)| (sigma, &g - &f * sigma))
            .ok_or(DSGEError::SingularPencil)?;
        debug!("Shifting the pencil by {}", shift);

        let m = checked_lu(shifted)
            .and_then(|lu| lu.solve(&f))
            .ok_or(DSGEError::SingularPencil)?;

        let m = m.map(|v| Complex64::new(v, 0.0));
        let scale = m.iter().map(|v| v.norm()).fold(0.0, FloatValue::max);
        let schur = Schur::try_new(m, FloatValue::EPSILON, 1000 * 2 * n).ok_or_else(|| {
            DSGEError::DecompositionFailed(
                "Schur iteration on the shifted pencil did not converge".to_string(),
            )
        })?;
        let (u, t) = schur.unpack();

        let mut decomposition = Self {
            u,
            t,
            shift,
            infinite_threshold: INFINITE_TOLERANCE * scale.max(1.0),
        };
        decomposition.triangularize();
        Ok(decomposition)
    }

    pub fn dim(&self) -> usize {
        self.t.nrows()
    }

    /// Generalized eigenvalue held in diagonal position `k`.
    pub fn eigenvalue(&self, k: usize) -> GeneralizedEigenvalue {
        let mu = self.t[(k, k)];
        if mu.norm() <= self.infinite_threshold {
            GeneralizedEigenvalue::Infinite
        } else {
            GeneralizedEigenvalue::Finite(Complex64::new(self.shift, 0.0) + mu.inv())
        }
    }

    pub fn eigenvalues(&self) -> Vec<GeneralizedEigenvalue> {
        (0..self.dim()).map(|k| self.eigenvalue(k)).collect()
    }

    /// Move every eigenvalue selected by `keep` to the top left of `T`, preserving
    /// their relative order. Returns how many were selected.
    pub fn reorder<F>(&mut self, keep: F) -> usize
    where
        F: Fn(GeneralizedEigenvalue) -> bool,
    {
        let mut next = 0;
        for k in 0..self.dim() {
            if keep(self.eigenvalue(k)) {
                for j in (next..k).rev() {
                    self.swap(j);
                }
                next += 1;
            }
        }
        next
    }

    /// Exchange the diagonal entries `k` and `k + 1` with a Givens rotation.
    fn swap(&mut self, k: usize) {
        let m = self.dim();
        let t11 = self.t[(k, k)];
        let t22 = self.t[(k + 1, k + 1)];
        let (cs, sn) = givens(self.t[(k, k + 1)], t22 - t11);

        for j in (k + 2)..m {
            let x = self.t[(k, j)];
            let y = self.t[(k + 1, j)];
            self.t[(k, j)] = x * cs + sn * y;
            self.t[(k + 1, j)] = y * cs - sn.conj() * x;
        }
        for i in 0..k {
            let x = self.t[(i, k)];
            let y = self.t[(i, k + 1)];
            self.t[(i, k)] = x * cs + sn.conj() * y;
            self.t[(i, k + 1)] = y * cs - sn * x;
        }
        self.t[(k, k)] = t22;
        self.t[(k + 1, k + 1)] = t11;

        for i in 0..m {
            let x = self.u[(i, k)];
            let y = self.u[(i, k + 1)];
            self.u[(i, k)] = x * cs + sn.conj() * y;
            self.u[(i, k + 1)] = y * cs - sn * x;
        }
    }

    /// Reduce any 2x2 block left on the diagonal to triangular form.
    fn triangularize(&mut self) {
        let m = self.dim();
        for k in 0..m.saturating_sub(1) {
            let a = self.t[(k, k)];
            let b = self.t[(k, k + 1)];
            let c = self.t[(k + 1, k)];
            let d = self.t[(k + 1, k + 1)];
            if c.norm() <= FloatValue::EPSILON * (a.norm() + d.norm()) {
                self.t[(k + 1, k)] = Complex64::zero();
                continue;
            }

            // Unit eigenvector (v1, v2) of the block; the rotation maps it onto e1
            let (lambda, _) = eigenvalues_2x2(a, b, c, d);
            let (mut v1, mut v2) = (lambda - d, c);
            if v1.norm() + v2.norm() <= FloatValue::EPSILON * (a.norm() + d.norm()) {
                (v1, v2) = (b, lambda - a);
            }
            let norm = (v1.norm_sqr() + v2.norm_sqr()).sqrt();
            if norm == 0.0 {
                continue;
            }
            let (v1, v2) = (v1 / norm, v2 / norm);

            // Columns of the rotation are (v1, v2) and (-conj(v2), conj(v1))
            for j in 0..m {
                let x = self.t[(k, j)];
                let y = self.t[(k + 1, j)];
                self.t[(k, j)] = v1.conj() * x + v2.conj() * y;
                self.t[(k + 1, j)] = -v2 * x + v1 * y;
            }
            for i in 0..m {
                let x = self.t[(i, k)];
                let y = self.t[(i, k + 1)];
                self.t[(i, k)] = x * v1 + y * v2;
                self.t[(i, k + 1)] = -x * v2.conj() + y * v1.conj();
            }
            for i in 0..m {
                let x = self.u[(i, k)];
                let y = self.u[(i, k + 1)];
                self.u[(i, k)] = x * v1 + y * v2;
                self.u[(i, k + 1)] = -x * v2.conj() + y * v1.conj();
            }
            self.t[(k + 1, k)] = Complex64::zero();
        }
    }
}

/// The matrices `F` and `G` of the first-order pencil.
fn pencil(system: &LinearSystem) -> (DMatrix<FloatValue>, DMatrix<FloatValue>) {
    let n = system.n_variables();
    let mut f = DMatrix::<FloatValue>::zeros(2 * n, 2 * n);
    let mut g = DMatrix::<FloatValue>::zeros(2 * n, 2 * n);

    f.view_mut((0, 0), (n, n)).fill_with_identity();
    f.view_mut((n, n), (n, n)).copy_from(&system.a);

    g.view_mut((0, n), (n, n)).fill_with_identity();
    g.view_mut((n, 0), (n, n)).copy_from(&(-&system.c));
    g.view_mut((n, n), (n, n)).copy_from(&(-&system.b));

    (f, g)
}

/// Smallest LU pivot relative to the largest entry; zero for a singular matrix.
fn shift_quality(matrix: &DMatrix<FloatValue>) -> FloatValue {
    let scale = matrix.amax();
    if !(scale > 0.0) || !scale.is_finite() {
        return 0.0;
    }
    let lu = matrix.clone().lu();
    lu.u().diagonal().iter().map(|v| v.abs()).fold(FloatValue::INFINITY, FloatValue::min) / scale
}

/// Plane rotation `[cs sn; -conj(sn) cs]` with real `cs` mapping `(f, g)` onto `(r, 0)`.
fn givens(f: Complex64, g: Complex64) -> (FloatValue, Complex64) {
    if g.is_zero() {
        return (1.0, Complex64::zero());
    }
    if f.is_zero() {
        return (0.0, g.conj() / g.norm());
    }
    let f_norm = f.norm();
    let d = (f.norm_sqr() + g.norm_sqr()).sqrt();
    (f_norm / d, (f / f_norm) * g.conj() / d)
}
