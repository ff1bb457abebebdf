//! Stability classification and the Blanchard-Kahn order condition.

use super::schur::GeneralizedEigenvalue;
use crate::errors::{DSGEError, DSGEResult};
use crate::options::StabilityOptions;
use crate::FloatValue;
use log::{debug, warn};
use num::complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Stable,
    /// Within the boundary tolerance of the unit circle. Counted as stable.
    Boundary,
    Unstable,
}

impl Stability {
    pub fn is_stable(&self) -> bool {
        !matches!(self, Stability::Unstable)
    }
}

pub fn classify(eigenvalue: GeneralizedEigenvalue, options: &StabilityOptions) -> Stability {
    let modulus = eigenvalue.modulus();
    if modulus < 1.0 - options.boundary_tolerance {
        Stability::Stable
    } else if modulus <= 1.0 + options.boundary_tolerance {
        Stability::Boundary
    } else {
        Stability::Unstable
    }
}

/// A generalized eigenvalue too close to the unit circle to classify reliably.
///
/// Raised alongside a solution, never instead of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEigenvalueWarning {
    pub eigenvalue: Complex64,
    pub modulus: FloatValue,
    /// The classification that was used.
    pub classified_stable: bool,
}

impl fmt::Display for BoundaryEigenvalueWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Eigenvalue {:.6}{:+.6}i has modulus {:.9}, within tolerance of the unit circle; classified as {}",
            self.eigenvalue.re,
            self.eigenvalue.im,
            self.modulus,
            if self.classified_stable { "stable" } else { "unstable" }
        )
    }
}

/// Eigenvalue counts of the pencil.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverDiagnostics {
    /// Generalized eigenvalues sorted by modulus. Infinite eigenvalues are `inf + 0i`.
    pub eigenvalues: Vec<Complex64>,
    pub n_stable: usize,
    /// Finite eigenvalues outside the unit circle.
    pub n_explosive: usize,
    pub n_infinite: usize,
    /// Forward-looking dimensions of the model: variables minus infinite eigenvalues.
    pub n_jump: usize,
    /// Variables appearing with a lag.
    pub n_predetermined: usize,
}

impl SolverDiagnostics {
    pub(crate) fn new(
        eigenvalues: &[GeneralizedEigenvalue],
        options: &StabilityOptions,
        n_variables: usize,
        n_predetermined: usize,
    ) -> Self {
        let n_stable = eigenvalues
            .iter()
            .filter(|v| classify(**v, options).is_stable())
            .count();
        let n_infinite = eigenvalues.iter().filter(|v| v.is_infinite()).count();
        let n_explosive = eigenvalues.len() - n_stable - n_infinite;

        let mut sorted: Vec<Complex64> = eigenvalues.iter().map(|v| v.value()).collect();
        sorted.sort_by(|a, b| a.norm().total_cmp(&b.norm()));

        Self {
            eigenvalues: sorted,
            n_stable,
            n_explosive,
            n_infinite,
            n_jump: n_variables.saturating_sub(n_infinite),
            n_predetermined,
        }
    }

    /// Unique stable solution requires exactly as many explosive eigenvalues as
    /// jump variables, i.e. as many stable eigenvalues as variables.
    pub(crate) fn check_order_condition(&self, n_variables: usize) -> DSGEResult<()> {
        debug!(
            "{} stable, {} explosive and {} infinite eigenvalue(s) for {} jump variable(s)",
            self.n_stable, self.n_explosive, self.n_infinite, self.n_jump
        );

        if self.n_stable > n_variables {
            Err(DSGEError::Indeterminacy {
                explosive: self.n_explosive,
                jump_variables: self.n_jump,
                eigenvalues: self.eigenvalues.clone(),
            })
        } else if self.n_stable < n_variables {
            Err(DSGEError::NoStableSolution {
                explosive: self.n_explosive,
                jump_variables: self.n_jump,
                eigenvalues: self.eigenvalues.clone(),
            })
        } else {
            Ok(())
        }
    }
}

/// Collect (and log) a warning for every eigenvalue on the boundary.
pub(crate) fn boundary_warnings(
    eigenvalues: &[GeneralizedEigenvalue],
    options: &StabilityOptions,
) -> Vec<BoundaryEigenvalueWarning> {
    eigenvalues
        .iter()
        .filter(|v| classify(**v, options) == Stability::Boundary)
        .map(|v| {
            let warning = BoundaryEigenvalueWarning {
                eigenvalue: v.value(),
                modulus: v.modulus(),
                classified_stable: true,
            };
            warn!("{}", warning);
            warning
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finite(re: FloatValue, im: FloatValue) -> GeneralizedEigenvalue {
        GeneralizedEigenvalue::Finite(Complex64::new(re, im))
    }

    #[test]
    fn test_classify() {
        let options = StabilityOptions::default();
        assert_eq!(classify(finite(0.99, 0.0), &options), Stability::Stable);
        assert_eq!(classify(finite(0.0, -1.0), &options), Stability::Boundary);
        assert_eq!(
            classify(finite(1.0 + 1e-7, 0.0), &options),
            Stability::Boundary
        );
        assert_eq!(classify(finite(1.01, 0.0), &options), Stability::Unstable);
        assert_eq!(
            classify(GeneralizedEigenvalue::Infinite, &options),
            Stability::Unstable
        );

        let loose = StabilityOptions {
            boundary_tolerance: 0.05,
        };
        assert_eq!(classify(finite(0.97, 0.0), &loose), Stability::Boundary);
    }

    #[test]
    fn test_diagnostics_counts() {
        let options = StabilityOptions::default();
        let eigenvalues = vec![
            finite(1.5, 0.0),
            GeneralizedEigenvalue::Infinite,
            finite(0.2, 0.3),
            finite(0.2, -0.3),
        ];
        let diagnostics = SolverDiagnostics::new(&eigenvalues, &options, 2, 1);

        assert_eq!(diagnostics.n_stable, 2);
        assert_eq!(diagnostics.n_explosive, 1);
        assert_eq!(diagnostics.n_infinite, 1);
        assert_eq!(diagnostics.n_jump, 1);
        assert!(diagnostics.eigenvalues[3].re.is_infinite());
        assert!((diagnostics.eigenvalues[2].re - 1.5).abs() < 1e-15);
        assert!(diagnostics.check_order_condition(2).is_ok());

        match diagnostics.check_order_condition(3) {
            Err(DSGEError::NoStableSolution {
                explosive,
                jump_variables,
                eigenvalues,
            }) => {
                assert_eq!(explosive, 1);
                assert_eq!(jump_variables, 1);
                assert_eq!(eigenvalues.len(), 4);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(
            diagnostics.check_order_condition(1),
            Err(DSGEError::Indeterminacy { .. })
        ));
    }

    #[test]
    fn test_boundary_warnings() {
        let options = StabilityOptions::default();
        let eigenvalues = vec![finite(0.5, 0.0), finite(1.0, 0.0), finite(2.0, 0.0)];
        let warnings = boundary_warnings(&eigenvalues, &options);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].modulus, 1.0);
        assert!(warnings[0].classified_stable);
        assert!(warnings[0].to_string().contains("stable"));
    }
}
