use num::complex::Complex64;
use thiserror::Error;

/// Errors raised while turning a model definition into a [`Model`](crate::model::Model).
///
/// These are structural problems and are reported at build time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelSpecError {
    #[error("Model must declare at least one endogenous variable")]
    NoVariables,
    #[error("Model has {equations} equation(s) for {variables} endogenous variable(s)")]
    EquationCountMismatch { equations: usize, variables: usize },
    #[error("Name '{0}' is declared more than once")]
    DuplicateName(String),
    #[error("Name '{0}' is reserved for a built-in function")]
    ReservedName(String),
    #[error("Undeclared identifier '{name}' in equation {equation}")]
    UndeclaredIdentifier { name: String, equation: usize },
    #[error("Unsupported offset {offset} on '{name}' in equation {equation}. Only -1, 0 and +1 are allowed for variables and 0 for shocks")]
    UnsupportedOffset {
        name: String,
        offset: i64,
        equation: usize,
    },
    #[error("Value supplied for '{0}', which is not a declared parameter")]
    UnknownParameter(String),
    #[error("Variable '{0}' does not appear in any equation")]
    UnusedVariable(String),
    #[error("Could not parse equation {equation}: {message}")]
    Parse { equation: usize, message: String },
}

/// Failure of the Newton iteration used to find the deterministic steady state.
///
/// Every variant carries the last iterate so that callers can inspect it and
/// retry from a different initial guess.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SteadyStateError {
    #[error("Initial guess has {got} values but the model has {expected} variables")]
    InitialGuessLength { expected: usize, got: usize },
    #[error("Singular Jacobian at iteration {iteration} (residual norm {residual_norm:e})")]
    SingularJacobian {
        iteration: usize,
        iterate: Vec<f64>,
        residual_norm: f64,
    },
    #[error("Newton iteration did not converge after {iterations} iterations (residual norm {residual_norm:e})")]
    NotConverged {
        iterations: usize,
        iterate: Vec<f64>,
        residual_norm: f64,
    },
    #[error("Non-finite residual or Jacobian at iteration {iteration}")]
    NonFinite { iteration: usize, iterate: Vec<f64> },
    #[error("Supplied steady state does not solve the static model (residual norm {residual_norm:e})")]
    NotASteadyState {
        residuals: Vec<f64>,
        residual_norm: f64,
    },
}

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum DSGEError {
    #[error(transparent)]
    ModelSpec(#[from] ModelSpecError),
    #[error(transparent)]
    SteadyState(#[from] SteadyStateError),
    #[error("Blanchard-Kahn condition violated: {explosive} explosive eigenvalue(s) for {jump_variables} jump variable(s). The model is indeterminate")]
    Indeterminacy {
        explosive: usize,
        jump_variables: usize,
        eigenvalues: Vec<Complex64>,
    },
    #[error("Blanchard-Kahn condition violated: {explosive} explosive eigenvalue(s) for {jump_variables} jump variable(s). No stable solution exists")]
    NoStableSolution {
        explosive: usize,
        jump_variables: usize,
        eigenvalues: Vec<Complex64>,
    },
    #[error("Rank condition failed: the stable subspace cannot be expressed in terms of the predetermined variables")]
    RankCondition { eigenvalues: Vec<Complex64> },
    #[error("The matrix pencil of the linearised model is singular")]
    SingularPencil,
    #[error("The contemporaneous impact matrix A*P + B is singular")]
    SingularImpact,
    #[error("Decomposition failed: {0}")]
    DecompositionFailed(String),
    #[error("Policy function is not stationary (spectral radius {spectral_radius})")]
    NotStationary { spectral_radius: f64 },
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("Unknown shock '{0}'")]
    UnknownShock(String),
    #[error("Shock path has {got} column(s) but the model has {expected} shock(s)")]
    InvalidShockPath { expected: usize, got: usize },
    #[error("Invalid shock covariance: {0}")]
    InvalidShockCovariance(String),
    #[error("Expected values for variables {expected:?}, got {got:?}")]
    VariableMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience type for `Result<T, DSGEError>`.
pub type DSGEResult<T> = Result<T, DSGEError>;
