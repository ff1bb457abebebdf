//! Model builder for constructing models from equation strings.

use crate::errors::{DSGEError, DSGEResult, ModelSpecError};
use crate::options::SolverOptions;
use crate::symbolic::{Equation, NameKind, SymbolTable};
use crate::utils::linear_algebra::covariance_factor;
use crate::FloatValue;
use log::debug;
use nalgebra::DMatrix;
use std::collections::HashMap;

use super::runtime::Model;
use super::validation::{report_unused_shocks, verify_dimensions, verify_variables_used};

/// Build a new model from declared names, parameter values and equations.
///
/// The builder only collects inputs. All checks happen in [`ModelBuilder::build`],
/// which parses every equation once and fails with a
/// [`ModelSpecError`] if the definition is malformed.
///
/// ```
/// use dsge_core::model::ModelBuilder;
///
/// let model = ModelBuilder::new()
///     .with_variables(["x"])
///     .with_shocks(["e"])
///     .with_parameter("rho", 0.9)
///     .with_equation("x = rho*x(-1) + e")
///     .build()
///     .unwrap();
/// assert_eq!(model.variables(), &["x".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    variables: Vec<String>,
    shocks: Vec<String>,
    parameters: Vec<(String, FloatValue)>,
    equations: Vec<String>,
    initial_values: HashMap<String, FloatValue>,
    shock_variances: HashMap<String, FloatValue>,
    shock_covariances: Vec<(String, String, FloatValue)>,
    options: SolverOptions,
}

impl ModelBuilder {
    /// Create a new model builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare endogenous variables, in order.
    ///
    /// The order is the one used by every vector and matrix the model produces.
    pub fn with_variables<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare exogenous shocks, in order.
    pub fn with_shocks<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shocks.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set the value of a parameter. Setting the same parameter twice keeps the last value.
    pub fn with_parameter(&mut self, name: &str, value: FloatValue) -> &mut Self {
        match self.parameters.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value,
            None => self.parameters.push((name.to_string(), value)),
        }
        self
    }

    pub fn with_parameters<I, S>(&mut self, parameters: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, FloatValue)>,
        S: AsRef<str>,
    {
        for (name, value) in parameters {
            self.with_parameter(name.as_ref(), value);
        }
        self
    }

    /// Add an equation. Equations are matched to variables by count only,
    /// not by position.
    pub fn with_equation(&mut self, equation: &str) -> &mut Self {
        self.equations.push(equation.to_string());
        self
    }

    pub fn with_equations<I, S>(&mut self, equations: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.equations.extend(equations.into_iter().map(Into::into));
        self
    }

    /// Starting point used for the steady-state search when none is given explicitly.
    ///
    /// Variables without an initial value start at zero.
    pub fn with_initial_value(&mut self, name: &str, value: FloatValue) -> &mut Self {
        self.initial_values.insert(name.to_string(), value);
        self
    }

    pub fn with_initial_values(
        &mut self,
        initial_values: HashMap<String, FloatValue>,
    ) -> &mut Self {
        for (name, value) in initial_values.into_iter() {
            self.initial_values.insert(name, value);
        }
        self
    }

    /// Variance of a shock. Shocks without a variance have unit variance.
    pub fn with_shock_variance(&mut self, name: &str, variance: FloatValue) -> &mut Self {
        self.shock_variances.insert(name.to_string(), variance);
        self
    }

    /// Covariance between two distinct shocks.
    pub fn with_shock_covariance(
        &mut self,
        first: &str,
        second: &str,
        covariance: FloatValue,
    ) -> &mut Self {
        self.shock_covariances
            .push((first.to_string(), second.to_string(), covariance));
        self
    }

    pub fn with_options(&mut self, options: SolverOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Parse and validate the model.
    pub fn build(&self) -> DSGEResult<Model> {
        verify_dimensions(self.variables.len(), self.equations.len())?;

        let equations = parse_equations(
            &self.variables,
            &self.shocks,
            &self.parameters,
            &self.equations,
        )?;

        verify_variables_used(&self.variables, &equations)?;
        report_unused_shocks(&self.shocks, &equations);

        let initial_values = self.initial_value_vector()?;
        let shock_covariance = self.shock_covariance_matrix()?;

        debug!(
            "Built model with {} variables, {} shocks and {} parameters",
            self.variables.len(),
            self.shocks.len(),
            self.parameters.len()
        );

        Ok(Model::new(
            self.variables.clone(),
            self.shocks.clone(),
            self.parameters.clone(),
            equations,
            initial_values,
            shock_covariance,
            self.options.clone(),
        ))
    }

    fn initial_value_vector(&self) -> DSGEResult<Vec<FloatValue>> {
        let mut values = vec![0.0; self.variables.len()];
        for (name, value) in self.initial_values.iter() {
            let index = self
                .variables
                .iter()
                .position(|v| v == name)
                .ok_or_else(|| DSGEError::UnknownVariable(name.clone()))?;
            values[index] = *value;
        }
        Ok(values)
    }

    fn shock_index(&self, name: &str) -> DSGEResult<usize> {
        self.shocks
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| DSGEError::UnknownShock(name.to_string()))
    }

    fn shock_covariance_matrix(&self) -> DSGEResult<DMatrix<FloatValue>> {
        let n = self.shocks.len();
        let mut covariance = DMatrix::<FloatValue>::identity(n, n);

        for (name, variance) in self.shock_variances.iter() {
            let i = self.shock_index(name)?;
            if !variance.is_finite() || *variance < 0.0 {
                return Err(DSGEError::InvalidShockCovariance(format!(
                    "variance of '{name}' must be finite and non-negative, got {variance}"
                )));
            }
            covariance[(i, i)] = *variance;
        }

        for (first, second, value) in self.shock_covariances.iter() {
            let i = self.shock_index(first)?;
            let j = self.shock_index(second)?;
            if i == j {
                return Err(DSGEError::InvalidShockCovariance(format!(
                    "use a variance rather than a covariance for '{first}' with itself"
                )));
            }
            covariance[(i, j)] = *value;
            covariance[(j, i)] = *value;
        }

        for i in 0..n {
            for j in 0..i {
                let bound = (covariance[(i, i)] * covariance[(j, j)]).sqrt();
                if covariance[(i, j)].abs() > bound * (1.0 + 1e-12) {
                    return Err(DSGEError::InvalidShockCovariance(format!(
                        "covariance of '{}' and '{}' exceeds the product of their standard deviations",
                        self.shocks[i], self.shocks[j]
                    )));
                }
            }
        }

        // Pairwise bounds do not rule out a negative variance for a combination of shocks
        covariance_factor(&covariance)?;

        Ok(covariance)
    }
}

/// Resolve every name and parse each equation once.
///
/// Parameter values are folded into the expression trees, so a change of parameters
/// means parsing again.
pub(super) fn parse_equations(
    variables: &[String],
    shocks: &[String],
    parameters: &[(String, FloatValue)],
    sources: &[String],
) -> Result<Vec<Equation>, ModelSpecError> {
    let mut table = SymbolTable::default();
    for (i, name) in variables.iter().enumerate() {
        table.insert(name, NameKind::Variable(i))?;
    }
    for (i, name) in shocks.iter().enumerate() {
        table.insert(name, NameKind::Shock(i))?;
    }
    for (name, value) in parameters.iter() {
        table.insert(name, NameKind::Parameter(*value))?;
    }

    sources
        .iter()
        .enumerate()
        .map(|(i, source)| Equation::parse(source, i, &table))
        .collect()
}
