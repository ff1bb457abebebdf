//! Declarative model definitions.
//!
//! A [`ModelDefinition`] holds the same information as a chain of [`ModelBuilder`]
//! calls in a serde-friendly form, so models can be kept in TOML files:
//!
//! ```toml
//! variables = ["x"]
//! shocks = ["e"]
//! equations = ["x = rho*x(-1) + e"]
//!
//! [parameters]
//! rho = 0.9
//!
//! [shock_variances]
//! e = 0.01
//! ```

use crate::errors::{DSGEError, DSGEResult};
use crate::options::SolverOptions;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::builder::ModelBuilder;
use super::runtime::Model;

/// Covariance between two distinct shocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockCovariance {
    pub first: String,
    pub second: String,
    pub value: FloatValue,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDefinition {
    /// Endogenous variables, in order
    pub variables: Vec<String>,
    /// Exogenous shocks, in order
    #[serde(default)]
    pub shocks: Vec<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, FloatValue>,
    pub equations: Vec<String>,
    /// Starting point for the steady-state search. Missing variables start at zero.
    #[serde(default)]
    pub initial_values: BTreeMap<String, FloatValue>,
    /// Missing shocks have unit variance.
    #[serde(default)]
    pub shock_variances: BTreeMap<String, FloatValue>,
    #[serde(default)]
    pub shock_covariances: Vec<ShockCovariance>,
    #[serde(default)]
    pub options: SolverOptions,
}

impl ModelDefinition {
    pub fn from_toml_str(content: &str) -> DSGEResult<Self> {
        toml::from_str(content).map_err(|e| DSGEError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> DSGEResult<String> {
        toml::to_string(self).map_err(|e| DSGEError::Config(e.to_string()))
    }

    /// A builder preloaded with this definition, for further changes.
    pub fn to_builder(&self) -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        builder
            .with_variables(self.variables.iter().cloned())
            .with_shocks(self.shocks.iter().cloned())
            .with_parameters(self.parameters.iter().map(|(k, v)| (k.as_str(), *v)))
            .with_equations(self.equations.iter().cloned())
            .with_options(self.options.clone());

        for (name, value) in self.initial_values.iter() {
            builder.with_initial_value(name, *value);
        }
        for (name, variance) in self.shock_variances.iter() {
            builder.with_shock_variance(name, *variance);
        }
        for covariance in self.shock_covariances.iter() {
            builder.with_shock_covariance(&covariance.first, &covariance.second, covariance.value);
        }
        builder
    }

    pub fn build(&self) -> DSGEResult<Model> {
        self.to_builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ModelSpecError;

    const AR1: &str = r#"
variables = ["x"]
shocks = ["e"]
equations = ["x = rho*x(-1) + e"]

[parameters]
rho = 0.9

[shock_variances]
e = 0.25

[options.steady_state]
max_iterations = 10
"#;

    #[test]
    fn test_from_toml() {
        let definition = ModelDefinition::from_toml_str(AR1).unwrap();
        assert_eq!(definition.variables, vec!["x"]);
        assert_eq!(definition.parameters["rho"], 0.9);
        assert_eq!(definition.options.steady_state.max_iterations, 10);
        assert_eq!(definition.options.steady_state.tolerance, 1e-8);

        let model = definition.build().unwrap();
        assert_eq!(model.parameter("rho"), Some(0.9));
        assert_eq!(model.shock_covariance()[(0, 0)], 0.25);
        assert_eq!(model.options().steady_state.max_iterations, 10);
    }

    #[test]
    fn test_toml_round_trip() {
        let definition = ModelDefinition::from_toml_str(AR1).unwrap();
        let serialised = definition.to_toml_string().unwrap();
        let restored = ModelDefinition::from_toml_str(&serialised).unwrap();
        assert_eq!(definition, restored);
    }

    #[test]
    fn test_unknown_field() {
        let err = ModelDefinition::from_toml_str("variables = []\nequations = []\nvars = []")
            .unwrap_err();
        assert!(matches!(err, DSGEError::Config(_)));
    }

    #[test]
    fn test_invalid_definition_fails_at_build() {
        let definition = ModelDefinition {
            variables: vec!["x".to_string(), "y".to_string()],
            equations: vec!["x = 1".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            definition.build(),
            Err(DSGEError::ModelSpec(
                ModelSpecError::EquationCountMismatch { .. }
            ))
        ));
    }

    #[test]
    fn test_json() {
        let json = r#"{"variables": ["x"], "equations": ["x = 2"]}"#;
        let definition: ModelDefinition = serde_json::from_str(json).unwrap();
        assert!(definition.shocks.is_empty());
        let model = definition.build().unwrap();
        assert_eq!(model.n_shocks(), 0);
    }
}
