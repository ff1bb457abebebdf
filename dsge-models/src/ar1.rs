//! A single AR(1) process around a constant mean.
//!
//! $$ x_t = (1 - \rho)\,\mu + \rho\,x_{t-1} + \varepsilon_t $$

use dsge_core::errors::DSGEResult;
use dsge_core::model::{Model, ModelDefinition};
use dsge_core::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AR1Parameters {
    pub rho: FloatValue,
    pub mean: FloatValue,
    /// Variance of the innovation
    pub variance: FloatValue,
}

impl Default for AR1Parameters {
    fn default() -> Self {
        Self {
            rho: 0.9,
            mean: 0.0,
            variance: 1.0,
        }
    }
}

pub fn definition(parameters: &AR1Parameters) -> ModelDefinition {
    ModelDefinition {
        variables: vec!["x".to_string()],
        shocks: vec!["e".to_string()],
        parameters: BTreeMap::from([
            ("rho".to_string(), parameters.rho),
            ("mu".to_string(), parameters.mean),
        ]),
        equations: vec!["x = (1 - rho)*mu + rho*x(-1) + e".to_string()],
        shock_variances: BTreeMap::from([("e".to_string(), parameters.variance)]),
        ..Default::default()
    }
}

pub fn steady_state(parameters: &AR1Parameters) -> Vec<FloatValue> {
    vec![parameters.mean]
}

pub fn model(parameters: &AR1Parameters) -> DSGEResult<Model> {
    definition(parameters).build()
}
