//! Stochastic growth (RBC) model with log utility and inelastic labour.
//!
//! `k` is capital at the end of the period, so production uses `k(-1)`:
//!
//! $$ \frac{1}{c_t} = \beta\,E_t\!\left[\frac{1}{c_{t+1}}\left(\alpha e^{a_{t+1}} k_t^{\alpha-1} + 1 - \delta\right)\right] $$
//! $$ y_t = e^{a_t} k_{t-1}^\alpha $$
//! $$ k_t = y_t - c_t + (1 - \delta)\,k_{t-1} $$
//! $$ a_t = \rho\,a_{t-1} + \varepsilon_t $$

use dsge_core::errors::DSGEResult;
use dsge_core::model::{Model, ModelDefinition};
use dsge_core::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RBCParameters {
    /// Capital share
    pub alpha: FloatValue,
    pub beta: FloatValue,
    pub delta: FloatValue,
    pub rho: FloatValue,
    /// Standard deviation of the technology innovation
    pub sigma: FloatValue,
}

impl Default for RBCParameters {
    fn default() -> Self {
        Self {
            alpha: 0.36,
            beta: 0.99,
            delta: 0.025,
            rho: 0.95,
            sigma: 0.01,
        }
    }
}

pub fn definition(parameters: &RBCParameters) -> ModelDefinition {
    let p = parameters;
    // Close enough to the steady state for Newton to converge without help
    let guess = steady_state(p);
    ModelDefinition {
        variables: ["c", "k", "y", "a"].map(String::from).to_vec(),
        shocks: vec!["e".to_string()],
        parameters: BTreeMap::from([
            ("alpha".to_string(), p.alpha),
            ("beta".to_string(), p.beta),
            ("delta".to_string(), p.delta),
            ("rho".to_string(), p.rho),
        ]),
        equations: vec![
            "1/c = beta*(1/c(+1))*(alpha*exp(a(+1))*k^(alpha - 1) + 1 - delta)".to_string(),
            "y = exp(a)*k(-1)^alpha".to_string(),
            "k = y - c + (1 - delta)*k(-1)".to_string(),
            "a = rho*a(-1) + e".to_string(),
        ],
        initial_values: BTreeMap::from([
            ("c".to_string(), 0.9 * guess[0]),
            ("k".to_string(), 0.9 * guess[1]),
            ("y".to_string(), 0.9 * guess[2]),
        ]),
        shock_variances: BTreeMap::from([("e".to_string(), p.sigma * p.sigma)]),
        ..Default::default()
    }
}

/// `[c, k, y, a]` in closed form.
pub fn steady_state(parameters: &RBCParameters) -> Vec<FloatValue> {
    let RBCParameters {
        alpha, beta, delta, ..
    } = *parameters;
    let k = (alpha / (1.0 / beta - 1.0 + delta)).powf(1.0 / (1.0 - alpha));
    let y = k.powf(alpha);
    let c = y - delta * k;
    vec![c, k, y, 0.0]
}

pub fn model(parameters: &RBCParameters) -> DSGEResult<Model> {
    definition(parameters).build()
}
