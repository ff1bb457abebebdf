//! The three-equation New Keynesian model with a technology shock.
//!
//! Variables are the output gap `x`, inflation `pi`, the nominal interest rate `i`
//! (in levels, so its steady state is the natural rate $1/\beta - 1$) and log
//! technology `a`:
//!
//! $$ x_t = E_t x_{t+1} - \tfrac{1}{\sigma}\left(i_t - E_t \pi_{t+1} - \bar r - r^n_t\right) $$
//! $$ \pi_t = \beta\,E_t \pi_{t+1} + \kappa\,x_t $$
//! $$ i_t = \bar r + \phi_\pi \pi_t + \phi_x x_t + v_t $$
//! $$ a_t = \rho_a a_{t-1} + \varepsilon^a_t $$
//!
//! with natural rate deviation $r^n_t = \sigma \psi (\rho_a - 1) a_t$.
//!
//! The model is determinate when the Taylor principle holds,
//! $\kappa(\phi_\pi - 1) + (1 - \beta)\phi_x > 0$.

use dsge_core::errors::DSGEResult;
use dsge_core::model::{Model, ModelDefinition};
use dsge_core::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewKeynesianParameters {
    /// Discount factor
    pub beta: FloatValue,
    /// Inverse intertemporal elasticity of substitution
    pub sigma: FloatValue,
    /// Slope of the Phillips curve
    pub kappa: FloatValue,
    /// Response of the natural rate to technology
    pub psi: FloatValue,
    pub phi_pi: FloatValue,
    pub phi_x: FloatValue,
    pub rho_a: FloatValue,
    pub sigma_a: FloatValue,
    pub sigma_v: FloatValue,
}

impl Default for NewKeynesianParameters {
    fn default() -> Self {
        Self {
            beta: 0.99,
            sigma: 1.0,
            kappa: 0.1,
            psi: 1.0,
            phi_pi: 1.5,
            phi_x: 0.125,
            rho_a: 0.9,
            sigma_a: 0.01,
            sigma_v: 0.0025,
        }
    }
}

impl NewKeynesianParameters {
    /// Whether the Taylor principle holds.
    pub fn is_determinate(&self) -> bool {
        self.kappa * (self.phi_pi - 1.0) + (1.0 - self.beta) * self.phi_x > 0.0
    }
}

pub fn definition(parameters: &NewKeynesianParameters) -> ModelDefinition {
    let p = parameters;
    ModelDefinition {
        variables: ["x", "pi", "i", "a"].map(String::from).to_vec(),
        shocks: ["eps_a", "v"].map(String::from).to_vec(),
        parameters: BTreeMap::from([
            ("beta".to_string(), p.beta),
            ("sigma".to_string(), p.sigma),
            ("kappa".to_string(), p.kappa),
            ("psi".to_string(), p.psi),
            ("phi_pi".to_string(), p.phi_pi),
            ("phi_x".to_string(), p.phi_x),
            ("rho_a".to_string(), p.rho_a),
        ]),
        equations: vec![
            "x = x(+1) - (1/sigma)*(i - pi(+1) - (1/beta - 1) - sigma*psi*(rho_a - 1)*a)"
                .to_string(),
            "pi = beta*pi(+1) + kappa*x".to_string(),
            "i = 1/beta - 1 + phi_pi*pi + phi_x*x + v".to_string(),
            "a = rho_a*a(-1) + eps_a".to_string(),
        ],
        shock_variances: BTreeMap::from([
            ("eps_a".to_string(), p.sigma_a * p.sigma_a),
            ("v".to_string(), p.sigma_v * p.sigma_v),
        ]),
        ..Default::default()
    }
}

/// Zero gap, zero inflation, the natural rate and neutral technology.
pub fn steady_state(parameters: &NewKeynesianParameters) -> Vec<FloatValue> {
    vec![0.0, 0.0, 1.0 / parameters.beta - 1.0, 0.0]
}

pub fn model(parameters: &NewKeynesianParameters) -> DSGEResult<Model> {
    definition(parameters).build()
}
