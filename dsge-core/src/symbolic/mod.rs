//! Symbolic representation of model equations.
//!
//! Each equation string is parsed once, when the model is built, into an
//! [`Expr`] tree whose leaves are timed [`Symbol`]s. The partial derivative
//! with respect to every symbol the equation contains is derived at the same
//! time, so steady-state iteration and linearisation only ever evaluate trees.

mod expr;
mod parser;
mod table;

pub use expr::{Expr, Function, Symbol, Timing, RESERVED_NAMES};
pub use parser::parse_equation;
pub use table::{NameKind, SymbolTable};

use crate::errors::ModelSpecError;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Values at which equations are evaluated.
///
/// `lag`, `current` and `lead` are indexed by endogenous variable, `shocks` by shock.
#[derive(Debug, Clone, Copy)]
pub struct EvalPoint<'a> {
    pub lag: &'a [FloatValue],
    pub current: &'a [FloatValue],
    pub lead: &'a [FloatValue],
    pub shocks: &'a [FloatValue],
}

impl<'a> EvalPoint<'a> {
    /// A point where every period takes the same values, as in a steady state.
    pub fn stationary(values: &'a [FloatValue], shocks: &'a [FloatValue]) -> Self {
        Self {
            lag: values,
            current: values,
            lead: values,
            shocks,
        }
    }

    pub fn value(&self, symbol: Symbol) -> FloatValue {
        match symbol {
            Symbol::Variable { index, timing } => match timing {
                Timing::Lag => self.lag[index],
                Timing::Current => self.current[index],
                Timing::Lead => self.lead[index],
            },
            Symbol::Shock(index) => self.shocks[index],
        }
    }
}

/// A parsed model equation, `residual = 0`, together with its partial derivatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    source: String,
    residual: Expr,
    /// Sorted by symbol
    derivatives: Vec<(Symbol, Expr)>,
}

impl Equation {
    /// Parse an equation and derive its Jacobian row.
    pub fn parse(
        source: &str,
        index: usize,
        table: &SymbolTable,
    ) -> Result<Self, ModelSpecError> {
        let residual = parse_equation(source, index, table)?;
        let derivatives = residual
            .symbols()
            .into_iter()
            .map(|symbol| (symbol, residual.derivative(symbol)))
            .collect();

        Ok(Self {
            source: source.to_string(),
            residual,
            derivatives,
        })
    }

    /// The equation as it was written.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn residual(&self) -> &Expr {
        &self.residual
    }

    /// Symbolic partial derivative with respect to `symbol`.
    ///
    /// Returns `None` if the equation does not contain the symbol (the derivative is zero).
    pub fn derivative(&self, symbol: Symbol) -> Option<&Expr> {
        self.derivatives
            .binary_search_by_key(&symbol, |(s, _)| *s)
            .ok()
            .map(|i| &self.derivatives[i].1)
    }

    /// All symbols the equation depends on, with their partial derivatives.
    pub fn derivatives(&self) -> impl Iterator<Item = (Symbol, &Expr)> {
        self.derivatives.iter().map(|(s, e)| (*s, e))
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.derivatives.iter().map(|(s, _)| *s)
    }

    pub fn evaluate(&self, point: &EvalPoint) -> FloatValue {
        self.residual.evaluate(&|s| point.value(s))
    }

    pub fn evaluate_derivative(&self, symbol: Symbol, point: &EvalPoint) -> FloatValue {
        self.derivative(symbol)
            .map(|d| d.evaluate(&|s| point.value(s)))
            .unwrap_or(0.0)
    }
}
