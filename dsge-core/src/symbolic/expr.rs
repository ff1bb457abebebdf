//! Expression trees over timed model symbols.
//!
//! Every occurrence of a variable at a distinct offset is a distinct [`Symbol`],
//! so `x(-1)`, `x` and `x(+1)` can be differentiated independently.
//! Parameters never appear here: they are folded into constants when an
//! equation is parsed.

use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Timing of a variable occurrence relative to the current period.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timing {
    /// `x(-1)`
    Lag,
    /// `x` or `x(0)`
    Current,
    /// `x(+1)`
    Lead,
}

impl Timing {
    /// Map an integer offset onto a timing, if it is one the solver supports.
    pub fn from_offset(offset: i64) -> Option<Self> {
        match offset {
            -1 => Some(Timing::Lag),
            0 => Some(Timing::Current),
            1 => Some(Timing::Lead),
            _ => None,
        }
    }

    pub fn offset(self) -> i64 {
        match self {
            Timing::Lag => -1,
            Timing::Current => 0,
            Timing::Lead => 1,
        }
    }
}

/// A leaf of an expression tree.
///
/// Indices refer to the ordering of endogenous variables and shocks in the owning model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    Variable { index: usize, timing: Timing },
    Shock(usize),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Variable { index, timing } => match timing {
                Timing::Lag => write!(f, "y{index}(-1)"),
                Timing::Current => write!(f, "y{index}"),
                Timing::Lead => write!(f, "y{index}(+1)"),
            },
            Symbol::Shock(index) => write!(f, "e{index}"),
        }
    }
}

/// Built-in unary functions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    Exp,
    Log,
    Sqrt,
}

impl Function {
    /// Look up a function by the name used in equation strings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "exp" => Some(Function::Exp),
            "log" | "ln" => Some(Function::Log),
            "sqrt" => Some(Function::Sqrt),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Sqrt => "sqrt",
        }
    }

    fn apply(self, x: FloatValue) -> FloatValue {
        match self {
            Function::Exp => x.exp(),
            Function::Log => x.ln(),
            Function::Sqrt => x.sqrt(),
        }
    }
}

/// Names that cannot be used for variables, shocks or parameters.
pub const RESERVED_NAMES: [&str; 4] = ["exp", "log", "ln", "sqrt"];

/// A symbolic expression.
///
/// Construct compound expressions through the associated functions ([`Expr::add`],
/// [`Expr::mul`], ...) which fold constants and drop neutral elements, keeping
/// derivative trees small.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Constant(FloatValue),
    Symbol(Symbol),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    pub fn constant(value: FloatValue) -> Self {
        Expr::Constant(value)
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Expr::Symbol(symbol)
    }

    fn as_constant(&self) -> Option<FloatValue> {
        match self {
            Expr::Constant(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_constant() == Some(0.0)
    }

    fn is_one(&self) -> bool {
        self.as_constant() == Some(1.0)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn neg(a: Expr) -> Expr {
        match a {
            Expr::Constant(v) => Expr::Constant(-v),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(a: Expr, b: Expr) -> Expr {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Expr::Constant(x + y),
            (Some(x), _) if x == 0.0 => b,
            (_, Some(y)) if y == 0.0 => a,
            _ => Expr::Add(Box::new(a), Box::new(b)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(a: Expr, b: Expr) -> Expr {
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Expr::Constant(x - y),
            (Some(x), _) if x == 0.0 => Expr::neg(b),
            (_, Some(y)) if y == 0.0 => a,
            _ => Expr::Sub(Box::new(a), Box::new(b)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn mul(a: Expr, b: Expr) -> Expr {
        if a.is_zero() || b.is_zero() {
            return Expr::Constant(0.0);
        }
        match (a.as_constant(), b.as_constant()) {
            (Some(x), Some(y)) => Expr::Constant(x * y),
            (Some(x), _) if x == 1.0 => b,
            (_, Some(y)) if y == 1.0 => a,
            (Some(x), _) if x == -1.0 => Expr::neg(b),
            (_, Some(y)) if y == -1.0 => Expr::neg(a),
            _ => Expr::Mul(Box::new(a), Box::new(b)),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn div(a: Expr, b: Expr) -> Expr {
        if b.is_one() {
            return a;
        }
        match (a.as_constant(), b.as_constant()) {
            (Some(x), _) if x == 0.0 => Expr::Constant(0.0),
            (Some(x), Some(y)) if y != 0.0 => Expr::Constant(x / y),
            _ => Expr::Div(Box::new(a), Box::new(b)),
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        match (base.as_constant(), exponent.as_constant()) {
            (Some(x), Some(y)) => Expr::Constant(x.powf(y)),
            (_, Some(y)) if y == 0.0 => Expr::Constant(1.0),
            (_, Some(y)) if y == 1.0 => base,
            _ => Expr::Pow(Box::new(base), Box::new(exponent)),
        }
    }

    pub fn call(function: Function, argument: Expr) -> Expr {
        match argument.as_constant() {
            Some(x) => Expr::Constant(function.apply(x)),
            None => Expr::Call(function, Box::new(argument)),
        }
    }

    /// Evaluate the expression, resolving symbols through `lookup`.
    pub fn evaluate<F>(&self, lookup: &F) -> FloatValue
    where
        F: Fn(Symbol) -> FloatValue,
    {
        match self {
            Expr::Constant(v) => *v,
            Expr::Symbol(s) => lookup(*s),
            Expr::Neg(a) => -a.evaluate(lookup),
            Expr::Add(a, b) => a.evaluate(lookup) + b.evaluate(lookup),
            Expr::Sub(a, b) => a.evaluate(lookup) - b.evaluate(lookup),
            Expr::Mul(a, b) => a.evaluate(lookup) * b.evaluate(lookup),
            Expr::Div(a, b) => a.evaluate(lookup) / b.evaluate(lookup),
            Expr::Pow(a, b) => a.evaluate(lookup).powf(b.evaluate(lookup)),
            Expr::Call(function, a) => function.apply(a.evaluate(lookup)),
        }
    }

    /// Collect the distinct symbols referenced by this expression.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut found = BTreeSet::new();
        self.collect_symbols(&mut found);
        found
    }

    fn collect_symbols(&self, found: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Constant(_) => {}
            Expr::Symbol(s) => {
                found.insert(*s);
            }
            Expr::Neg(a) | Expr::Call(_, a) => a.collect_symbols(found),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_symbols(found);
                b.collect_symbols(found);
            }
        }
    }

    /// Does the expression depend on `symbol`?
    pub fn depends_on(&self, symbol: Symbol) -> bool {
        match self {
            Expr::Constant(_) => false,
            Expr::Symbol(s) => *s == symbol,
            Expr::Neg(a) | Expr::Call(_, a) => a.depends_on(symbol),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.depends_on(symbol) || b.depends_on(symbol),
        }
    }

    /// Symbolic partial derivative with respect to `wrt`.
    pub fn derivative(&self, wrt: Symbol) -> Expr {
        match self {
            Expr::Constant(_) => Expr::Constant(0.0),
            Expr::Symbol(s) => Expr::Constant(if *s == wrt { 1.0 } else { 0.0 }),
            Expr::Neg(a) => Expr::neg(a.derivative(wrt)),
            Expr::Add(a, b) => Expr::add(a.derivative(wrt), b.derivative(wrt)),
            Expr::Sub(a, b) => Expr::sub(a.derivative(wrt), b.derivative(wrt)),
            Expr::Mul(a, b) => Expr::add(
                Expr::mul(a.derivative(wrt), (**b).clone()),
                Expr::mul((**a).clone(), b.derivative(wrt)),
            ),
            Expr::Div(a, b) => {
                // (a'b - ab') / b^2
                let da = a.derivative(wrt);
                let db = b.derivative(wrt);
                Expr::div(
                    Expr::sub(
                        Expr::mul(da, (**b).clone()),
                        Expr::mul((**a).clone(), db),
                    ),
                    Expr::pow((**b).clone(), Expr::Constant(2.0)),
                )
            }
            Expr::Pow(a, b) => Self::pow_derivative(a, b, wrt),
            Expr::Call(function, a) => {
                let da = a.derivative(wrt);
                if da.is_zero() {
                    return Expr::Constant(0.0);
                }
                let outer = match function {
                    Function::Exp => Expr::call(Function::Exp, (**a).clone()),
                    Function::Log => Expr::div(Expr::Constant(1.0), (**a).clone()),
                    Function::Sqrt => Expr::div(
                        Expr::Constant(0.5),
                        Expr::call(Function::Sqrt, (**a).clone()),
                    ),
                };
                Expr::mul(outer, da)
            }
        }
    }

    fn pow_derivative(base: &Expr, exponent: &Expr, wrt: Symbol) -> Expr {
        let base_depends = base.depends_on(wrt);
        let exponent_depends = exponent.depends_on(wrt);
        match (base_depends, exponent_depends) {
            (false, false) => Expr::Constant(0.0),
            // b * a^(b-1) * a'
            (true, false) => Expr::mul(
                Expr::mul(
                    exponent.clone(),
                    Expr::pow(
                        base.clone(),
                        Expr::sub(exponent.clone(), Expr::Constant(1.0)),
                    ),
                ),
                base.derivative(wrt),
            ),
            // a^b * ln(a) * b'
            (false, true) => Expr::mul(
                Expr::mul(
                    Expr::pow(base.clone(), exponent.clone()),
                    Expr::call(Function::Log, base.clone()),
                ),
                exponent.derivative(wrt),
            ),
            // a^b * (b' ln(a) + b a' / a)
            (true, true) => Expr::mul(
                Expr::pow(base.clone(), exponent.clone()),
                Expr::add(
                    Expr::mul(
                        exponent.derivative(wrt),
                        Expr::call(Function::Log, base.clone()),
                    ),
                    Expr::div(
                        Expr::mul(exponent.clone(), base.derivative(wrt)),
                        base.clone(),
                    ),
                ),
            ),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(v) => write!(f, "{v}"),
            Expr::Symbol(s) => write!(f, "{s}"),
            Expr::Neg(a) => write!(f, "-({a})"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Mul(a, b) => write!(f, "{a} * {b}"),
            Expr::Div(a, b) => write!(f, "{a} / ({b})"),
            Expr::Pow(a, b) => write!(f, "({a})^({b})"),
            Expr::Call(function, a) => write!(f, "{}({a})", function.name()),
        }
    }
}
