//! Equation string parser.
//!
//! Equations are written the way they are in a Dynare `model` block:
//!
//! - Leads and lags: `x(+1)`, `x(1)`, `x(-1)`, `x(0)`
//! - Operators: `+ - * / ^`, unary minus, parentheses
//! - Functions: `exp`, `log` (alias `ln`), `sqrt`
//! - An optional `=` separating the two sides; `lhs = rhs` is read as `lhs - rhs`
//!
//! # Grammar
//!
//! ```text
//! equation = expr ('=' expr)?
//! expr     = term (('+' | '-') term)*
//! term     = unary (('*' | '/') unary)*
//! unary    = ('-' | '+') unary | power
//! power    = primary ('^' unary)?
//! primary  = number | function '(' expr ')' | name offset? | '(' expr ')'
//! offset   = '(' ('+' | '-')? [0-9]+ ')'
//! ```

use super::expr::{Expr, Function, Symbol, Timing};
use super::table::{NameKind, SymbolTable};
use crate::errors::ModelSpecError;

/// Parse a single equation into the residual expression `lhs - rhs`.
///
/// `equation` is the position of the equation in the model and is only used
/// for error reporting.
pub fn parse_equation(
    input: &str,
    equation: usize,
    table: &SymbolTable,
) -> Result<Expr, ModelSpecError> {
    let mut parser = EquationParser::new(input, equation, table);
    parser.parse_equation()
}

/// Internal recursive-descent parser.
struct EquationParser<'a> {
    input: &'a str,
    pos: usize,
    equation: usize,
    table: &'a SymbolTable,
}

impl<'a> EquationParser<'a> {
    fn new(input: &'a str, equation: usize, table: &'a SymbolTable) -> Self {
        Self {
            input,
            pos: 0,
            equation,
            table,
        }
    }

    fn error(&self, message: impl Into<String>) -> ModelSpecError {
        ModelSpecError::Parse {
            equation: self.equation,
            message: message.into(),
        }
    }

    fn parse_equation(&mut self) -> Result<Expr, ModelSpecError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(self.error("empty equation"));
        }

        let lhs = self.parse_expression()?;
        self.skip_whitespace();

        let residual = if self.peek() == Some('=') {
            self.advance();
            let rhs = self.parse_expression()?;
            Expr::sub(lhs, rhs)
        } else {
            lhs
        };

        self.skip_whitespace();
        match self.peek() {
            None => Ok(residual),
            Some(c) => Err(self.error(format!(
                "unexpected character '{c}' at position {}",
                self.pos
            ))),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, ModelSpecError> {
        let mut result = self.parse_term()?;

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('+') => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    result = Expr::add(result, rhs);
                }
                Some('-') => {
                    self.advance();
                    let rhs = self.parse_term()?;
                    result = Expr::sub(result, rhs);
                }
                _ => break,
            }
        }

        Ok(result)
    }

    fn parse_term(&mut self) -> Result<Expr, ModelSpecError> {
        let mut result = self.parse_unary()?;

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('*') => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    result = Expr::mul(result, rhs);
                }
                Some('/') => {
                    self.advance();
                    let rhs = self.parse_unary()?;
                    result = Expr::div(result, rhs);
                }
                _ => break,
            }
        }

        Ok(result)
    }

    fn parse_unary(&mut self) -> Result<Expr, ModelSpecError> {
        self.skip_whitespace();
        match self.peek() {
            Some('-') => {
                self.advance();
                Ok(Expr::neg(self.parse_unary()?))
            }
            Some('+') => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, ModelSpecError> {
        let base = self.parse_primary()?;
        self.skip_whitespace();
        if self.peek() == Some('^') {
            self.advance();
            // Right associative: a^b^c == a^(b^c)
            let exponent = self.parse_unary()?;
            return Ok(Expr::pow(base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, ModelSpecError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.parse_name(),
            Some(c) => Err(self.error(format!(
                "unexpected character '{c}' at position {}",
                self.pos
            ))),
            None => Err(self.error("unexpected end of equation")),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ModelSpecError> {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_digit() || c == '.');

        // Optional exponent, e.g. 1e-3 or 2.5E+2
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mark = self.pos;
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.consume_while(|c| c.is_ascii_digit());
            } else {
                // Not an exponent after all (e.g. `2e` followed by a name)
                self.pos = mark;
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Expr::constant)
            .map_err(|_| self.error(format!("invalid number '{text}'")))
    }

    fn parse_name(&mut self) -> Result<Expr, ModelSpecError> {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let name = &self.input[start..self.pos];

        if let Some(function) = Function::from_name(name) {
            self.skip_whitespace();
            self.expect('(')?;
            let argument = self.parse_expression()?;
            self.expect(')')?;
            return Ok(Expr::call(function, argument));
        }

        let kind = self
            .table
            .resolve(name)
            .ok_or_else(|| ModelSpecError::UndeclaredIdentifier {
                name: name.to_string(),
                equation: self.equation,
            })?;

        match kind {
            NameKind::Parameter(value) => {
                if self.peek_after_whitespace() == Some('(') {
                    return Err(self.error(format!(
                        "parameter '{name}' cannot carry a time offset"
                    )));
                }
                Ok(Expr::constant(value))
            }
            NameKind::Variable(index) => {
                let offset = self.parse_optional_offset()?;
                let timing = Timing::from_offset(offset).ok_or_else(|| {
                    ModelSpecError::UnsupportedOffset {
                        name: name.to_string(),
                        offset,
                        equation: self.equation,
                    }
                })?;
                Ok(Expr::symbol(Symbol::Variable { index, timing }))
            }
            NameKind::Shock(index) => {
                let offset = self.parse_optional_offset()?;
                if offset != 0 {
                    return Err(ModelSpecError::UnsupportedOffset {
                        name: name.to_string(),
                        offset,
                        equation: self.equation,
                    });
                }
                Ok(Expr::symbol(Symbol::Shock(index)))
            }
        }
    }

    /// Parse `(+1)`, `(-1)`, `(1)` etc. directly after a name. Returns 0 if absent.
    fn parse_optional_offset(&mut self) -> Result<i64, ModelSpecError> {
        if self.peek_after_whitespace() != Some('(') {
            return Ok(0);
        }
        self.skip_whitespace();
        self.advance();
        self.skip_whitespace();

        let negative = match self.peek() {
            Some('-') => {
                self.advance();
                true
            }
            Some('+') => {
                self.advance();
                false
            }
            _ => false,
        };
        self.skip_whitespace();

        let start = self.pos;
        self.consume_while(|c| c.is_ascii_digit());
        let digits = &self.input[start..self.pos];
        if digits.is_empty() {
            return Err(self.error("expected an integer lead/lag offset"));
        }
        let magnitude: i64 = digits
            .parse()
            .map_err(|_| self.error(format!("invalid offset '{digits}'")))?;

        self.skip_whitespace();
        self.expect(')')?;

        Ok(if negative { -magnitude } else { magnitude })
    }

    fn expect(&mut self, expected: char) -> Result<(), ModelSpecError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(self.error(format!(
                "expected '{expected}' but found '{c}' at position {}",
                self.pos
            ))),
            None => Err(self.error(format!("expected '{expected}' but reached the end"))),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_after_whitespace(&self) -> Option<char> {
        self.input[self.pos..].chars().find(|c| !c.is_whitespace())
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, predicate: F) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        self.consume_while(char::is_whitespace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::default();
        table.insert("y", NameKind::Variable(0)).unwrap();
        table.insert("pi", NameKind::Variable(1)).unwrap();
        table.insert("eps", NameKind::Shock(0)).unwrap();
        table.insert("beta", NameKind::Parameter(0.99)).unwrap();
        table.insert("kappa", NameKind::Parameter(0.1)).unwrap();
        table
    }

    fn eval(expr: &Expr, y: [f64; 3], pi: [f64; 3], eps: f64) -> f64 {
        expr.evaluate(&|s| match s {
            Symbol::Variable { index, timing } => {
                let values = if index == 0 { y } else { pi };
                match timing {
                    Timing::Lag => values[0],
                    Timing::Current => values[1],
                    Timing::Lead => values[2],
                }
            }
            Symbol::Shock(_) => eps,
        })
    }

    #[test]
    fn test_parse_phillips_curve() {
        let table = table();
        let expr = parse_equation("pi = beta*pi(+1) + kappa*y", 0, &table).unwrap();
        // pi - beta*pi(+1) - kappa*y
        let value = eval(&expr, [0.0, 2.0, 0.0], [0.0, 1.0, 3.0], 0.0);
        assert!(is_close!(value, 1.0 - 0.99 * 3.0 - 0.1 * 2.0));
    }

    #[test]
    fn test_parameters_are_folded() {
        let table = table();
        let expr = parse_equation("beta * kappa", 0, &table).unwrap();
        assert_eq!(expr, Expr::Constant(0.99 * 0.1));
    }

    #[test]
    fn test_offsets() {
        let table = table();
        for (source, timing) in [
            ("y(-1)", Timing::Lag),
            ("y( - 1 )", Timing::Lag),
            ("y(0)", Timing::Current),
            ("y", Timing::Current),
            ("y(1)", Timing::Lead),
            ("y(+1)", Timing::Lead),
        ] {
            let expr = parse_equation(source, 0, &table).unwrap();
            assert_eq!(
                expr,
                Expr::Symbol(Symbol::Variable { index: 0, timing }),
                "{source}"
            );
        }
    }

    #[test]
    fn test_unsupported_offsets() {
        let table = table();
        let err = parse_equation("y(+2) - y", 3, &table).unwrap_err();
        assert_eq!(
            err,
            ModelSpecError::UnsupportedOffset {
                name: "y".to_string(),
                offset: 2,
                equation: 3
            }
        );

        let err = parse_equation("y - eps(-1)", 0, &table).unwrap_err();
        assert!(matches!(
            err,
            ModelSpecError::UnsupportedOffset { offset: -1, .. }
        ));
    }

    #[test]
    fn test_undeclared_identifier() {
        let table = table();
        let err = parse_equation("y = rho*y(-1)", 1, &table).unwrap_err();
        assert_eq!(
            err,
            ModelSpecError::UndeclaredIdentifier {
                name: "rho".to_string(),
                equation: 1
            }
        );
    }

    #[test]
    fn test_precedence_and_associativity() {
        let table = SymbolTable::default();
        let expr = parse_equation("2 + 3 * 4 ^ 2 / 8", 0, &table).unwrap();
        assert_eq!(expr, Expr::Constant(8.0));

        let expr = parse_equation("2 ^ 3 ^ 2", 0, &table).unwrap();
        assert_eq!(expr, Expr::Constant(512.0));

        let expr = parse_equation("-2 ^ 2", 0, &table).unwrap();
        assert_eq!(expr, Expr::Constant(-4.0));

        let expr = parse_equation("2 ^ -1", 0, &table).unwrap();
        assert_eq!(expr, Expr::Constant(0.5));

        let expr = parse_equation("10 - 4 - 3", 0, &table).unwrap();
        assert_eq!(expr, Expr::Constant(3.0));

        let expr = parse_equation("1.5e1 = 5", 0, &table).unwrap();
        assert_eq!(expr, Expr::Constant(10.0));
    }

    #[test]
    fn test_functions() {
        let table = table();
        let expr = parse_equation("exp(y) = log(pi(+1)) + sqrt(4)", 0, &table).unwrap();
        let value = eval(&expr, [0.0, 0.0, 0.0], [0.0, 0.0, 1.0], 0.0);
        assert!(is_close!(value, 1.0 - 0.0 - 2.0));
    }

    #[test]
    fn test_parse_errors() {
        let table = table();
        for source in ["", "y +", "(y", "y = = pi", "y pi", "beta(+1)", "y(a)", "exp y"] {
            let result = parse_equation(source, 0, &table);
            assert!(result.is_err(), "expected '{source}' to fail");
        }
    }
}
