#![allow(non_camel_case_types)]
//! Single-variable symbolic function: source text, parsed tree and compiled closure.
//!
//! Example#
//! ```
//! use RustedNumAn::symbolic::symbolic_functions::SymbolicFunction;
//! let f = SymbolicFunction::from_string("x^3 - 2*x", "x").unwrap();
//! let df = f.derivative().unwrap();
//! assert_eq!(df.expression_string(), "((3 * (x ^ 2)) - 2)");
//! assert_eq!(df.evaluate(1.0).unwrap(), 1.0);
//! ```
use crate::symbolic::parse_expr::{ParseError, parse_expression_with_vars};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::{EvalError, LambdifiedFn};

pub struct SymbolicFunction {
    source: String,
    expr: Expr,
    variable: String,
    func: LambdifiedFn,
}

impl SymbolicFunction {
    /// Parse `expr_str` with `variable` as its only free identifier
    pub fn from_string(expr_str: &str, variable: &str) -> Result<Self, ParseError> {
        let expr = parse_expression_with_vars(expr_str, &[variable])?;
        let mut function = Self::from_expr(expr, variable)?;
        function.source = expr_str.trim().to_string();
        Ok(function)
    }

    pub fn from_expr(expr: Expr, variable: &str) -> Result<Self, ParseError> {
        let expr = expr.simplify_();
        let func = expr.lambdify_checked(&[variable])?;
        Ok(Self {
            source: expr.to_string(),
            expr,
            variable: variable.to_string(),
            func,
        })
    }

    pub fn evaluate(&self, x: f64) -> Result<f64, EvalError> {
        (self.func)(&[x])
    }

    /// Analytical derivative with respect to the function's variable
    pub fn derivative(&self) -> Result<SymbolicFunction, ParseError> {
        let derivative_expr = self.expr.diff(&self.variable).simplify_();
        Self::from_expr(derivative_expr, &self.variable)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Simplified expression printed back in parser-compatible form
    pub fn expression_string(&self) -> String {
        self.expr.to_string()
    }
}

impl std::fmt::Debug for SymbolicFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolicFunction")
            .field("source", &self.source)
            .field("expr", &self.expr)
            .field("variable", &self.variable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_string_keeps_source() {
        let f = SymbolicFunction::from_string("  x^2 - 4 ", "x").unwrap();
        assert_eq!(f.source(), "x^2 - 4");
        assert_eq!(f.variable(), "x");
        assert_relative_eq!(f.evaluate(3.0).unwrap(), 5.0);
    }

    #[test]
    fn test_second_derivative() {
        let f = SymbolicFunction::from_string("exp(x) - x^3", "x").unwrap();
        let d2 = f.derivative().unwrap().derivative().unwrap();
        assert_relative_eq!(d2.evaluate(1.0).unwrap(), 1f64.exp() - 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_other_variable_rejected() {
        assert!(SymbolicFunction::from_string("x + t", "x").is_err());
        let g = SymbolicFunction::from_string("t^2", "t").unwrap();
        assert_relative_eq!(g.evaluate(3.0).unwrap(), 9.0);
    }

    #[test]
    fn test_constant_function() {
        let f = SymbolicFunction::from_string("2*pi", "x").unwrap();
        assert_relative_eq!(f.evaluate(100.0).unwrap(), 2.0 * std::f64::consts::PI);
        assert_eq!(f.derivative().unwrap().expr(), &Expr::Const(0.0));
    }
}
