//! LAMBDIFICATION - converting symbolic expressions into executable closures.
//!
//! An expression is compiled once into a tree of boxed closures mirroring the
//! expression tree and then evaluated many times inside iteration loops. Every
//! node checks its own domain, so evaluation never silently returns `NaN` or `inf`:
//! `sqrt` of a negative number, `ln` of a non-positive number, division by zero,
//! inverse trigonometric functions outside `[-1, 1]` and overflow are reported as
//! [`EvalError`]s.
//!
//! # Example
//! ```
//! use RustedNumAn::symbolic::symbolic_lambdify::compile;
//! let f = compile("x^2 - 4", &["x"]).unwrap();
//! assert_eq!(f.call(&[3.0]).unwrap(), 5.0);
//! assert!(compile("sqrt(x)", &["x"]).unwrap().call(&[-1.0]).is_err());
//! ```
use crate::symbolic::parse_expr::{
    MAX_DEPTH, ParseError, ParseErrorKind, parse_expression_with_vars,
};
use crate::symbolic::symbolic_engine::Expr;
use std::collections::HashMap;
use std::f64::consts::PI;
use thiserror::Error;

/// Failure while evaluating a compiled expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{function}({argument}) is outside the domain of {function}")]
    Domain {
        function: &'static str,
        argument: f64,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{operation} produced a non-finite value")]
    NonFinite { operation: &'static str },
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },
    #[error("no value bound to variable '{0}'")]
    UnboundVariable(String),
}

pub type LambdifiedFn = Box<dyn Fn(&[f64]) -> Result<f64, EvalError> + Send + Sync>;

fn checked(value: f64, operation: &'static str) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite { operation })
    }
}

fn checked_pow(base: f64, exponent: f64) -> Result<f64, EvalError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(EvalError::Domain {
            function: "pow",
            argument: base,
        });
    }
    checked(base.powf(exponent), "pow")
}

macro_rules! unary_node {
    ($arg:expr, $vars:expr, |$v:ident| $body:expr) => {{
        let f = $arg.lambdify_node($vars)?;
        let node: LambdifiedFn = Box::new(move |args| {
            let $v = f(args)?;
            $body
        });
        node
    }};
}

macro_rules! binary_node {
    ($lhs:expr, $rhs:expr, $vars:expr, |$a:ident, $b:ident| $body:expr) => {{
        let lf = $lhs.lambdify_node($vars)?;
        let rf = $rhs.lambdify_node($vars)?;
        let node: LambdifiedFn = Box::new(move |args| {
            let $a = lf(args)?;
            let $b = rf(args)?;
            $body
        });
        node
    }};
}

impl Expr {
    /// Compile into a closure taking arguments in the order of `vars`.
    /// A variable missing from `vars` is reported as an unknown identifier,
    /// a tree deeper than [`MAX_DEPTH`] as too deep.
    pub fn lambdify_checked(&self, vars: &[&str]) -> Result<LambdifiedFn, ParseError> {
        if self.depth() > MAX_DEPTH {
            return Err(ParseError::new(ParseErrorKind::TooDeep(MAX_DEPTH), 0));
        }
        self.lambdify_node(vars)
    }

    fn lambdify_node(&self, vars: &[&str]) -> Result<LambdifiedFn, ParseError> {
        let compiled = match self {
            Expr::Var(name) => {
                let index = vars.iter().position(|v| *v == name.as_str()).ok_or_else(|| {
                    ParseError::new(ParseErrorKind::UnknownIdentifier(name.clone()), 0)
                })?;
                let node: LambdifiedFn = Box::new(move |args| Ok(args[index]));
                node
            }
            Expr::Const(val) => {
                let val = *val;
                let node: LambdifiedFn = Box::new(move |_| Ok(val));
                node
            }
            Expr::Add(lhs, rhs) => binary_node!(lhs, rhs, vars, |a, b| checked(a + b, "addition")),
            Expr::Sub(lhs, rhs) => {
                binary_node!(lhs, rhs, vars, |a, b| checked(a - b, "subtraction"))
            }
            Expr::Mul(lhs, rhs) => {
                binary_node!(lhs, rhs, vars, |a, b| checked(a * b, "multiplication"))
            }
            Expr::Div(lhs, rhs) => binary_node!(lhs, rhs, vars, |a, b| {
                if b == 0.0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    checked(a / b, "division")
                }
            }),
            Expr::Pow(base, exp) => binary_node!(base, exp, vars, |a, b| checked_pow(a, b)),
            Expr::Exp(e) => unary_node!(e, vars, |v| checked(v.exp(), "exp")),
            Expr::Ln(e) => unary_node!(e, vars, |v| {
                if v <= 0.0 {
                    Err(EvalError::Domain {
                        function: "ln",
                        argument: v,
                    })
                } else {
                    Ok(v.ln())
                }
            }),
            Expr::Sqrt(e) => unary_node!(e, vars, |v| {
                if v < 0.0 {
                    Err(EvalError::Domain {
                        function: "sqrt",
                        argument: v,
                    })
                } else {
                    Ok(v.sqrt())
                }
            }),
            Expr::Abs(e) => unary_node!(e, vars, |v| Ok(v.abs())),
            Expr::sin(e) => unary_node!(e, vars, |v| Ok(v.sin())),
            Expr::cos(e) => unary_node!(e, vars, |v| Ok(v.cos())),
            Expr::tg(e) => unary_node!(e, vars, |v| checked(v.tan(), "tg")),
            Expr::ctg(e) => unary_node!(e, vars, |v| {
                let t = v.tan();
                if t == 0.0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    checked(1.0 / t, "ctg")
                }
            }),
            Expr::arcsin(e) => unary_node!(e, vars, |v| {
                if v.abs() > 1.0 {
                    Err(EvalError::Domain {
                        function: "arcsin",
                        argument: v,
                    })
                } else {
                    Ok(v.asin())
                }
            }),
            Expr::arccos(e) => unary_node!(e, vars, |v| {
                if v.abs() > 1.0 {
                    Err(EvalError::Domain {
                        function: "arccos",
                        argument: v,
                    })
                } else {
                    Ok(v.acos())
                }
            }),
            Expr::arctg(e) => unary_node!(e, vars, |v| Ok(v.atan())),
            Expr::arcctg(e) => unary_node!(e, vars, |v| Ok(PI / 2.0 - v.atan())),
        };
        Ok(compiled)
    }
}

/// Compiled expression together with the ordered variable list it expects
pub struct Lambdified {
    source: String,
    variables: Vec<String>,
    func: LambdifiedFn,
}

impl Lambdified {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate with positional arguments
    pub fn call(&self, args: &[f64]) -> Result<f64, EvalError> {
        if args.len() != self.variables.len() {
            return Err(EvalError::ArgumentCount {
                expected: self.variables.len(),
                got: args.len(),
            });
        }
        (self.func)(args)
    }

    /// Evaluate with named bindings
    pub fn evaluate(&self, bindings: &HashMap<String, f64>) -> Result<f64, EvalError> {
        let args = self
            .variables
            .iter()
            .map(|name| {
                bindings
                    .get(name)
                    .copied()
                    .ok_or_else(|| EvalError::UnboundVariable(name.clone()))
            })
            .collect::<Result<Vec<f64>, EvalError>>()?;
        (self.func)(&args)
    }
}

impl std::fmt::Debug for Lambdified {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lambdified")
            .field("source", &self.source)
            .field("variables", &self.variables)
            .finish()
    }
}

/// Parse `expr` against the declared `variables` and compile it
pub fn compile(expr: &str, variables: &[&str]) -> Result<Lambdified, ParseError> {
    let parsed = parse_expression_with_vars(expr, variables)?.simplify_();
    let func = parsed.lambdify_checked(variables)?;
    Ok(Lambdified {
        source: expr.to_string(),
        variables: variables.iter().map(|v| v.to_string()).collect(),
        func,
    })
}

/// Evaluate a compiled expression under named bindings
pub fn evaluate(
    lambdified: &Lambdified,
    bindings: &HashMap<String, f64>,
) -> Result<f64, EvalError> {
    lambdified.evaluate(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_deep_expressions_are_rejected() {
        // 2 MB, the default size of spawned and rayon worker threads
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let nested = format!("{}x{}", "(".repeat(100_000), ")".repeat(100_000));
                let err = compile(&nested, &["x"]).unwrap_err();
                assert_eq!(err.kind, ParseErrorKind::TooDeep(MAX_DEPTH));
                let limit = format!("{}x{}", "sin(".repeat(200), ")".repeat(200));
                let f = compile(&limit, &["x"]).unwrap();
                assert!(f.call(&[0.5]).unwrap().abs() < 0.5);
            })
            .unwrap();
        handle.join().unwrap();

        let mut expr = Expr::Var("x".to_string());
        for _ in 0..MAX_DEPTH {
            expr = Expr::cos(expr.boxed());
        }
        let err = expr.lambdify_checked(&["x"]).err().unwrap();
        assert_eq!(err.kind, ParseErrorKind::TooDeep(MAX_DEPTH));
    }

    #[test]
    fn test_compile_and_evaluate() {
        let f = compile("x^2 - 4", &["x"]).unwrap();
        assert_relative_eq!(f.call(&[2.0]).unwrap(), 0.0);
        assert_relative_eq!(f.call(&[-3.0]).unwrap(), 5.0);
        let g = compile("exp(-x)*cos(pi*y)", &["x", "y"]).unwrap();
        let mut bindings = HashMap::new();
        bindings.insert("x".to_string(), 0.0);
        bindings.insert("y".to_string(), 1.0);
        assert_relative_eq!(evaluate(&g, &bindings).unwrap(), -1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_domain_errors() {
        let f = compile("sqrt(x)", &["x"]).unwrap();
        assert!(matches!(
            f.call(&[-1.0]),
            Err(EvalError::Domain {
                function: "sqrt",
                ..
            })
        ));
        let f = compile("ln(x)", &["x"]).unwrap();
        assert!(matches!(f.call(&[0.0]), Err(EvalError::Domain { .. })));
        let f = compile("1/x", &["x"]).unwrap();
        assert_eq!(f.call(&[0.0]), Err(EvalError::DivisionByZero));
        let f = compile("asin(x)", &["x"]).unwrap();
        assert!(f.call(&[1.5]).is_err());
        let f = compile("x^(-1)", &["x"]).unwrap();
        assert_eq!(f.call(&[0.0]), Err(EvalError::DivisionByZero));
        let f = compile("x^0.5", &["x"]).unwrap();
        assert!(f.call(&[-4.0]).is_err());
        let f = compile("exp(x)", &["x"]).unwrap();
        assert!(matches!(f.call(&[1000.0]), Err(EvalError::NonFinite { .. })));
    }

    #[test]
    fn test_negative_base_integer_exponent() {
        let f = compile("x^3", &["x"]).unwrap();
        assert_relative_eq!(f.call(&[-2.0]).unwrap(), -8.0);
    }

    #[test]
    fn test_binding_errors() {
        let f = compile("x + y", &["x", "y"]).unwrap();
        assert_eq!(
            f.call(&[1.0]),
            Err(EvalError::ArgumentCount {
                expected: 2,
                got: 1
            })
        );
        let mut bindings = HashMap::new();
        bindings.insert("x".to_string(), 1.0);
        assert_eq!(
            f.evaluate(&bindings),
            Err(EvalError::UnboundVariable("y".to_string()))
        );
    }

    #[test]
    fn test_unknown_identifier_rejected_at_compile_time() {
        let err = compile("x + z", &["x"]).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownIdentifier("z".to_string()));
    }

    #[test]
    fn test_compiled_function_is_thread_safe() {
        let f = std::sync::Arc::new(compile("sin(x)", &["x"]).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let f = f.clone();
                std::thread::spawn(move || f.call(&[i as f64]).unwrap())
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_relative_eq!(h.join().unwrap(), (i as f64).sin());
        }
    }
}
