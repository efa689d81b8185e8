//! Error taxonomy shared by every numerical method.
//!
//! Reaching the iteration cap is not an error: it is reported as
//! [`crate::numerical::iteration::Termination::MaxIterationsReached`] next to the trace.
use crate::symbolic::parse_expr::ParseError;
use crate::symbolic::symbolic_lambdify::EvalError;
use serde::Serialize;
use strum_macros::{Display, EnumIter};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericalError {
    #[error("cannot parse expression: {0}")]
    Parse(#[from] ParseError),
    #[error("cannot evaluate expression: {0}")]
    Eval(#[from] EvalError),
    #[error("f(a) and f(b) must have opposite signs: f({a}) = {fa}, f({b}) = {fb}")]
    InvalidBracket { a: f64, b: f64, fa: f64, fb: f64 },
    #[error("relaxation factor w = {0} must lie in (0, 2)")]
    InvalidRelaxation(f64),
    #[error("x values must be distinct, {0} appears more than once")]
    DuplicateAbscissa(f64),
    #[error("derivative vanished at x = {x}")]
    ZeroDerivative { x: f64 },
    #[error("denominator vanished in {method} at iteration {iteration}")]
    ZeroDenominator {
        method: &'static str,
        iteration: usize,
    },
    #[error("singular matrix: {0}")]
    SingularMatrix(String),
    #[error("iterate became non-finite at step {iteration}")]
    NonFiniteIterate { iteration: usize },
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("invalid value for '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("missing required field '{0}'")]
    MissingField(String),
}

/// Coarse classification used by callers to pick a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    BadInput,
    NotConverged,
    NumericalInstability,
}

impl NumericalError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        NumericalError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            NumericalError::Parse(_)
            | NumericalError::InvalidBracket { .. }
            | NumericalError::InvalidRelaxation(_)
            | NumericalError::DuplicateAbscissa(_)
            | NumericalError::DimensionMismatch(_)
            | NumericalError::InvalidParameter { .. }
            | NumericalError::MissingField(_) => ErrorCategory::BadInput,
            NumericalError::ZeroDerivative { .. } | NumericalError::ZeroDenominator { .. } => {
                ErrorCategory::NotConverged
            }
            NumericalError::Eval(_)
            | NumericalError::SingularMatrix(_)
            | NumericalError::NonFiniteIterate { .. } => ErrorCategory::NumericalInstability,
        }
    }

    /// Human-readable advice for the end user
    pub fn hint(&self) -> &'static str {
        match self {
            NumericalError::Parse(_) => {
                "check the expression syntax: use x as the variable, ^ for powers and brackets around function arguments"
            }
            NumericalError::Eval(_) => {
                "the function is undefined or overflows at some visited point; try another starting point or interval"
            }
            NumericalError::InvalidBracket { .. } => {
                "choose an interval [a, b] where the function changes sign"
            }
            NumericalError::InvalidRelaxation(_) => "choose a relaxation factor between 0 and 2",
            NumericalError::DuplicateAbscissa(_) => "remove repeated x values from the point set",
            NumericalError::ZeroDerivative { .. } => {
                "the tangent is horizontal; start from a different initial guess"
            }
            NumericalError::ZeroDenominator { .. } => {
                "two consecutive function values coincide; change the initial guesses"
            }
            NumericalError::SingularMatrix(_) => {
                "the matrix has a zero pivot or diagonal entry; reorder the equations or check the data"
            }
            NumericalError::NonFiniteIterate { .. } => {
                "the iteration diverged; check the spectral radius or the initial vector"
            }
            NumericalError::DimensionMismatch(_) => {
                "matrix and vectors must have matching sizes and the matrix must be square"
            }
            NumericalError::InvalidParameter { .. } | NumericalError::MissingField(_) => {
                "check the request parameters"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::ParseErrorKind;

    #[test]
    fn test_categories() {
        let parse = NumericalError::from(ParseError::new(ParseErrorKind::Empty, 0));
        assert_eq!(parse.category(), ErrorCategory::BadInput);
        let eval = NumericalError::from(EvalError::DivisionByZero);
        assert_eq!(eval.category(), ErrorCategory::NumericalInstability);
        let zero = NumericalError::ZeroDerivative { x: 0.0 };
        assert_eq!(zero.category(), ErrorCategory::NotConverged);
        assert_eq!(ErrorCategory::NumericalInstability.to_string(), "numerical_instability");
    }

    #[test]
    fn test_messages_mention_values() {
        let err = NumericalError::InvalidBracket {
            a: 0.0,
            b: 1.0,
            fa: 2.0,
            fb: 3.0,
        };
        assert!(err.to_string().contains("f(1) = 3"));
        assert!(!err.hint().is_empty());
        let err = NumericalError::invalid_parameter("tol", "must be positive");
        assert_eq!(err.to_string(), "invalid value for 'tol': must be positive");
    }
}
