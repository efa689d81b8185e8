//! Root finding for scalar nonlinear equations f(x) = 0.
//!
//! | method          | inputs            | module             |
//! |-----------------|-------------------|--------------------|
//! | bisection       | bracket [a, b]    | [`bisection`]      |
//! | false position  | bracket [a, b]    | [`false_position`] |
//! | Newton-Raphson  | x0, f' (, f'')    | [`newton`]         |
//! | fixed point     | x0, g             | [`fixed_point`]    |
//! | secant          | x0, x1            | [`secant`]         |
//!
//! Every method validates its
//! [`StopCriteria`](crate::numerical::iteration::StopCriteria) first and returns a
//! [`ConvergenceResult`] whose trace is kept even when the run fails part way.
//! Errors returned as `Err` are precondition failures detected before the first step.
use crate::numerical::errors::NumericalError;
use crate::numerical::iteration::ConvergenceResult;
use crate::symbolic::symbolic_functions::SymbolicFunction;
use crate::symbolic::symbolic_lambdify::EvalError;
use strum_macros::{Display, EnumIter, EnumString};

pub mod bisection;
pub mod false_position;
pub mod fixed_point;
pub mod newton;
pub mod secant;

pub use bisection::{BisectionRow, bisection};
pub use false_position::{FalsePositionRow, false_position};
pub use fixed_point::{FixedPointRow, fixed_point};
pub use newton::{NewtonRow, newton, newton_multiple_roots};
pub use secant::{SecantRow, secant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RootFindingMethod {
    Bisection,
    FalsePosition,
    Newton,
    FixedPoint,
    Secant,
}

pub type RootFindingResult<S> = ConvergenceResult<S, f64>;

/// Trait for representing a nonlinear equation f(x) = 0
pub trait ScalarFunction {
    fn evaluate(&self, x: f64) -> Result<f64, EvalError>;

    /// Get function name for debugging/logging
    fn name(&self) -> &str {
        "unnamed_function"
    }
}

impl ScalarFunction for SymbolicFunction {
    fn evaluate(&self, x: f64) -> Result<f64, EvalError> {
        SymbolicFunction::evaluate(self, x)
    }

    fn name(&self) -> &str {
        self.source()
    }
}

/// Simple function wrapper for closures
pub struct ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    func: F,
    name: String,
}

impl<F> ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    pub fn new(func: F, name: &str) -> Self {
        Self {
            func,
            name: name.to_string(),
        }
    }
}

impl<F> ScalarFunction for ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    fn evaluate(&self, x: f64) -> Result<f64, EvalError> {
        let value = (self.func)(x);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite {
                operation: "closure",
            })
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Smallest magnitude accepted as a divisor; anything below underflows to zero
pub(crate) fn vanishes(value: f64) -> bool {
    value.abs() < f64::MIN_POSITIVE
}

/// Bracket shared by bisection and false position, ordered so that `a < b`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bracket {
    pub a: f64,
    pub b: f64,
    pub fa: f64,
    pub fb: f64,
}

pub(crate) enum BracketCheck {
    /// `f(a) * f(b) < 0`
    SignChange(Bracket),
    /// one endpoint is an exact root
    Root(f64),
}

pub(crate) fn check_bracket<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
) -> Result<BracketCheck, NumericalError> {
    if !a.is_finite() || !b.is_finite() {
        return Err(NumericalError::invalid_parameter(
            "a, b",
            "interval endpoints must be finite",
        ));
    }
    let (a, b) = if a > b { (b, a) } else { (a, b) };
    let fa = f.evaluate(a)?;
    let fb = f.evaluate(b)?;
    if fa == 0.0 {
        return Ok(BracketCheck::Root(a));
    }
    if fb == 0.0 {
        return Ok(BracketCheck::Root(b));
    }
    if fa * fb >= 0.0 {
        return Err(NumericalError::InvalidBracket { a, b, fa, fb });
    }
    Ok(BracketCheck::SignChange(Bracket { a, b, fa, fb }))
}

pub(crate) fn check_start(name: &str, x: f64) -> Result<(), NumericalError> {
    if x.is_finite() {
        Ok(())
    } else {
        Err(NumericalError::invalid_parameter(name, "must be a finite number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_method_names() {
        assert_eq!(
            RootFindingMethod::from_str("false_position").unwrap(),
            RootFindingMethod::FalsePosition
        );
        assert_eq!(RootFindingMethod::FixedPoint.to_string(), "fixed_point");
    }

    #[test]
    fn test_check_bracket_orders_endpoints() {
        let f = ClosureFunction::new(|x| x - 1.0, "x-1");
        match check_bracket(&f, 3.0, 0.0).unwrap() {
            BracketCheck::SignChange(br) => {
                assert_eq!((br.a, br.b), (0.0, 3.0));
                assert!(br.fa < 0.0 && br.fb > 0.0);
            }
            BracketCheck::Root(_) => panic!("no endpoint root expected"),
        }
        assert!(matches!(
            check_bracket(&f, 1.0, 3.0).unwrap(),
            BracketCheck::Root(r) if r == 1.0
        ));
        assert!(matches!(
            check_bracket(&f, 2.0, 3.0),
            Err(NumericalError::InvalidBracket { .. })
        ));
    }

    #[test]
    fn test_closure_function_reports_non_finite() {
        let f = ClosureFunction::new(|x| 1.0 / x, "1/x");
        assert!(f.evaluate(0.0).is_err());
        assert_eq!(f.name(), "1/x");
    }
}
