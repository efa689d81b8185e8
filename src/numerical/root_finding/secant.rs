//! Secant method.
//!
//! The two seeds are recorded as iterations 0 and 1; every following step is
//! `x_{n+1} = x_n - f(x_n) (x_n - x_{n-1}) / (f(x_n) - f(x_{n-1}))`.
use crate::numerical::error_metric::scalar_error;
use crate::numerical::errors::NumericalError;
use crate::numerical::iteration::{
    ConvergenceResult, IterationRecord, StepOutcome, StopCriteria, TraceRow, run_iterations,
};
use crate::numerical::root_finding::{RootFindingResult, ScalarFunction, check_start, vanishes};
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SecantRow {
    pub xi: f64,
    pub f_x: f64,
}

impl TraceRow for SecantRow {
    fn headers(&self) -> Vec<String> {
        ["xi", "f(xi)"].iter().map(|s| s.to_string()).collect()
    }

    fn values(&self) -> Vec<f64> {
        vec![self.xi, self.f_x]
    }
}

pub fn secant<F: ScalarFunction + ?Sized>(
    f: &F,
    x0: f64,
    x1: f64,
    criteria: &StopCriteria,
) -> Result<RootFindingResult<SecantRow>, NumericalError> {
    criteria.validate()?;
    check_start("x0", x0)?;
    check_start("x1", x1)?;
    if x0 == x1 {
        return Err(NumericalError::invalid_parameter(
            "x1",
            "the two starting points must differ",
        ));
    }
    info!("secant for f(x) = {} from x0 = {}, x1 = {}", f.name(), x0, x1);
    let f0 = f.evaluate(x0)?;
    let f1 = f.evaluate(x1)?;
    let seed = vec![
        IterationRecord {
            iteration: 0,
            state: SecantRow { xi: x0, f_x: f0 },
            error: f64::NAN,
        },
        IterationRecord {
            iteration: 1,
            state: SecantRow { xi: x1, f_x: f1 },
            error: scalar_error(Some(x0), x1, criteria.error_type),
        },
    ];
    if f0 == 0.0 {
        return Ok(ConvergenceResult::converged_without_steps("secant", x0, seed));
    }
    if f1 == 0.0 {
        return Ok(ConvergenceResult::converged_without_steps("secant", x1, seed));
    }
    let (mut x_prev, mut f_prev, mut x_cur, mut f_cur) = (x0, f0, x1, f1);
    let result = run_iterations("secant", criteria, seed, x1, |k| {
        let denominator = f_cur - f_prev;
        if vanishes(denominator) {
            return Err(NumericalError::ZeroDenominator {
                method: "secant",
                iteration: k,
            });
        }
        let x_new = x_cur - f_cur * (x_cur - x_prev) / denominator;
        if !x_new.is_finite() {
            return Err(NumericalError::NonFiniteIterate { iteration: k });
        }
        let f_new = f.evaluate(x_new)?;
        let error = scalar_error(Some(x_cur), x_new, criteria.error_type);
        (x_prev, f_prev, x_cur, f_cur) = (x_cur, f_cur, x_new, f_new);
        Ok(StepOutcome {
            state: SecantRow {
                xi: x_new,
                f_x: f_new,
            },
            approximation: x_new,
            error,
            exact: f_new == 0.0,
        })
    });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::iteration::Termination;
    use crate::numerical::root_finding::ClosureFunction;
    use crate::symbolic::symbolic_functions::SymbolicFunction;
    use approx::assert_relative_eq;

    #[test]
    fn test_secant_quadratic() {
        let f = SymbolicFunction::from_string("x^2 - 4", "x").unwrap();
        let criteria = StopCriteria::new(1e-10, 50).unwrap();
        let result = secant(&f, 0.0, 5.0, &criteria).unwrap();
        assert!(result.converged());
        assert_relative_eq!(result.approximation, 2.0, epsilon = 1e-9);
        assert_eq!(result.trace[0].state.xi, 0.0);
        assert_eq!(result.trace[1].state.xi, 5.0);
        assert_relative_eq!(result.trace[1].error, 5.0);
        assert_eq!(result.trace[2].iteration, 2);
    }

    #[test]
    fn test_flat_function_gives_zero_denominator() {
        let f = ClosureFunction::new(|_| 1.0, "1");
        let result = secant(&f, 0.0, 1.0, &StopCriteria::default()).unwrap();
        assert_eq!(
            result.termination,
            Termination::NumericalFailure(NumericalError::ZeroDenominator {
                method: "secant",
                iteration: 2
            })
        );
        assert_eq!(result.trace.len(), 2);
    }

    #[test]
    fn test_identical_seeds_rejected() {
        let f = SymbolicFunction::from_string("x - 1", "x").unwrap();
        assert!(secant(&f, 0.5, 0.5, &StopCriteria::default()).is_err());
    }

    #[test]
    fn test_cap_counts_steps_after_seeds() {
        let f = SymbolicFunction::from_string("x^2 + 1", "x").unwrap();
        let criteria = StopCriteria::new(1e-10, 4).unwrap();
        let result = secant(&f, 0.0, 1.0, &criteria).unwrap();
        assert!(!result.converged());
        assert!(result.trace.len() <= 6);
    }
}
