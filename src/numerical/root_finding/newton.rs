//! Newton-Raphson method and its multiple-roots modification.
//!
//! Standard step: `x_{n+1} = x_n - f(x_n) / f'(x_n)`.
//!
//! For roots of multiplicity greater than one the standard iteration only
//! converges linearly. The modified step
//! `x_{n+1} = x_n - f f' / (f'^2 - f f'')`
//! is Newton's method applied to `f / f'`, which has only simple roots.
//!
//! The starting point is recorded as iteration 0.
use crate::numerical::error_metric::scalar_error;
use crate::numerical::errors::NumericalError;
use crate::numerical::iteration::{
    ConvergenceResult, IterationRecord, StepOutcome, StopCriteria, TraceRow, run_iterations,
};
use crate::numerical::root_finding::{RootFindingResult, ScalarFunction, check_start, vanishes};
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewtonRow {
    pub x: f64,
    pub fx: f64,
    pub dfx: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d2fx: Option<f64>,
}

impl TraceRow for NewtonRow {
    fn headers(&self) -> Vec<String> {
        ["x", "f(x)", "f'(x)", "f''(x)"].iter().map(|s| s.to_string()).collect()
    }

    fn values(&self) -> Vec<f64> {
        vec![self.x, self.fx, self.dfx, self.d2fx.unwrap_or(f64::NAN)]
    }
}

/// Evaluates f, f' and optionally f'' at one point
struct Evaluator<'a, F: ?Sized, D: ?Sized, D2: ?Sized> {
    f: &'a F,
    df: &'a D,
    d2f: Option<&'a D2>,
}

impl<F, D, D2> Evaluator<'_, F, D, D2>
where
    F: ScalarFunction + ?Sized,
    D: ScalarFunction + ?Sized,
    D2: ScalarFunction + ?Sized,
{
    fn row(&self, x: f64) -> Result<NewtonRow, NumericalError> {
        let fx = self.f.evaluate(x)?;
        let dfx = self.df.evaluate(x)?;
        let d2fx = match self.d2f {
            Some(d2f) => Some(d2f.evaluate(x)?),
            None => None,
        };
        Ok(NewtonRow { x, fx, dfx, d2fx })
    }

    fn next_point(&self, row: &NewtonRow, iteration: usize) -> Result<f64, NumericalError> {
        let x_new = match row.d2fx {
            None => {
                if vanishes(row.dfx) {
                    return Err(NumericalError::ZeroDerivative { x: row.x });
                }
                row.x - row.fx / row.dfx
            }
            Some(d2fx) => {
                let denominator = row.dfx * row.dfx - row.fx * d2fx;
                if vanishes(denominator) {
                    return Err(NumericalError::ZeroDenominator {
                        method: "newton_multiple_roots",
                        iteration,
                    });
                }
                row.x - row.fx * row.dfx / denominator
            }
        };
        if !x_new.is_finite() {
            return Err(NumericalError::NonFiniteIterate { iteration });
        }
        Ok(x_new)
    }
}

fn run_newton<F, D, D2>(
    method: &str,
    evaluator: Evaluator<'_, F, D, D2>,
    x0: f64,
    criteria: &StopCriteria,
) -> Result<RootFindingResult<NewtonRow>, NumericalError>
where
    F: ScalarFunction + ?Sized,
    D: ScalarFunction + ?Sized,
    D2: ScalarFunction + ?Sized,
{
    criteria.validate()?;
    check_start("x0", x0)?;
    info!("{} for f(x) = {} from x0 = {}", method, evaluator.f.name(), x0);
    let seed_row = evaluator.row(x0)?;
    let seed = vec![IterationRecord {
        iteration: 0,
        state: seed_row,
        error: f64::NAN,
    }];
    if seed_row.fx == 0.0 {
        return Ok(ConvergenceResult::converged_without_steps(method, x0, seed));
    }
    let mut current = seed_row;
    let result = run_iterations(method, criteria, seed, x0, |k| {
        let x_new = evaluator.next_point(&current, k)?;
        let row = evaluator.row(x_new)?;
        let error = scalar_error(Some(current.x), x_new, criteria.error_type);
        current = row;
        Ok(StepOutcome {
            state: row,
            approximation: x_new,
            error,
            exact: row.fx == 0.0,
        })
    });
    Ok(result)
}

pub fn newton<F, D>(
    f: &F,
    df: &D,
    x0: f64,
    criteria: &StopCriteria,
) -> Result<RootFindingResult<NewtonRow>, NumericalError>
where
    F: ScalarFunction + ?Sized,
    D: ScalarFunction + ?Sized,
{
    let evaluator: Evaluator<'_, F, D, D> = Evaluator { f, df, d2f: None };
    run_newton("newton", evaluator, x0, criteria)
}

pub fn newton_multiple_roots<F, D, D2>(
    f: &F,
    df: &D,
    d2f: &D2,
    x0: f64,
    criteria: &StopCriteria,
) -> Result<RootFindingResult<NewtonRow>, NumericalError>
where
    F: ScalarFunction + ?Sized,
    D: ScalarFunction + ?Sized,
    D2: ScalarFunction + ?Sized,
{
    let evaluator = Evaluator {
        f,
        df,
        d2f: Some(d2f),
    };
    run_newton("newton_multiple_roots", evaluator, x0, criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::iteration::Termination;
    use crate::symbolic::symbolic_functions::SymbolicFunction;
    use approx::assert_relative_eq;

    fn with_derivative(expr: &str) -> (SymbolicFunction, SymbolicFunction) {
        let f = SymbolicFunction::from_string(expr, "x").unwrap();
        let df = f.derivative().unwrap();
        (f, df)
    }

    #[test]
    fn test_newton_quadratic() {
        let (f, df) = with_derivative("x^2 - 4");
        let criteria = StopCriteria::new(1e-10, 50).unwrap();
        let result = newton(&f, &df, 1.0, &criteria).unwrap();
        assert!(result.converged());
        assert_relative_eq!(result.approximation, 2.0, epsilon = 1e-10);
        assert!(result.iterations() < 10);
        assert_eq!(result.trace[0].iteration, 0);
        assert_eq!(result.trace[0].state.x, 1.0);
        assert_eq!(result.trace[1].state.x, 2.5);
    }

    #[test]
    fn test_newton_without_real_root_does_not_converge() {
        let (f, df) = with_derivative("x^2 + 1");
        let criteria = StopCriteria::new(1e-6, 100).unwrap();
        let result = newton(&f, &df, 0.5, &criteria).unwrap();
        assert!(!result.converged());
        assert!(result.trace.len() > 1);
    }

    #[test]
    fn test_zero_derivative_keeps_trace() {
        let (f, df) = with_derivative("x^2 + 1");
        let result = newton(&f, &df, 0.0, &StopCriteria::default()).unwrap();
        assert_eq!(
            result.termination,
            Termination::NumericalFailure(NumericalError::ZeroDerivative { x: 0.0 })
        );
        assert_eq!(result.trace.len(), 1);
        assert_eq!(result.trace[0].state.dfx, 0.0);
    }

    #[test]
    fn test_evaluation_failure_mid_run() {
        // the first step from x0 = 3 jumps to a negative x where ln is undefined
        let (f, df) = with_derivative("ln(x)");
        let result = newton(&f, &df, 3.0, &StopCriteria::default()).unwrap();
        assert!(matches!(
            result.termination,
            Termination::NumericalFailure(NumericalError::Eval(_))
        ));
        assert_eq!(result.trace.len(), 1);
        assert_eq!(result.approximation, 3.0);
    }

    #[test]
    fn test_multiple_roots_variant_is_faster() {
        let (f, df) = with_derivative("(x - 1)^2*(x + 2)");
        let d2f = df.derivative().unwrap();
        let criteria = StopCriteria::new(1e-8, 100).unwrap();
        let plain = newton(&f, &df, 2.0, &criteria).unwrap();
        let modified = newton_multiple_roots(&f, &df, &d2f, 2.0, &criteria).unwrap();
        assert!(modified.converged());
        assert_relative_eq!(modified.approximation, 1.0, epsilon = 1e-8);
        assert!(modified.iterations() < plain.iterations());
        assert!(modified.trace.iter().all(|r| r.state.d2fx.is_some()));
    }

    #[test]
    fn test_root_at_starting_point() {
        let (f, df) = with_derivative("x^2 - 4");
        let result = newton(&f, &df, 2.0, &StopCriteria::default()).unwrap();
        assert!(result.converged());
        assert_eq!(result.iterations(), 0);
    }
}
