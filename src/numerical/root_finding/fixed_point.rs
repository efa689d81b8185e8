//! Fixed point iteration `x_{n+1} = g(x_n)`.
//!
//! `f` is only evaluated for the trace, so the table shows how close each
//! iterate is to a root of the original equation. No contraction check is made:
//! a divergent `g` simply runs into the iteration cap or a non-finite value.
use crate::numerical::error_metric::scalar_error;
use crate::numerical::errors::NumericalError;
use crate::numerical::iteration::{
    ConvergenceResult, IterationRecord, StepOutcome, StopCriteria, TraceRow, run_iterations,
};
use crate::numerical::root_finding::{RootFindingResult, ScalarFunction, check_start};
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixedPointRow {
    pub x: f64,
    pub g_x: f64,
    pub f_x: f64,
}

impl TraceRow for FixedPointRow {
    fn headers(&self) -> Vec<String> {
        ["x", "g(x)", "f(x)"].iter().map(|s| s.to_string()).collect()
    }

    fn values(&self) -> Vec<f64> {
        vec![self.x, self.g_x, self.f_x]
    }
}

pub fn fixed_point<F, G>(
    f: &F,
    g: &G,
    x0: f64,
    criteria: &StopCriteria,
) -> Result<RootFindingResult<FixedPointRow>, NumericalError>
where
    F: ScalarFunction + ?Sized,
    G: ScalarFunction + ?Sized,
{
    criteria.validate()?;
    check_start("x0", x0)?;
    info!(
        "fixed point for f(x) = {} with g(x) = {} from x0 = {}",
        f.name(),
        g.name(),
        x0
    );
    let row_at = |x: f64| -> Result<FixedPointRow, NumericalError> {
        Ok(FixedPointRow {
            x,
            g_x: g.evaluate(x)?,
            f_x: f.evaluate(x)?,
        })
    };
    let seed_row = row_at(x0)?;
    let seed = vec![IterationRecord {
        iteration: 0,
        state: seed_row,
        error: f64::NAN,
    }];
    if seed_row.f_x == 0.0 {
        return Ok(ConvergenceResult::converged_without_steps(
            "fixed_point",
            x0,
            seed,
        ));
    }
    let mut current = seed_row;
    let result = run_iterations("fixed_point", criteria, seed, x0, |_| {
        let x_new = current.g_x;
        let row = row_at(x_new)?;
        let error = scalar_error(Some(current.x), x_new, criteria.error_type);
        current = row;
        Ok(StepOutcome {
            state: row,
            approximation: x_new,
            error,
            exact: row.f_x == 0.0,
        })
    });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::iteration::Termination;
    use crate::symbolic::symbolic_functions::SymbolicFunction;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_point_cosine() {
        let f = SymbolicFunction::from_string("cos(x) - x", "x").unwrap();
        let g = SymbolicFunction::from_string("cos(x)", "x").unwrap();
        let criteria = StopCriteria::new(1e-8, 100).unwrap();
        let result = fixed_point(&f, &g, 0.5, &criteria).unwrap();
        assert!(result.converged());
        assert_relative_eq!(result.approximation, 0.7390851332151607, epsilon = 1e-7);
        // each recorded x is the previous g(x)
        for pair in result.trace.windows(2) {
            assert_eq!(pair[1].state.x, pair[0].state.g_x);
        }
    }

    #[test]
    fn test_divergent_map_hits_cap_or_overflow() {
        let f = SymbolicFunction::from_string("x^2 - x", "x").unwrap();
        let g = SymbolicFunction::from_string("x^2", "x").unwrap();
        let criteria = StopCriteria::new(1e-8, 100).unwrap();
        let result = fixed_point(&f, &g, 2.0, &criteria).unwrap();
        assert!(!result.converged());
        assert!(matches!(
            result.termination,
            Termination::NumericalFailure(NumericalError::Eval(_))
        ));
        assert!(result.trace.len() > 5);
    }

    #[test]
    fn test_slow_map_reaches_cap() {
        let f = SymbolicFunction::from_string("cos(x) - x", "x").unwrap();
        let g = SymbolicFunction::from_string("cos(x)", "x").unwrap();
        let criteria = StopCriteria::new(1e-12, 5).unwrap();
        let result = fixed_point(&f, &g, 0.5, &criteria).unwrap();
        assert_eq!(result.termination, Termination::MaxIterationsReached);
        assert_eq!(result.iterations(), 5);
    }
}
