//! False position (regula falsi).
//!
//! Same bracketing contract as bisection, but the new point is where the chord
//! through `(xl, f(xl))` and `(xu, f(xu))` crosses zero:
//! `xm = (xl f(xu) - xu f(xl)) / (f(xu) - f(xl))`.
use crate::numerical::error_metric::scalar_error;
use crate::numerical::errors::NumericalError;
use crate::numerical::iteration::{
    ConvergenceResult, StepOutcome, StopCriteria, TraceRow, run_iterations,
};
use crate::numerical::root_finding::{
    BracketCheck, RootFindingResult, ScalarFunction, check_bracket, vanishes,
};
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FalsePositionRow {
    pub xl: f64,
    pub xm: f64,
    pub xu: f64,
    pub f_x: f64,
}

impl TraceRow for FalsePositionRow {
    fn headers(&self) -> Vec<String> {
        ["xl", "xm", "xu", "f(xm)"].iter().map(|s| s.to_string()).collect()
    }

    fn values(&self) -> Vec<f64> {
        vec![self.xl, self.xm, self.xu, self.f_x]
    }
}

pub fn false_position<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    criteria: &StopCriteria,
) -> Result<RootFindingResult<FalsePositionRow>, NumericalError> {
    criteria.validate()?;
    let bracket = match check_bracket(f, a, b)? {
        BracketCheck::Root(root) => {
            return Ok(ConvergenceResult::converged_without_steps(
                "false_position",
                root,
                Vec::new(),
            ));
        }
        BracketCheck::SignChange(bracket) => bracket,
    };
    info!(
        "false position for f(x) = {} on [{}, {}]",
        f.name(),
        bracket.a,
        bracket.b
    );
    let (mut xl, mut xu, mut fl, mut fu) = (bracket.a, bracket.b, bracket.fa, bracket.fb);
    let mut previous: Option<f64> = None;
    let result = run_iterations("false_position", criteria, Vec::new(), xl, |k| {
        let denominator = fu - fl;
        if vanishes(denominator) {
            return Err(NumericalError::ZeroDenominator {
                method: "false_position",
                iteration: k,
            });
        }
        let xm = (xl * fu - xu * fl) / denominator;
        let f_x = f.evaluate(xm)?;
        let row = FalsePositionRow { xl, xm, xu, f_x };
        let error = scalar_error(previous, xm, criteria.error_type);
        previous = Some(xm);
        if (fl < 0.0) != (f_x < 0.0) {
            xu = xm;
            fu = f_x;
        } else {
            xl = xm;
            fl = f_x;
        }
        Ok(StepOutcome {
            state: row,
            approximation: xm,
            error,
            exact: f_x == 0.0,
        })
    });
    Ok(result)
}
