//! Bisection method.
//!
//! Requires a sign change on `[a, b]`. Each step evaluates the midpoint `xm`,
//! records the bracket it was computed from and keeps the half that still
//! contains a sign change. An exact zero at `xm` stops the run immediately.
use crate::numerical::error_metric::scalar_error;
use crate::numerical::errors::NumericalError;
use crate::numerical::iteration::{
    ConvergenceResult, StepOutcome, StopCriteria, TraceRow, run_iterations,
};
use crate::numerical::root_finding::{
    BracketCheck, RootFindingResult, ScalarFunction, check_bracket,
};
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BisectionRow {
    pub a: f64,
    pub b: f64,
    pub xm: f64,
    pub f_xm: f64,
}

impl TraceRow for BisectionRow {
    fn headers(&self) -> Vec<String> {
        ["a", "b", "xm", "f(xm)"].iter().map(|s| s.to_string()).collect()
    }

    fn values(&self) -> Vec<f64> {
        vec![self.a, self.b, self.xm, self.f_xm]
    }
}

pub fn bisection<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    criteria: &StopCriteria,
) -> Result<RootFindingResult<BisectionRow>, NumericalError> {
    criteria.validate()?;
    let bracket = match check_bracket(f, a, b)? {
        BracketCheck::Root(root) => {
            return Ok(ConvergenceResult::converged_without_steps(
                "bisection",
                root,
                Vec::new(),
            ));
        }
        BracketCheck::SignChange(bracket) => bracket,
    };
    info!(
        "bisection for f(x) = {} on [{}, {}]",
        f.name(),
        bracket.a,
        bracket.b
    );
    let (mut a, mut b, mut fa) = (bracket.a, bracket.b, bracket.fa);
    let mut previous: Option<f64> = None;
    let midpoint = a + (b - a) / 2.0;
    let result = run_iterations("bisection", criteria, Vec::new(), midpoint, |_| {
        let xm = a + (b - a) / 2.0;
        let f_xm = f.evaluate(xm)?;
        let row = BisectionRow { a, b, xm, f_xm };
        let error = scalar_error(previous, xm, criteria.error_type);
        previous = Some(xm);
        if (fa < 0.0) != (f_xm < 0.0) {
            b = xm;
        } else {
            a = xm;
            fa = f_xm;
        }
        Ok(StepOutcome {
            state: row,
            approximation: xm,
            error,
            exact: f_xm == 0.0,
        })
    });
    Ok(result)
}
