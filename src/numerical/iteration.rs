//! Shared iteration driver.
//!
//! Every iterative method supplies a step closure that turns iteration number `k`
//! into a new row of its trace. The driver owns the stopping rules: it stops when
//! the step reports an exact hit, when the error drops below `tol`, when the step
//! fails, or after `niter` steps. The accumulated trace is returned in all cases.
use crate::numerical::error_metric::{ErrorType, within_tolerance};
use crate::numerical::errors::NumericalError;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Upper bound accepted for `niter`
pub const MAX_ITERATIONS: usize = 100;

/// Stopping criteria common to all iterative methods
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopCriteria {
    pub tol: f64,
    pub niter: usize,
    pub error_type: ErrorType,
}

impl Default for StopCriteria {
    fn default() -> Self {
        Self {
            tol: 1e-7,
            niter: MAX_ITERATIONS,
            error_type: ErrorType::Absolute,
        }
    }
}

impl StopCriteria {
    /// `tol` must lie in `(0, 1]`, `niter` in `[1, 100]`
    pub fn new(tol: f64, niter: usize) -> Result<Self, NumericalError> {
        let criteria = Self {
            tol,
            niter,
            error_type: ErrorType::Absolute,
        };
        criteria.validate()?;
        Ok(criteria)
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn validate(&self) -> Result<(), NumericalError> {
        if !(self.tol.is_finite() && self.tol > 0.0 && self.tol <= 1.0) {
            return Err(NumericalError::invalid_parameter(
                "tol",
                format!("{} is not in (0, 1]", self.tol),
            ));
        }
        if self.niter == 0 || self.niter > MAX_ITERATIONS {
            return Err(NumericalError::invalid_parameter(
                "niter",
                format!("{} is not in [1, {}]", self.niter, MAX_ITERATIONS),
            ));
        }
        Ok(())
    }
}

/// One row of a trace. `state` holds the method-specific columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord<S> {
    pub iteration: usize,
    #[serde(flatten)]
    pub state: S,
    pub error: f64,
}

/// Column layout of a method's trace rows, used for tables and CSV export
pub trait TraceRow {
    fn headers(&self) -> Vec<String>;
    fn values(&self) -> Vec<f64>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Termination {
    Converged,
    MaxIterationsReached,
    NumericalFailure(NumericalError),
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        matches!(self, Termination::Converged)
    }

    pub fn status(&self) -> &'static str {
        match self {
            Termination::Converged => "converged",
            Termination::MaxIterationsReached => "max_iterations_reached",
            Termination::NumericalFailure(_) => "numerical_failure",
        }
    }

    pub fn failure(&self) -> Option<&NumericalError> {
        match self {
            Termination::NumericalFailure(err) => Some(err),
            _ => None,
        }
    }
}

/// What a single step produced
#[derive(Debug, Clone)]
pub struct StepOutcome<S, V> {
    pub state: S,
    pub approximation: V,
    pub error: f64,
    /// the step landed exactly on the solution (e.g. `f(xm) == 0`)
    pub exact: bool,
}

#[derive(Debug, Clone)]
pub struct ConvergenceResult<S, V> {
    pub method: String,
    pub approximation: V,
    pub trace: Vec<IterationRecord<S>>,
    pub termination: Termination,
    pub elapsed: Duration,
}

impl<S, V> ConvergenceResult<S, V> {
    /// Solution found before any step was taken (e.g. a bracket endpoint is a root)
    pub fn converged_without_steps(
        method: &str,
        approximation: V,
        trace: Vec<IterationRecord<S>>,
    ) -> Self {
        info!("{}: starting point is already a root", method);
        Self {
            method: method.to_string(),
            approximation,
            trace,
            termination: Termination::Converged,
            elapsed: Duration::ZERO,
        }
    }

    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }

    /// Index of the last recorded iteration
    pub fn iterations(&self) -> usize {
        self.trace.last().map(|r| r.iteration).unwrap_or(0)
    }

    pub fn final_error(&self) -> f64 {
        self.trace.last().map(|r| r.error).unwrap_or(f64::NAN)
    }
}

/// Run `step` for at most `criteria.niter` iterations after the `seed` rows.
/// Iteration numbers continue from the last seed row (or start at 1).
pub fn run_iterations<S, V, F>(
    method: &str,
    criteria: &StopCriteria,
    seed: Vec<IterationRecord<S>>,
    initial: V,
    mut step: F,
) -> ConvergenceResult<S, V>
where
    F: FnMut(usize) -> Result<StepOutcome<S, V>, NumericalError>,
{
    let start = Instant::now();
    let mut trace = seed;
    let mut approximation = initial;
    let mut termination = Termination::MaxIterationsReached;
    let first = trace.last().map(|r| r.iteration + 1).unwrap_or(1);
    info!(
        "{}: tol = {:e}, niter = {}, error = {}",
        method, criteria.tol, criteria.niter, criteria.error_type
    );
    for k in first..first + criteria.niter {
        match step(k) {
            Ok(outcome) => {
                let converged = outcome.exact || within_tolerance(outcome.error, criteria.tol);
                debug!("{}: iteration {} error {:e}", method, k, outcome.error);
                trace.push(IterationRecord {
                    iteration: k,
                    state: outcome.state,
                    error: outcome.error,
                });
                approximation = outcome.approximation;
                if converged {
                    termination = Termination::Converged;
                    break;
                }
            }
            Err(err) => {
                warn!("{}: stopped at iteration {}: {}", method, k, err);
                termination = Termination::NumericalFailure(err);
                break;
            }
        }
    }
    let elapsed = start.elapsed();
    match &termination {
        Termination::Converged => info!(
            "{}: converged after {} iterations in {:?}",
            method,
            trace.last().map(|r| r.iteration).unwrap_or(0),
            elapsed
        ),
        Termination::MaxIterationsReached => {
            warn!("{}: no convergence within {} iterations", method, criteria.niter)
        }
        Termination::NumericalFailure(_) => {}
    }
    ConvergenceResult {
        method: method.to_string(),
        approximation,
        trace,
        termination,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_criteria_validation() {
        assert!(StopCriteria::new(1e-6, 50).is_ok());
        assert!(StopCriteria::new(1.0, 100).is_ok());
        for (tol, niter) in [(0.0, 10), (-1.0, 10), (1.5, 10), (f64::NAN, 10), (1e-3, 0), (1e-3, 101)] {
            assert!(matches!(
                StopCriteria::new(tol, niter),
                Err(NumericalError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_driver_stops_on_tolerance() {
        // halving sequence: error after step k is 2^-k
        let criteria = StopCriteria::new(1e-3, 100).unwrap();
        let mut x: f64 = 1.0;
        let result = run_iterations("halving", &criteria, Vec::new(), x, |_| {
            let next = x / 2.0;
            let error = (next - x).abs();
            x = next;
            Ok(StepOutcome {
                state: (),
                approximation: next,
                error,
                exact: false,
            })
        });
        assert!(result.converged());
        assert_eq!(result.iterations(), 10);
        assert_relative_eq!(result.approximation, 2f64.powi(-10));
    }

    #[test]
    fn test_driver_respects_cap_and_seed_numbering() {
        let criteria = StopCriteria::new(1e-3, 5).unwrap();
        let seed = vec![IterationRecord {
            iteration: 0,
            state: (),
            error: f64::NAN,
        }];
        let result = run_iterations("constant", &criteria, seed, 0.0, |k| {
            Ok(StepOutcome {
                state: (),
                approximation: k as f64,
                error: 1.0,
                exact: false,
            })
        });
        assert_eq!(result.termination, Termination::MaxIterationsReached);
        assert_eq!(result.trace.len(), 6);
        assert_eq!(result.iterations(), 5);
        let numbers: Vec<usize> = result.trace.iter().map(|r| r.iteration).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_driver_keeps_trace_on_failure() {
        let criteria = StopCriteria::new(1e-3, 10).unwrap();
        let result = run_iterations("failing", &criteria, Vec::new(), 0.0, |k| {
            if k == 3 {
                Err(NumericalError::ZeroDerivative { x: 1.0 })
            } else {
                Ok(StepOutcome {
                    state: (),
                    approximation: k as f64,
                    error: 1.0,
                    exact: false,
                })
            }
        });
        assert_eq!(result.trace.len(), 2);
        assert_relative_eq!(result.approximation, 2.0);
        assert_eq!(
            result.termination.failure(),
            Some(&NumericalError::ZeroDerivative { x: 1.0 })
        );
    }

    #[test]
    fn test_nan_error_does_not_converge() {
        let criteria = StopCriteria::new(1e-3, 2).unwrap();
        let result = run_iterations("nan", &criteria, Vec::new(), 0.0, |_| {
            Ok(StepOutcome {
                state: (),
                approximation: 0.0,
                error: f64::NAN,
                exact: false,
            })
        });
        assert!(!result.converged());
    }
}
