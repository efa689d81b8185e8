//! Stationary iterative solvers for `A x = b`: Jacobi, Gauss-Seidel and SOR.
//!
//! All three share one loop (see [`crate::numerical::iteration::run_iterations`]);
//! only the sweep differs. Before the first sweep the iteration matrix `T` of
//! the fixed-point form `x = T x + C` is built and its spectral radius reported.
//! A radius `>= 1` only produces a warning: the iteration still runs.
//!
//! The initial vector is recorded as iteration 0.
//!
//! # Example
//! ```
//! use RustedNumAn::somelinalg::linear_system::LinearSystem;
//! use RustedNumAn::somelinalg::iterative_solvers_cpu::gauss_seidel;
//! use RustedNumAn::numerical::iteration::StopCriteria;
//! let system = LinearSystem::from_rows(
//!     &[vec![4.0, 1.0], vec![2.0, 3.0]],
//!     &[1.0, 2.0],
//!     &[0.0, 0.0],
//! ).unwrap();
//! let criteria = StopCriteria::new(1e-8, 100).unwrap();
//! let result = gauss_seidel(&system, &criteria).unwrap();
//! assert!(result.converges);
//! assert!((result.solution()[0] - 0.1).abs() < 1e-7);
//! ```
use crate::numerical::error_metric::vector_error;
use crate::numerical::errors::NumericalError;
use crate::numerical::iteration::{
    ConvergenceResult, IterationRecord, StepOutcome, StopCriteria, TraceRow, run_iterations,
};
use crate::somelinalg::linear_sys_diagnostics::{
    IterationMatrices, StationaryScheme, check_relaxation, convergence_verdict,
    iteration_matrices, spectral_radius,
};
use crate::somelinalg::linear_system::LinearSystem;
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

/// relaxation factor used when a request does not give one
pub const DEFAULT_RELAXATION: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LinearMethod {
    Jacobi,
    GaussSeidel,
    Sor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearRow {
    pub x: Vec<f64>,
}

impl TraceRow for LinearRow {
    fn headers(&self) -> Vec<String> {
        (1..=self.x.len()).map(|i| format!("x{}", i)).collect()
    }

    fn values(&self) -> Vec<f64> {
        self.x.clone()
    }
}

#[derive(Debug, Clone)]
pub struct LinearSolveResult {
    pub result: ConvergenceResult<LinearRow, DVector<f64>>,
    pub spectral_radius: f64,
    /// `spectral_radius < 1`
    pub converges: bool,
    pub transition_matrix: DMatrix<f64>,
    pub coefficient_vector: DVector<f64>,
}

impl LinearSolveResult {
    pub fn solution(&self) -> &DVector<f64> {
        &self.result.approximation
    }
}

pub fn jacobi(
    system: &LinearSystem,
    criteria: &StopCriteria,
) -> Result<LinearSolveResult, NumericalError> {
    solve_stationary(system, StationaryScheme::Jacobi, criteria)
}

pub fn gauss_seidel(
    system: &LinearSystem,
    criteria: &StopCriteria,
) -> Result<LinearSolveResult, NumericalError> {
    solve_stationary(system, StationaryScheme::GaussSeidel, criteria)
}

pub fn sor(
    system: &LinearSystem,
    omega: f64,
    criteria: &StopCriteria,
) -> Result<LinearSolveResult, NumericalError> {
    solve_stationary(system, StationaryScheme::Sor { omega }, criteria)
}

/// Dispatch by method name; `omega` is only read for SOR.
pub fn solve_linear(
    method: LinearMethod,
    system: &LinearSystem,
    omega: f64,
    criteria: &StopCriteria,
) -> Result<LinearSolveResult, NumericalError> {
    match method {
        LinearMethod::Jacobi => jacobi(system, criteria),
        LinearMethod::GaussSeidel => gauss_seidel(system, criteria),
        LinearMethod::Sor => sor(system, omega, criteria),
    }
}

fn method_name(scheme: StationaryScheme) -> &'static str {
    match scheme {
        StationaryScheme::Jacobi => "jacobi",
        StationaryScheme::GaussSeidel => "gauss_seidel",
        StationaryScheme::Sor { .. } => "sor",
    }
}

pub fn solve_stationary(
    system: &LinearSystem,
    scheme: StationaryScheme,
    criteria: &StopCriteria,
) -> Result<LinearSolveResult, NumericalError> {
    criteria.validate()?;
    if let StationaryScheme::Sor { omega } = scheme {
        check_relaxation(omega)?;
    }
    let method = method_name(scheme);
    let IterationMatrices { t, c } = iteration_matrices(system, scheme)?;
    let rho = spectral_radius(&t);
    info!("{}: n = {}, spectral radius = {:.6}", method, system.dim(), rho);
    let converges = convergence_verdict(rho);

    let A = system.a();
    let b = system.b();
    let n = system.dim();
    let x0 = system.x0().clone();
    let seed = vec![IterationRecord {
        iteration: 0,
        state: LinearRow {
            x: x0.iter().copied().collect(),
        },
        error: f64::NAN,
    }];
    let mut x = x0.clone();
    let result = run_iterations(method, criteria, seed, x0, |k| {
        let mut x_new = x.clone();
        for i in 0..n {
            // Jacobi reads only the previous sweep; GS and SOR reuse updated entries
            let source = match scheme {
                StationaryScheme::Jacobi => &x,
                _ => &x_new,
            };
            let sum: f64 = (0..n)
                .filter(|&j| j != i)
                .map(|j| A[(i, j)] * source[j])
                .sum();
            let gs = (b[i] - sum) / A[(i, i)];
            x_new[i] = match scheme {
                StationaryScheme::Sor { omega } => (1.0 - omega) * x[i] + omega * gs,
                _ => gs,
            };
        }
        if x_new.iter().any(|v| !v.is_finite()) {
            return Err(NumericalError::NonFiniteIterate { iteration: k });
        }
        let error = vector_error(&x, &x_new, criteria.error_type);
        x = x_new.clone();
        Ok(StepOutcome {
            state: LinearRow {
                x: x_new.iter().copied().collect(),
            },
            approximation: x_new,
            error,
            exact: false,
        })
    });
    Ok(LinearSolveResult {
        result,
        spectral_radius: rho,
        converges,
        transition_matrix: t,
        coefficient_vector: c,
    })
}
