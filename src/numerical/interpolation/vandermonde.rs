//! Monomial coefficients from the Vandermonde system `V c = y`, `V_ij = x_i^j`.
use crate::numerical::errors::NumericalError;
use crate::numerical::interpolation::PointSet;
use crate::numerical::interpolation::polynomial::Polynomial;
use crate::somelinalg::LUsolver::solve_lu;
use crate::somelinalg::linear_sys_diagnostics::{condition_number, poorly_conditioned};
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// condition number above which a warning is logged
pub const CONDITION_WARNING: f64 = 1e10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VandermondeResult {
    /// row-major `V`
    pub matrix: Vec<Vec<f64>>,
    /// highest power first
    pub coefficients: Vec<f64>,
    pub polynomial: Polynomial,
    pub condition_number: f64,
}

pub fn vandermonde_matrix(x: &[f64]) -> DMatrix<f64> {
    let n = x.len();
    DMatrix::from_fn(n, n, |i, j| x[i].powi(j as i32))
}

pub fn vandermonde(points: &PointSet) -> Result<VandermondeResult, NumericalError> {
    let n = points.len();
    info!("Vandermonde interpolation through {} points", n);
    let V = vandermonde_matrix(points.x());
    let condition_number = condition_number(&V);
    poorly_conditioned(condition_number, CONDITION_WARNING);
    let y = DVector::from_column_slice(points.y());
    let solution = solve_lu(&V, &y)?;
    let polynomial = Polynomial::new(solution.iter().copied().collect());
    // keep every power, including leading zeros, so the length is always n
    let coefficients: Vec<f64> = solution.iter().rev().copied().collect();
    let matrix = V
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    Ok(VandermondeResult {
        matrix,
        coefficients,
        polynomial,
        condition_number,
    })
}
