use crate::numerical::errors::NumericalError;
use crate::somelinalg::linear_system::{LinearSystem, Splitting};
use log::{info, warn};
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// diagonal entries with `|a_ii| <= DIAGONAL_EPS * max|a_ij|` are treated as zero
pub const DIAGONAL_EPS: f64 = 1e-12;

/// Stationary scheme whose fixed-point form `x = T x + C` is analysed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StationaryScheme {
    Jacobi,
    GaussSeidel,
    Sor { omega: f64 },
}

/// Fixed-point form `x = T x + C` of a stationary iteration
#[derive(Debug, Clone, PartialEq)]
pub struct IterationMatrices {
    pub t: DMatrix<f64>,
    pub c: DVector<f64>,
}

/// Every stationary method divides by the diagonal: reject (near) zero entries.
pub fn check_diagonal(A: &DMatrix<f64>) -> Result<(), NumericalError> {
    let scale = A.amax();
    if scale == 0.0 {
        return Err(NumericalError::SingularMatrix(
            "matrix A is identically zero".to_string(),
        ));
    }
    for (i, a_ii) in A.diagonal().iter().enumerate() {
        if a_ii.abs() <= DIAGONAL_EPS * scale {
            return Err(NumericalError::SingularMatrix(format!(
                "diagonal entry a[{}][{}] = {} is zero",
                i, i, a_ii
            )));
        }
    }
    Ok(())
}

pub fn check_relaxation(omega: f64) -> Result<(), NumericalError> {
    if omega.is_finite() && omega > 0.0 && omega < 2.0 {
        Ok(())
    } else {
        Err(NumericalError::InvalidRelaxation(omega))
    }
}

/// Jacobi: `T = -D⁻¹(L+U)`, `C = D⁻¹b`
/// Gauss-Seidel: `T = -(D+L)⁻¹U`, `C = (D+L)⁻¹b`
/// SOR: `T = (D+ωL)⁻¹((1-ω)D - ωU)`, `C = ω(D+ωL)⁻¹b`
pub fn iteration_matrices(
    system: &LinearSystem,
    scheme: StationaryScheme,
) -> Result<IterationMatrices, NumericalError> {
    check_diagonal(system.a())?;
    let Splitting { d, l, u } = system.splitting();
    let b = system.b();
    match scheme {
        StationaryScheme::Jacobi => {
            let d_inv = DMatrix::from_diagonal(&d.diagonal().map(|v| 1.0 / v));
            let t = -(&d_inv * (&l + &u));
            let c = &d_inv * b;
            Ok(IterationMatrices { t, c })
        }
        StationaryScheme::GaussSeidel => {
            let m = &d + &l;
            let t = -lower_solve(&m, &u)?;
            let c = lower_solve_vec(&m, b)?;
            Ok(IterationMatrices { t, c })
        }
        StationaryScheme::Sor { omega } => {
            check_relaxation(omega)?;
            let m = &d + &l * omega;
            let n = &d * (1.0 - omega) - &u * omega;
            let t = lower_solve(&m, &n)?;
            let c = lower_solve_vec(&m, b)? * omega;
            Ok(IterationMatrices { t, c })
        }
    }
}

fn lower_solve(m: &DMatrix<f64>, rhs: &DMatrix<f64>) -> Result<DMatrix<f64>, NumericalError> {
    m.solve_lower_triangular(rhs).ok_or_else(|| {
        NumericalError::SingularMatrix("lower triangular factor is singular".to_string())
    })
}

fn lower_solve_vec(m: &DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, NumericalError> {
    m.solve_lower_triangular(rhs).ok_or_else(|| {
        NumericalError::SingularMatrix("lower triangular factor is singular".to_string())
    })
}

/// Largest eigenvalue modulus of `T`.
/// The QR sweeps test convergence relative to the diagonal, which stalls on
/// zero eigenvalues, so they run on `T + sI` and the shift is taken back out.
/// Symmetric `T` goes through the symmetric eigensolver, anything else through
/// the real Schur form. If the sweep does not settle the radius is estimated
/// from the norms of repeated squares of `T`.
pub fn spectral_radius(T: &DMatrix<f64>) -> f64 {
    let n = T.nrows();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return T[(0, 0)].abs();
    }
    let scale = T.amax();
    if scale == 0.0 {
        return 0.0;
    }
    let shift = 2.0 * scale * n as f64;
    let shifted = T + DMatrix::identity(n, n) * shift;
    let radius = if (T - T.transpose()).amax() <= f64::EPSILON * scale {
        SymmetricEigen::try_new(shifted, f64::EPSILON, SWEEP_LIMIT).map(|eigen| {
            eigen
                .eigenvalues
                .iter()
                .map(|lambda| (lambda - shift).abs())
                .fold(0.0, f64::max)
        })
    } else {
        shifted
            .try_schur(f64::EPSILON, SWEEP_LIMIT)
            .map(|schur| {
                schur
                    .complex_eigenvalues()
                    .iter()
                    .map(|z| (*z - shift).norm())
                    .fold(0.0, f64::max)
            })
    };
    match radius {
        Some(rho) => rho,
        None => {
            warn!("eigenvalue sweep did not converge, estimating spectral radius by squaring");
            squaring_estimate(T, SQUARINGS)
        }
    }
}

const SWEEP_LIMIT: usize = 10_000;
const SQUARINGS: usize = 12;

/// `ρ ≈ (‖T^{2k}‖ / ‖T^k‖)^{1/k}` with `k = 2^j`; the ratio cancels the
/// constant between the norm and the dominant eigenvalue power.
fn squaring_estimate(T: &DMatrix<f64>, squarings: usize) -> f64 {
    let mut power = T.clone();
    let norm = power.norm();
    if norm == 0.0 {
        return 0.0;
    }
    let mut log_norm = norm.ln();
    power /= norm;
    let mut estimate = norm;
    for j in 0..squarings {
        power = &power * &power;
        let norm = power.norm();
        if norm == 0.0 {
            return 0.0;
        }
        // power is T^(2^j) / ‖T^(2^j)‖, rescaled every step
        let next_log_norm = 2.0 * log_norm + norm.ln();
        estimate = ((next_log_norm - log_norm) / (1u64 << j) as f64).exp();
        log_norm = next_log_norm;
        power /= norm;
    }
    estimate
}

/// `converges` is reported, not enforced
pub fn convergence_verdict(rho: f64) -> bool {
    let converges = rho < 1.0;
    if converges {
        info!("spectral radius {:.6} < 1, the iteration converges", rho);
    } else {
        warn!(
            "spectral radius {:.6} >= 1, the iteration is not guaranteed to converge",
            rho
        );
    }
    converges
}

/// Ratio of the largest to the smallest singular value
pub fn condition_number(A: &DMatrix<f64>) -> f64 {
    let singular_values = A.singular_values();
    let max_sigma = singular_values.max();
    let min_sigma = singular_values.min();
    if min_sigma == 0.0 {
        f64::INFINITY
    } else {
        max_sigma / min_sigma
    }
}

/// Logs a warning when `condition_number` exceeds `threshold`
pub fn poorly_conditioned(condition_number: f64, threshold: f64) -> bool {
    let poorly_conditioned = condition_number > threshold;
    if poorly_conditioned {
        warn!(
            "The system of linear equations is poorly conditioned. Condition number = {:.2e}",
            condition_number
        );
    }
    poorly_conditioned
}

/// Strict row diagonal dominance, a sufficient condition for Jacobi and Gauss-Seidel
pub fn is_diagonally_dominant(A: &DMatrix<f64>) -> bool {
    A.row_iter().enumerate().all(|(i, row)| {
        let off_diagonal: f64 = row
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, v)| v.abs())
            .sum();
        row[i].abs() > off_diagonal
    })
}
