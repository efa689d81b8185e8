//! Direct solvers: partial-pivoting LU for dense systems and the Thomas
//! algorithm for tridiagonal ones.
use crate::numerical::errors::NumericalError;
use log::debug;
use nalgebra::{DMatrix, DVector};

/// relative pivot size below which the matrix is declared singular
pub const PIVOT_EPS: f64 = 1e-14;

/// Solve `A x = b` with LU factorisation (partial pivoting).
pub fn solve_lu(A: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, NumericalError> {
    let n = A.nrows();
    if n != A.ncols() || b.len() != n {
        return Err(NumericalError::DimensionMismatch(format!(
            "LU needs a square matrix and a matching right-hand side, got {}x{} and {}",
            n,
            A.ncols(),
            b.len()
        )));
    }
    let scale = A.amax();
    let lu = A.clone().lu();
    let u = lu.u();
    if let Some(i) = (0..n).find(|&i| u[(i, i)].abs() <= PIVOT_EPS * scale) {
        return Err(NumericalError::SingularMatrix(format!(
            "zero pivot in row {} of the LU factorisation",
            i
        )));
    }
    let x = lu.solve(b).ok_or_else(|| {
        NumericalError::SingularMatrix("LU factorisation could not be solved".to_string())
    })?;
    debug!("LU solution {:?}", x.as_slice());
    Ok(x)
}

/// Thomas algorithm for `lower[i-1] x[i-1] + diag[i] x[i] + upper[i] x[i+1] = rhs[i]`.
/// `lower` and `upper` have `n - 1` entries.
pub fn solve_tridiagonal(
    lower: &[f64],
    diag: &[f64],
    upper: &[f64],
    rhs: &[f64],
) -> Result<Vec<f64>, NumericalError> {
    let n = diag.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if lower.len() + 1 != n || upper.len() + 1 != n || rhs.len() != n {
        return Err(NumericalError::DimensionMismatch(format!(
            "tridiagonal system of size {} needs {} off-diagonal entries and {} right-hand side values",
            n,
            n - 1,
            n
        )));
    }
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];
    let mut denominator = diag[0];
    for i in 0..n {
        if i > 0 {
            denominator = diag[i] - lower[i - 1] * c_prime[i - 1];
        }
        if denominator.abs() < f64::MIN_POSITIVE {
            return Err(NumericalError::SingularMatrix(format!(
                "zero pivot in row {} of the tridiagonal system",
                i
            )));
        }
        if i + 1 < n {
            c_prime[i] = upper[i] / denominator;
        }
        let carried = if i > 0 { lower[i - 1] * d_prime[i - 1] } else { 0.0 };
        d_prime[i] = (rhs[i] - carried) / denominator;
    }
    let mut x = d_prime;
    for i in (0..n - 1).rev() {
        x[i] -= c_prime[i] * x[i + 1];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lu_solves_small_system() {
        let A = DMatrix::from_row_slice(3, 3, &[2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
        let b = DVector::from_vec(vec![8.0, -11.0, -3.0]);
        let x = solve_lu(&A, &b).unwrap();
        assert_relative_eq!(x, DVector::from_vec(vec![2.0, 3.0, -1.0]), epsilon = 1e-12);
    }

    #[test]
    fn test_lu_needs_pivoting() {
        let A = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![2.0, 3.0]);
        let x = solve_lu(&A, &b).unwrap();
        assert_relative_eq!(x, DVector::from_vec(vec![1.0, 2.0]), epsilon = 1e-14);
    }

    #[test]
    fn test_lu_singular() {
        let A = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(solve_lu(&A, &b), Err(NumericalError::SingularMatrix(_))));
    }

    #[test]
    fn test_thomas_matches_lu() {
        let lower = [1.0, 1.0, 1.0];
        let diag = [4.0, 4.0, 4.0, 4.0];
        let upper = [1.0, 1.0, 1.0];
        let rhs = [5.0, 6.0, 6.0, 5.0];
        let x = solve_tridiagonal(&lower, &diag, &upper, &rhs).unwrap();
        for xi in &x {
            assert_relative_eq!(*xi, 1.0, epsilon = 1e-14);
        }
        let A = DMatrix::from_fn(4, 4, |i, j| {
            if i == j {
                diag[i]
            } else if i == j + 1 {
                lower[j]
            } else if j == i + 1 {
                upper[i]
            } else {
                0.0
            }
        });
        let dense = solve_lu(&A, &DVector::from_column_slice(&rhs)).unwrap();
        assert_relative_eq!(DVector::from_vec(x), dense, epsilon = 1e-14);
    }

    #[test]
    fn test_thomas_single_equation_and_errors() {
        assert_eq!(solve_tridiagonal(&[], &[2.0], &[], &[4.0]).unwrap(), vec![2.0]);
        assert!(solve_tridiagonal(&[1.0], &[0.0, 1.0], &[1.0], &[1.0, 1.0]).is_err());
        assert!(matches!(
            solve_tridiagonal(&[1.0], &[1.0, 1.0, 1.0], &[1.0], &[1.0, 1.0, 1.0]),
            Err(NumericalError::DimensionMismatch(_))
        ));
    }
}
