//! Dense square system `A x = b` with an initial guess `x0`.
//!
//! Construction checks every shape and finiteness requirement, so the solvers can
//! index freely. The additive splitting `A = D + L + U` (diagonal, strictly lower,
//! strictly upper) is computed on demand.
use crate::numerical::errors::NumericalError;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    a: DMatrix<f64>,
    b: DVector<f64>,
    x0: DVector<f64>,
}

/// `A = D + L + U`
#[derive(Debug, Clone, PartialEq)]
pub struct Splitting {
    pub d: DMatrix<f64>,
    pub l: DMatrix<f64>,
    pub u: DMatrix<f64>,
}

impl LinearSystem {
    pub fn new(
        a: DMatrix<f64>,
        b: DVector<f64>,
        x0: DVector<f64>,
    ) -> Result<Self, NumericalError> {
        let (rows, cols) = a.shape();
        if rows == 0 {
            return Err(NumericalError::DimensionMismatch(
                "matrix A is empty".to_string(),
            ));
        }
        if rows != cols {
            return Err(NumericalError::DimensionMismatch(format!(
                "matrix A must be square, got {}x{}",
                rows, cols
            )));
        }
        if b.len() != rows {
            return Err(NumericalError::DimensionMismatch(format!(
                "vector b has {} entries, A has {} rows",
                b.len(),
                rows
            )));
        }
        if x0.len() != rows {
            return Err(NumericalError::DimensionMismatch(format!(
                "initial vector x0 has {} entries, A has {} rows",
                x0.len(),
                rows
            )));
        }
        if a.iter().any(|v| !v.is_finite()) {
            return Err(NumericalError::invalid_parameter(
                "matrix_a",
                "all entries must be finite",
            ));
        }
        if b.iter().any(|v| !v.is_finite()) {
            return Err(NumericalError::invalid_parameter(
                "vector_b",
                "all entries must be finite",
            ));
        }
        if x0.iter().any(|v| !v.is_finite()) {
            return Err(NumericalError::invalid_parameter(
                "x0",
                "all entries must be finite",
            ));
        }
        Ok(Self { a, b, x0 })
    }

    /// Build from row-major nested vectors as they come from a request
    pub fn from_rows(
        rows: &[Vec<f64>],
        b: &[f64],
        x0: &[f64],
    ) -> Result<Self, NumericalError> {
        let n = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != n) {
            return Err(NumericalError::DimensionMismatch(format!(
                "row {} of A has {} entries, expected {}",
                i,
                row.len(),
                n
            )));
        }
        let a = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::new(a, DVector::from_column_slice(b), DVector::from_column_slice(x0))
    }

    pub fn dim(&self) -> usize {
        self.a.nrows()
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    pub fn x0(&self) -> &DVector<f64> {
        &self.x0
    }

    pub fn splitting(&self) -> Splitting {
        let d = DMatrix::from_diagonal(&self.a.diagonal());
        let mut l = self.a.lower_triangle();
        l.fill_diagonal(0.0);
        let mut u = self.a.upper_triangle();
        u.fill_diagonal(0.0);
        Splitting { d, l, u }
    }

    /// `‖A x − b‖₂`
    pub fn residual_norm(&self, x: &DVector<f64>) -> f64 {
        (&self.a * x - &self.b).norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitting_reassembles_matrix() {
        let system = LinearSystem::from_rows(
            &[
                vec![4.0, 1.0, 2.0],
                vec![3.0, 5.0, 1.0],
                vec![1.0, 1.0, 3.0],
            ],
            &[1.0, 2.0, 3.0],
            &[0.0, 0.0, 0.0],
        )
        .unwrap();
        let Splitting { d, l, u } = system.splitting();
        assert_eq!(&d + &l + &u, *system.a());
        assert_eq!(l[(1, 0)], 3.0);
        assert_eq!(l[(0, 1)], 0.0);
        assert_eq!(u[(0, 2)], 2.0);
        assert_eq!(d[(2, 2)], 3.0);
        assert_eq!(d[(0, 1)], 0.0);
    }

    #[test]
    fn test_dimension_checks() {
        let ragged = LinearSystem::from_rows(&[vec![1.0, 2.0], vec![3.0]], &[1.0, 1.0], &[0.0, 0.0]);
        assert!(matches!(ragged, Err(NumericalError::DimensionMismatch(_))));
        let short_b = LinearSystem::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[1.0], &[0.0, 0.0]);
        assert!(matches!(short_b, Err(NumericalError::DimensionMismatch(_))));
        let short_x0 = LinearSystem::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[1.0, 1.0], &[0.0]);
        assert!(matches!(short_x0, Err(NumericalError::DimensionMismatch(_))));
        let empty = LinearSystem::from_rows(&[], &[], &[]);
        assert!(matches!(empty, Err(NumericalError::DimensionMismatch(_))));
        let rect = LinearSystem::new(DMatrix::zeros(2, 3), DVector::zeros(2), DVector::zeros(2));
        assert!(matches!(rect, Err(NumericalError::DimensionMismatch(_))));
    }

    #[test]
    fn test_non_finite_entries_rejected() {
        let result = LinearSystem::from_rows(
            &[vec![1.0, f64::NAN], vec![0.0, 1.0]],
            &[1.0, 1.0],
            &[0.0, 0.0],
        );
        assert!(matches!(result, Err(NumericalError::InvalidParameter { .. })));
    }

    #[test]
    fn test_residual() {
        let system =
            LinearSystem::from_rows(&[vec![4.0, 1.0], vec![2.0, 3.0]], &[1.0, 2.0], &[0.0, 0.0])
                .unwrap();
        let x = DVector::from_vec(vec![0.1, 0.6]);
        assert!(system.residual_norm(&x) < 1e-14);
    }
}
