//! Piecewise polynomial interpolation.
//!
//! Each interval `[x_i, x_{i+1}]` carries a tuple about its left endpoint:
//! `S_i(x) = a + b (x - x_i) + c (x - x_i)^2 + d (x - x_i)^3`,
//! truncated after `b` for linear and after `c` for quadratic splines.
//!
//! * linear: the chord through both endpoints
//! * quadratic: interpolation at both ends of every interval, continuous first
//!   derivative at interior knots and `c_0 = 0` (the first piece is a straight
//!   line). The `2m x 2m` system for `(b_i, c_i)` is solved with LU.
//! * cubic: natural spline (`S'' = 0` at both ends). The interior curvatures
//!   solve a tridiagonal system with the Thomas algorithm.
//!
//! Points are sorted by `x` first, so callers may pass them in any order.
use crate::numerical::errors::NumericalError;
use crate::numerical::interpolation::PointSet;
use crate::numerical::interpolation::polynomial::Polynomial;
use crate::somelinalg::LUsolver::{solve_lu, solve_tridiagonal};
use log::info;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum SplineKind {
    #[strum(to_string = "linear", serialize = "1")]
    Linear,
    #[strum(to_string = "quadratic", serialize = "2")]
    Quadratic,
    #[strum(to_string = "cubic", serialize = "3")]
    Cubic,
}

impl SplineKind {
    pub fn degree(&self) -> usize {
        match self {
            SplineKind::Linear => 1,
            SplineKind::Quadratic => 2,
            SplineKind::Cubic => 3,
        }
    }

    pub fn from_degree(degree: usize) -> Option<SplineKind> {
        match degree {
            1 => Some(SplineKind::Linear),
            2 => Some(SplineKind::Quadratic),
            3 => Some(SplineKind::Cubic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spline {
    pub kind: SplineKind,
    /// sorted abscissas
    pub knots: Vec<f64>,
    pub values: Vec<f64>,
    /// one tuple per interval, `degree + 1` entries each
    pub coefficients: Vec<Vec<f64>>,
}

impl Spline {
    pub fn intervals(&self) -> usize {
        self.coefficients.len()
    }

    fn piece_index(&self, x: f64) -> usize {
        // index of the interval whose left knot is the last one <= x
        let upper = self.knots.partition_point(|knot| *knot <= x);
        upper.saturating_sub(1).min(self.intervals() - 1)
    }

    /// Value of piece `i` at `x` (no range check, so it also extrapolates)
    pub fn evaluate_piece(&self, i: usize, x: f64) -> f64 {
        let t = x - self.knots[i];
        self.coefficients[i].iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    /// Outside `[x_0, x_n]` the end pieces are extended.
    pub fn evaluate(&self, x: f64) -> f64 {
        self.evaluate_piece(self.piece_index(x), x)
    }

    pub fn derivative_piece(&self, i: usize, x: f64) -> f64 {
        let t = x - self.knots[i];
        self.coefficients[i]
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, c)| k as f64 * c * t.powi(k as i32 - 1))
            .sum()
    }

    /// Piece `i` expanded in powers of the global `x`
    pub fn piece_polynomial(&self, i: usize) -> Polynomial {
        let shift = Polynomial::linear_factor(self.knots[i]);
        let mut power = Polynomial::constant(1.0);
        let mut result = Polynomial::zero();
        for c in &self.coefficients[i] {
            result = &result + &power.scale(*c);
            power = &power * &shift;
        }
        result
    }

    /// `S_i(x) = ... on [x_i, x_{i+1}]`, one line per interval
    pub fn describe(&self) -> Vec<String> {
        (0..self.intervals())
            .map(|i| {
                format!(
                    "{} on [{}, {}]",
                    self.piece_polynomial(i),
                    self.knots[i],
                    self.knots[i + 1]
                )
            })
            .collect()
    }
}

pub fn spline(points: &PointSet, kind: SplineKind) -> Result<Spline, NumericalError> {
    if points.len() < 2 {
        return Err(NumericalError::invalid_parameter(
            "x",
            "a spline needs at least two points",
        ));
    }
    let sorted = points.sorted();
    let (x, y) = (sorted.x(), sorted.y());
    info!("{} spline through {} points", kind, x.len());
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let slopes: Vec<f64> = (0..h.len()).map(|i| (y[i + 1] - y[i]) / h[i]).collect();
    let coefficients = match kind {
        SplineKind::Linear => (0..h.len()).map(|i| vec![y[i], slopes[i]]).collect(),
        SplineKind::Quadratic => quadratic_coefficients(y, &h)?,
        SplineKind::Cubic => cubic_coefficients(y, &h, &slopes)?,
    };
    Ok(Spline {
        kind,
        knots: x.to_vec(),
        values: y.to_vec(),
        coefficients,
    })
}

/// unknowns ordered `b_0, c_0, b_1, c_1, ...`
fn quadratic_coefficients(y: &[f64], h: &[f64]) -> Result<Vec<Vec<f64>>, NumericalError> {
    let m = h.len();
    let size = 2 * m;
    let mut A = DMatrix::zeros(size, size);
    let mut rhs = DVector::zeros(size);
    let mut row = 0;
    // S_i(x_{i+1}) = y_{i+1}
    for i in 0..m {
        A[(row, 2 * i)] = h[i];
        A[(row, 2 * i + 1)] = h[i] * h[i];
        rhs[row] = y[i + 1] - y[i];
        row += 1;
    }
    // S_i'(x_{i+1}) = S_{i+1}'(x_{i+1})
    for i in 0..m - 1 {
        A[(row, 2 * i)] = 1.0;
        A[(row, 2 * i + 1)] = 2.0 * h[i];
        A[(row, 2 * (i + 1))] = -1.0;
        row += 1;
    }
    A[(row, 1)] = 1.0;
    let solution = solve_lu(&A, &rhs)?;
    Ok((0..m)
        .map(|i| vec![y[i], solution[2 * i], solution[2 * i + 1]])
        .collect())
}

fn cubic_coefficients(
    y: &[f64],
    h: &[f64],
    slopes: &[f64],
) -> Result<Vec<Vec<f64>>, NumericalError> {
    let m = h.len();
    // c_0 = c_m = 0, interior c_1..c_{m-1}
    let interior = m - 1;
    let mut c = vec![0.0; m + 1];
    if interior > 0 {
        let lower: Vec<f64> = (1..interior).map(|k| h[k]).collect();
        let upper: Vec<f64> = (1..interior).map(|k| h[k]).collect();
        let diag: Vec<f64> = (1..=interior).map(|k| 2.0 * (h[k - 1] + h[k])).collect();
        let rhs: Vec<f64> = (1..=interior)
            .map(|k| 3.0 * (slopes[k] - slopes[k - 1]))
            .collect();
        let solved = solve_tridiagonal(&lower, &diag, &upper, &rhs)?;
        c[1..=interior].copy_from_slice(&solved);
    }
    Ok((0..m)
        .map(|i| {
            let b = slopes[i] - h[i] * (2.0 * c[i] + c[i + 1]) / 3.0;
            let d = (c[i + 1] - c[i]) / (3.0 * h[i]);
            vec![y[i], b, c[i], d]
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    fn sample() -> PointSet {
        PointSet::new(
            vec![0.0, 1.0, 2.5, 3.0, 4.5],
            vec![1.0, 2.0, 0.5, 1.5, -1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_all_kinds_interpolate_knots() {
        let points = sample();
        for kind in SplineKind::iter() {
            let s = spline(&points, kind).unwrap();
            assert_eq!(s.intervals(), 4);
            assert!(s.coefficients.iter().all(|c| c.len() == kind.degree() + 1));
            for i in 0..s.intervals() {
                assert_relative_eq!(s.evaluate_piece(i, s.knots[i]), s.values[i], epsilon = 1e-12);
                assert_relative_eq!(
                    s.evaluate_piece(i, s.knots[i + 1]),
                    s.values[i + 1],
                    epsilon = 1e-10
                );
            }
        }
    }

    #[test]
    fn test_continuity_of_value_and_slope() {
        let points = sample();
        for kind in [SplineKind::Quadratic, SplineKind::Cubic] {
            let s = spline(&points, kind).unwrap();
            for i in 0..s.intervals() - 1 {
                let knot = s.knots[i + 1];
                assert_relative_eq!(
                    s.evaluate_piece(i, knot),
                    s.evaluate_piece(i + 1, knot),
                    epsilon = 1e-10
                );
                assert_relative_eq!(
                    s.derivative_piece(i, knot),
                    s.derivative_piece(i + 1, knot),
                    epsilon = 1e-10
                );
            }
        }
    }

    #[test]
    fn test_cubic_second_derivative() {
        let s = spline(&sample(), SplineKind::Cubic).unwrap();
        let second = |i: usize, x: f64| {
            let c = &s.coefficients[i];
            2.0 * c[2] + 6.0 * c[3] * (x - s.knots[i])
        };
        // natural boundary
        assert_relative_eq!(second(0, s.knots[0]), 0.0, epsilon = 1e-12);
        let last = s.intervals() - 1;
        assert_relative_eq!(second(last, s.knots[last + 1]), 0.0, epsilon = 1e-10);
        for i in 0..last {
            let knot = s.knots[i + 1];
            assert_relative_eq!(second(i, knot), second(i + 1, knot), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_quadratic_first_piece_is_linear() {
        let s = spline(&sample(), SplineKind::Quadratic).unwrap();
        assert_relative_eq!(s.coefficients[0][2], 0.0, epsilon = 1e-14);
        assert_relative_eq!(s.coefficients[0][1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_data_reproduced() {
        let points = PointSet::new(vec![0.0, 1.0, 3.0, 4.0], vec![1.0, 3.0, 7.0, 9.0]).unwrap();
        for kind in SplineKind::iter() {
            let s = spline(&points, kind).unwrap();
            for x in [0.5, 2.0, 3.7] {
                assert_relative_eq!(s.evaluate(x), 2.0 * x + 1.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let points = PointSet::new(vec![2.0, 0.0, 1.0], vec![4.0, 0.0, 1.0]).unwrap();
        let s = spline(&points, SplineKind::Linear).unwrap();
        assert_eq!(s.knots, vec![0.0, 1.0, 2.0]);
        assert_eq!(s.coefficients, vec![vec![0.0, 1.0], vec![1.0, 3.0]]);
        assert_relative_eq!(s.evaluate(1.5), 2.5);
        // extrapolation extends the end pieces
        assert_relative_eq!(s.evaluate(-1.0), -1.0);
        assert_relative_eq!(s.evaluate(3.0), 7.0);
    }

    #[test]
    fn test_piece_polynomial_matches_local_form() {
        let s = spline(&sample(), SplineKind::Cubic).unwrap();
        for i in 0..s.intervals() {
            let p = s.piece_polynomial(i);
            let mid = 0.5 * (s.knots[i] + s.knots[i + 1]);
            assert_relative_eq!(p.evaluate(mid), s.evaluate_piece(i, mid), epsilon = 1e-10);
        }
        assert_eq!(s.describe().len(), 4);
    }

    #[test]
    fn test_two_points_and_errors() {
        let two = PointSet::new(vec![0.0, 2.0], vec![0.0, 4.0]).unwrap();
        let cubic = spline(&two, SplineKind::Cubic).unwrap();
        assert_eq!(cubic.coefficients, vec![vec![0.0, 2.0, 0.0, 0.0]]);
        let quad = spline(&two, SplineKind::Quadratic).unwrap();
        assert_relative_eq!(quad.coefficients[0][1], 2.0);
        let one = PointSet::new(vec![1.0], vec![1.0]).unwrap();
        assert!(spline(&one, SplineKind::Linear).is_err());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!("cubic".parse::<SplineKind>().unwrap(), SplineKind::Cubic);
        assert_eq!("2".parse::<SplineKind>().unwrap(), SplineKind::Quadratic);
        assert_eq!(SplineKind::Linear.to_string(), "linear");
        assert_eq!(SplineKind::from_degree(3), Some(SplineKind::Cubic));
        assert_eq!(SplineKind::from_degree(4), None);
    }
}
