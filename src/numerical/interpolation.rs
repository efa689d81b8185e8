//! Polynomial and piecewise interpolation through a set of points.
//!
//! | method                     | result                                  | module             |
//! |----------------------------|-----------------------------------------|--------------------|
//! | Lagrange                   | basis polynomials and their sum         | [`lagrange`]       |
//! | Vandermonde                | monomial coefficients (LU solve)        | [`vandermonde`]    |
//! | Newton divided differences | divided-difference table, Newton form   | [`newton_divided`] |
//! | splines                    | one coefficient tuple per interval      | [`splines`]        |
//!
//! The three global methods build the same polynomial of degree `n - 1`, so their
//! values agree up to rounding. All of them reject repeated abscissas.
use crate::numerical::errors::NumericalError;
use strum_macros::{Display, EnumIter, EnumString};

pub mod lagrange;
pub mod newton_divided;
pub mod polynomial;
pub mod splines;
pub mod vandermonde;

pub use lagrange::{LagrangeResult, lagrange};
pub use newton_divided::{NewtonInterpolationResult, newton_interpolation};
pub use polynomial::Polynomial;
pub use splines::{Spline, SplineKind, spline};
pub use vandermonde::{VandermondeResult, vandermonde};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InterpolationMethod {
    Lagrange,
    Vandermonde,
    #[strum(to_string = "newton_interpolation", serialize = "newton")]
    NewtonInterpolation,
    Splines,
}

/// Validated `(x, y)` pairs: equal lengths, finite values, pairwise distinct `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl PointSet {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, NumericalError> {
        if x.len() != y.len() {
            return Err(NumericalError::DimensionMismatch(format!(
                "{} x values but {} y values",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(NumericalError::invalid_parameter(
                "x",
                "at least one point is required",
            ));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(NumericalError::invalid_parameter(
                "x, y",
                "all values must be finite",
            ));
        }
        let mut sorted = x.clone();
        sorted.sort_by(f64::total_cmp);
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(NumericalError::DuplicateAbscissa(pair[0]));
        }
        Ok(Self { x, y })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Copy with the pairs ordered by ascending `x`
    pub fn sorted(&self) -> PointSet {
        let mut pairs: Vec<(f64, f64)> = self.x.iter().copied().zip(self.y.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (x, y) = pairs.into_iter().unzip();
        PointSet { x, y }
    }
}
