//! Lagrange form `P(x) = Σ y_i L_i(x)` with `L_i(x) = Π_{j≠i} (x - x_j) / (x_i - x_j)`.
use crate::numerical::errors::NumericalError;
use crate::numerical::interpolation::PointSet;
use crate::numerical::interpolation::polynomial::Polynomial;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LagrangeResult {
    /// `L_i` as unexpanded products, e.g. `(x - 2)*(x - 3)/(2)`
    pub basis: Vec<String>,
    pub basis_polynomials: Vec<Polynomial>,
    pub polynomial: Polynomial,
}

fn factor(root: f64) -> String {
    if root == 0.0 {
        "x".to_string()
    } else if root < 0.0 {
        format!("(x + {})", root.abs())
    } else {
        format!("(x - {})", root)
    }
}

pub fn lagrange(points: &PointSet) -> Result<LagrangeResult, NumericalError> {
    let (x, y) = (points.x(), points.y());
    let n = points.len();
    info!("Lagrange interpolation through {} points", n);
    let mut basis = Vec::with_capacity(n);
    let mut basis_polynomials = Vec::with_capacity(n);
    let mut polynomial = Polynomial::zero();
    for i in 0..n {
        let mut numerator = Polynomial::constant(1.0);
        let mut factors = Vec::with_capacity(n.saturating_sub(1));
        let mut denominator = 1.0;
        for j in (0..n).filter(|&j| j != i) {
            let difference = x[i] - x[j];
            if difference == 0.0 {
                return Err(NumericalError::DuplicateAbscissa(x[i]));
            }
            numerator = &numerator * &Polynomial::linear_factor(x[j]);
            factors.push(factor(x[j]));
            denominator *= difference;
        }
        let L_i = numerator.scale(1.0 / denominator);
        basis.push(if factors.is_empty() {
            "1".to_string()
        } else {
            format!("{}/({})", factors.join("*"), denominator)
        });
        polynomial = &polynomial + &L_i.scale(y[i]);
        basis_polynomials.push(L_i);
    }
    Ok(LagrangeResult {
        basis,
        basis_polynomials,
        polynomial,
    })
}
