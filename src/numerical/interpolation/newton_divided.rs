//! Newton form from the divided-difference table.
//!
//! `table[i][j] = f[x_i, ..., x_{i+j}]`; the first row holds the Newton
//! coefficients `P(x) = c_0 + c_1 (x - x_0) + c_2 (x - x_0)(x - x_1) + ...`.
use crate::numerical::errors::NumericalError;
use crate::numerical::interpolation::PointSet;
use crate::numerical::interpolation::polynomial::Polynomial;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewtonInterpolationResult {
    pub table: Vec<Vec<f64>>,
    pub coefficients: Vec<f64>,
    /// unexpanded Newton form
    pub newton_form: String,
    pub polynomial: Polynomial,
}

fn node_factor(x: f64) -> String {
    if x == 0.0 {
        "x".to_string()
    } else if x < 0.0 {
        format!("(x + {})", x.abs())
    } else {
        format!("(x - {})", x)
    }
}

pub fn newton_interpolation(points: &PointSet) -> Result<NewtonInterpolationResult, NumericalError> {
    let (x, y) = (points.x(), points.y());
    let n = points.len();
    info!("Newton divided differences through {} points", n);
    let mut table = vec![vec![0.0; n]; n];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = y[i];
    }
    for j in 1..n {
        for i in 0..n - j {
            let width = x[i + j] - x[i];
            if width == 0.0 {
                return Err(NumericalError::DuplicateAbscissa(x[i]));
            }
            table[i][j] = (table[i + 1][j - 1] - table[i][j - 1]) / width;
        }
    }
    let coefficients = table[0].clone();

    let mut polynomial = Polynomial::zero();
    let mut nodal = Polynomial::constant(1.0);
    let mut terms = Vec::with_capacity(n);
    let mut product = String::new();
    for (k, c) in coefficients.iter().enumerate() {
        polynomial = &polynomial + &nodal.scale(*c);
        nodal = &nodal * &Polynomial::linear_factor(x[k]);
        terms.push(if product.is_empty() {
            format!("({})", c)
        } else {
            format!("({})*{}", c, product)
        });
        if !product.is_empty() {
            product.push('*');
        }
        product.push_str(&node_factor(x[k]));
    }
    Ok(NewtonInterpolationResult {
        table,
        coefficients,
        newton_form: terms.join(" + "),
        polynomial,
    })
}
