//! Dense univariate polynomial in the monomial basis.
//!
//! Coefficients are stored lowest power first. `Display` writes a formula such as
//! `2*x^2 - 3*x + 1` that the expression parser accepts back.
use crate::symbolic::symbolic_engine::Expr;
use serde::Serialize;
use std::fmt;
use std::ops::{Add, Mul};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// `coefficients[k]` multiplies `x^k`
    pub fn new(coefficients: Vec<f64>) -> Self {
        let mut poly = Self { coefficients };
        poly.trim();
        poly
    }

    /// Coefficients given highest power first
    pub fn from_descending(coefficients: &[f64]) -> Self {
        Self::new(coefficients.iter().rev().copied().collect())
    }

    pub fn zero() -> Self {
        Self::new(vec![0.0])
    }

    pub fn constant(c: f64) -> Self {
        Self::new(vec![c])
    }

    /// `x - root`
    pub fn linear_factor(root: f64) -> Self {
        Self::new(vec![-root, 1.0])
    }

    fn trim(&mut self) {
        while self.coefficients.len() > 1 && self.coefficients.last() == Some(&0.0) {
            self.coefficients.pop();
        }
        if self.coefficients.is_empty() {
            self.coefficients.push(0.0);
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn descending(&self) -> Vec<f64> {
        self.coefficients.iter().rev().copied().collect()
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Horner scheme
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    pub fn derivative(&self) -> Polynomial {
        if self.coefficients.len() == 1 {
            return Polynomial::zero();
        }
        Polynomial::new(
            self.coefficients
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| k as f64 * c)
                .collect(),
        )
    }

    pub fn scale(&self, factor: f64) -> Polynomial {
        Polynomial::new(self.coefficients.iter().map(|c| c * factor).collect())
    }

    /// Symbolic form in the variable `var`
    pub fn to_expr(&self, var: &str) -> Expr {
        let x = Expr::Var(var.to_string());
        self.coefficients
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0.0)
            .map(|(k, c)| match k {
                0 => Expr::Const(*c),
                1 => Expr::Const(*c) * x.clone(),
                _ => Expr::Const(*c) * x.clone().pow(Expr::Const(k as f64)),
            })
            .reduce(|acc, term| acc + term)
            .unwrap_or(Expr::Const(0.0))
    }
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let n = self.coefficients.len().max(rhs.coefficients.len());
        let sum = (0..n)
            .map(|k| {
                self.coefficients.get(k).copied().unwrap_or(0.0)
                    + rhs.coefficients.get(k).copied().unwrap_or(0.0)
            })
            .collect();
        Polynomial::new(sum)
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        let mut product = vec![0.0; self.coefficients.len() + rhs.coefficients.len() - 1];
        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in rhs.coefficients.iter().enumerate() {
                product[i + j] += a * b;
            }
        }
        Polynomial::new(product)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, c) in self.coefficients.iter().enumerate().rev() {
            if *c == 0.0 {
                continue;
            }
            let magnitude = c.abs();
            let sign = if *c < 0.0 { "-" } else { "+" };
            if first {
                if *c < 0.0 {
                    write!(f, "-")?;
                }
            } else {
                write!(f, " {} ", sign)?;
            }
            match k {
                0 => write!(f, "{}", magnitude)?,
                1 => write!(f, "{}*x", magnitude)?,
                _ => write!(f, "{}*x^{}", magnitude, k)?,
            }
            first = false;
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}
