//! Distance between successive approximations.
//!
//! * absolute: `|current - previous|`
//! * relative: `|current - previous| / |current|`, `+inf` when `current == 0`
//!
//! Vectors use the Euclidean norm. Without a previous value the error is `NaN`,
//! and `NaN < tol` is false, so the first step can never be reported as converged.
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    #[default]
    Absolute,
    Relative,
}

pub fn scalar_error(previous: Option<f64>, current: f64, error_type: ErrorType) -> f64 {
    let Some(previous) = previous else {
        return f64::NAN;
    };
    let difference = (current - previous).abs();
    match error_type {
        ErrorType::Absolute => difference,
        ErrorType::Relative => {
            if current == 0.0 {
                f64::INFINITY
            } else {
                difference / current.abs()
            }
        }
    }
}

pub fn vector_error(previous: &DVector<f64>, current: &DVector<f64>, error_type: ErrorType) -> f64 {
    let difference = (current - previous).norm();
    match error_type {
        ErrorType::Absolute => difference,
        ErrorType::Relative => {
            let scale = current.norm();
            if scale == 0.0 {
                f64::INFINITY
            } else {
                difference / scale
            }
        }
    }
}

/// `false` for `NaN`
pub fn within_tolerance(error: f64, tol: f64) -> bool {
    error < tol
}
