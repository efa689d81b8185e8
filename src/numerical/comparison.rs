//! Run every method of a family on the same input and summarise the outcome.
//!
//! Strategies are independent, so they run on the rayon pool; `collect` on an
//! indexed parallel iterator keeps the declaration order. One failing strategy
//! becomes a non-convergent row and never aborts the batch. Only malformed
//! expressions reject the whole request, before anything runs.
//!
//! Field names of the serialized rows follow the established response format
//! (`metodo`, `iteraciones`, ...). Every row also gets a `rank`: converged rows
//! first, then fewer iterations, then smaller final error.
use crate::numerical::errors::NumericalError;
use crate::numerical::interpolation::splines::SplineKind;
use crate::numerical::interpolation::{
    InterpolationMethod, PointSet, lagrange, newton_interpolation, spline, vandermonde,
};
use crate::numerical::iteration::{ConvergenceResult, StopCriteria};
use crate::numerical::root_finding::{
    RootFindingMethod, bisection, false_position, fixed_point, newton, secant,
};
use crate::somelinalg::iterative_solvers_cpu::{LinearMethod, solve_linear};
use crate::somelinalg::linear_system::LinearSystem;
use crate::symbolic::symbolic_functions::SymbolicFunction;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::time::Instant;
use strum::IntoEnumIterator;
use tabled::{builder::Builder, settings::Style};

/// Rows that can be rendered as one line of a summary table
pub trait ComparisonRow {
    fn table_headers() -> Vec<String>;
    fn table_record(&self) -> Vec<String>;
}

pub fn summary_table<R: ComparisonRow>(rows: &[R]) -> String {
    let mut builder = Builder::default();
    builder.push_record(R::table_headers());
    for row in rows {
        builder.push_record(row.table_record());
    }
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.to_string()
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "-".to_string()
    } else {
        format!("{:.6e}", value)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// 1-based ranks: converged first, then fewer iterations, then smaller error (NaN last)
fn assign_ranks(keys: &[(bool, usize, f64)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&i, &j| {
        let (ci, ni, ei) = keys[i];
        let (cj, nj, ej) = keys[j];
        cj.cmp(&ci).then(ni.cmp(&nj)).then_with(|| match (ei.is_nan(), ej.is_nan()) {
            (false, false) => ei.total_cmp(&ej),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (true, true) => Ordering::Equal,
        })
    });
    let mut ranks = vec![0; keys.len()];
    for (position, index) in order.into_iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

////////////////////////////////////////////////////////////////////////////////
//                          ROOT FINDING
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootComparisonRow {
    #[serde(rename = "metodo")]
    pub method: String,
    #[serde(rename = "raiz")]
    pub root: Option<f64>,
    #[serde(rename = "iteraciones")]
    pub iterations: usize,
    pub error: f64,
    #[serde(rename = "converge")]
    pub converged: bool,
    pub tiempo_ms: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub rank: usize,
}

impl ComparisonRow for RootComparisonRow {
    fn table_headers() -> Vec<String> {
        ["rank", "method", "root", "iterations", "error", "converged", "time, ms", "status"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn table_record(&self) -> Vec<String> {
        vec![
            self.rank.to_string(),
            self.method.clone(),
            self.root.map(|r| format!("{:.10}", r)).unwrap_or_else(|| "-".to_string()),
            self.iterations.to_string(),
            format_number(self.error),
            self.converged.to_string(),
            format!("{:.3}", self.tiempo_ms),
            self.message.clone().unwrap_or_else(|| self.status.clone()),
        ]
    }
}

/// Shared input of the root-finding comparison. The bracket methods use `[x0, x1]`.
#[derive(Debug)]
pub struct RootComparisonInput {
    pub f: SymbolicFunction,
    /// derived symbolically from `f` when not given
    pub df: SymbolicFunction,
    pub g: Option<SymbolicFunction>,
    pub x0: f64,
    pub x1: Option<f64>,
    pub criteria: StopCriteria,
}

impl RootComparisonInput {
    pub fn parse(
        fx: &str,
        dfx: Option<&str>,
        g: Option<&str>,
        x0: f64,
        x1: Option<f64>,
        criteria: StopCriteria,
    ) -> Result<Self, NumericalError> {
        let f = SymbolicFunction::from_string(fx, "x")?;
        let df = match dfx {
            Some(text) => SymbolicFunction::from_string(text, "x")?,
            None => f.derivative()?,
        };
        let g = g.map(|text| SymbolicFunction::from_string(text, "x")).transpose()?;
        Ok(Self {
            f,
            df,
            g,
            x0,
            x1,
            criteria,
        })
    }
}

fn root_row<S>(
    method: RootFindingMethod,
    outcome: Result<ConvergenceResult<S, f64>, NumericalError>,
    start: Instant,
) -> RootComparisonRow {
    let tiempo_ms = elapsed_ms(start);
    match outcome {
        Ok(result) => RootComparisonRow {
            method: method.to_string(),
            root: Some(result.approximation),
            iterations: result.iterations(),
            error: result.final_error(),
            converged: result.converged(),
            tiempo_ms,
            status: result.termination.status().to_string(),
            message: result.termination.failure().map(|e| e.to_string()),
            rank: 0,
        },
        Err(err) => {
            warn!("{} failed: {}", method, err);
            RootComparisonRow {
                method: method.to_string(),
                root: None,
                iterations: 0,
                error: f64::NAN,
                converged: false,
                tiempo_ms,
                status: "error".to_string(),
                message: Some(err.to_string()),
                rank: 0,
            }
        }
    }
}

fn run_root_strategy(method: RootFindingMethod, input: &RootComparisonInput) -> RootComparisonRow {
    let start = Instant::now();
    let criteria = &input.criteria;
    let x1 = input
        .x1
        .ok_or_else(|| NumericalError::MissingField("x1".to_string()));
    match method {
        RootFindingMethod::Bisection => root_row(
            method,
            x1.and_then(|b| bisection(&input.f, input.x0, b, criteria)),
            start,
        ),
        RootFindingMethod::FalsePosition => root_row(
            method,
            x1.and_then(|b| false_position(&input.f, input.x0, b, criteria)),
            start,
        ),
        RootFindingMethod::Newton => root_row(
            method,
            newton(&input.f, &input.df, input.x0, criteria),
            start,
        ),
        RootFindingMethod::FixedPoint => root_row(
            method,
            input
                .g
                .as_ref()
                .ok_or_else(|| NumericalError::MissingField("g".to_string()))
                .and_then(|g| fixed_point(&input.f, g, input.x0, criteria)),
            start,
        ),
        RootFindingMethod::Secant => root_row(
            method,
            x1.and_then(|x1| secant(&input.f, input.x0, x1, criteria)),
            start,
        ),
    }
}

pub fn compare_root_finding(input: &RootComparisonInput) -> Vec<RootComparisonRow> {
    info!("comparing root finding methods for f(x) = {}", input.f.source());
    let methods: Vec<RootFindingMethod> = RootFindingMethod::iter().collect();
    let mut rows: Vec<RootComparisonRow> = methods
        .par_iter()
        .map(|method| run_root_strategy(*method, input))
        .collect();
    let keys: Vec<(bool, usize, f64)> = rows
        .iter()
        .map(|r| (r.converged, r.iterations, r.error))
        .collect();
    for (row, rank) in rows.iter_mut().zip(assign_ranks(&keys)) {
        row.rank = rank;
    }
    info!("\n{}", summary_table(&rows));
    rows
}

////////////////////////////////////////////////////////////////////////////////
//                          LINEAR SYSTEMS
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearComparisonRow {
    #[serde(rename = "metodo")]
    pub method: String,
    #[serde(rename = "iteraciones")]
    pub iterations: usize,
    pub error_final: f64,
    #[serde(rename = "radio_espectral")]
    pub spectral_radius: Option<f64>,
    /// `spectral_radius < 1`
    #[serde(rename = "converge")]
    pub converges: bool,
    /// the run itself met the tolerance
    pub converged: bool,
    pub tiempo_ms: f64,
    pub solution: Vec<f64>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub rank: usize,
}

impl ComparisonRow for LinearComparisonRow {
    fn table_headers() -> Vec<String> {
        [
            "rank",
            "method",
            "iterations",
            "final error",
            "spectral radius",
            "rho < 1",
            "time, ms",
            "status",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn table_record(&self) -> Vec<String> {
        vec![
            self.rank.to_string(),
            self.method.clone(),
            self.iterations.to_string(),
            format_number(self.error_final),
            self.spectral_radius
                .map(|rho| format!("{:.6}", rho))
                .unwrap_or_else(|| "-".to_string()),
            self.converges.to_string(),
            format!("{:.3}", self.tiempo_ms),
            self.message.clone().unwrap_or_else(|| self.status.clone()),
        ]
    }
}

fn run_linear_strategy(
    method: LinearMethod,
    system: &LinearSystem,
    omega: f64,
    criteria: &StopCriteria,
) -> LinearComparisonRow {
    let start = Instant::now();
    let outcome = solve_linear(method, system, omega, criteria);
    let tiempo_ms = elapsed_ms(start);
    match outcome {
        Ok(res) => LinearComparisonRow {
            method: method.to_string(),
            iterations: res.result.iterations(),
            error_final: res.result.final_error(),
            spectral_radius: Some(res.spectral_radius),
            converges: res.converges,
            converged: res.result.converged(),
            tiempo_ms,
            solution: res.solution().iter().copied().collect(),
            status: res.result.termination.status().to_string(),
            message: res.result.termination.failure().map(|e| e.to_string()),
            rank: 0,
        },
        Err(err) => {
            warn!("{} failed: {}", method, err);
            LinearComparisonRow {
                method: method.to_string(),
                iterations: 0,
                error_final: f64::NAN,
                spectral_radius: None,
                converges: false,
                converged: false,
                tiempo_ms,
                solution: Vec::new(),
                status: "error".to_string(),
                message: Some(err.to_string()),
                rank: 0,
            }
        }
    }
}

/// Jacobi, Gauss-Seidel and SOR (relaxation `omega`) on the same system
pub fn compare_linear(
    system: &LinearSystem,
    omega: f64,
    criteria: &StopCriteria,
) -> Vec<LinearComparisonRow> {
    info!("comparing stationary methods on a {0}x{0} system", system.dim());
    let methods: Vec<LinearMethod> = LinearMethod::iter().collect();
    let mut rows: Vec<LinearComparisonRow> = methods
        .par_iter()
        .map(|method| run_linear_strategy(*method, system, omega, criteria))
        .collect();
    let keys: Vec<(bool, usize, f64)> = rows
        .iter()
        .map(|r| (r.converged, r.iterations, r.error_final))
        .collect();
    for (row, rank) in rows.iter_mut().zip(assign_ranks(&keys)) {
        row.rank = rank;
    }
    info!("\n{}", summary_table(&rows));
    rows
}

////////////////////////////////////////////////////////////////////////////////
//                          INTERPOLATION
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolationComparisonRow {
    #[serde(rename = "metodo")]
    pub method: String,
    #[serde(rename = "polinomio")]
    pub polynomial: String,
    pub tiempo_ms: f64,
    #[serde(rename = "grado")]
    pub degree: Option<usize>,
    /// largest residual `|P(x_i) - y_i|` over the input points
    pub max_residual: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComparisonRow for InterpolationComparisonRow {
    fn table_headers() -> Vec<String> {
        ["method", "degree", "max residual", "time, ms", "polynomial"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn table_record(&self) -> Vec<String> {
        vec![
            self.method.clone(),
            self.degree
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            format_number(self.max_residual),
            format!("{:.3}", self.tiempo_ms),
            self.message.clone().unwrap_or_else(|| self.polynomial.clone()),
        ]
    }
}

fn max_residual(points: &PointSet, eval: impl Fn(f64) -> f64) -> f64 {
    points
        .x()
        .iter()
        .zip(points.y())
        .map(|(x, y)| (eval(*x) - y).abs())
        .fold(0.0, f64::max)
}

fn run_interpolation_strategy(
    method: InterpolationMethod,
    points: &PointSet,
    spline_kind: SplineKind,
) -> InterpolationComparisonRow {
    let start = Instant::now();
    let outcome = match method {
        InterpolationMethod::Lagrange => lagrange(points).map(|r| {
            let residual = max_residual(points, |x| r.polynomial.evaluate(x));
            (r.polynomial.to_string(), Some(r.polynomial.degree()), residual)
        }),
        InterpolationMethod::Vandermonde => vandermonde(points).map(|r| {
            let residual = max_residual(points, |x| r.polynomial.evaluate(x));
            (r.polynomial.to_string(), Some(r.polynomial.degree()), residual)
        }),
        InterpolationMethod::NewtonInterpolation => newton_interpolation(points).map(|r| {
            let residual = max_residual(points, |x| r.polynomial.evaluate(x));
            (r.polynomial.to_string(), Some(r.polynomial.degree()), residual)
        }),
        InterpolationMethod::Splines => spline(points, spline_kind).map(|s| {
            let residual = max_residual(points, |x| s.evaluate(x));
            (s.describe().join("\n"), Some(spline_kind.degree()), residual)
        }),
    };
    let tiempo_ms = elapsed_ms(start);
    let method_name = match method {
        InterpolationMethod::Splines => format!("{} ({})", method, spline_kind),
        _ => method.to_string(),
    };
    match outcome {
        Ok((polynomial, degree, max_residual)) => InterpolationComparisonRow {
            method: method_name,
            polynomial,
            tiempo_ms,
            degree,
            max_residual,
            message: None,
        },
        Err(err) => {
            warn!("{} failed: {}", method_name, err);
            InterpolationComparisonRow {
                method: method_name,
                polynomial: String::new(),
                tiempo_ms,
                degree: None,
                max_residual: f64::NAN,
                message: Some(err.to_string()),
            }
        }
    }
}

/// Lagrange, Vandermonde, Newton and, when `spline_kind` is given, a spline
pub fn compare_interpolation(
    points: &PointSet,
    spline_kind: Option<SplineKind>,
) -> Vec<InterpolationComparisonRow> {
    info!("comparing interpolation methods on {} points", points.len());
    let strategies: Vec<(InterpolationMethod, SplineKind)> = InterpolationMethod::iter()
        .filter_map(|method| match method {
            InterpolationMethod::Splines => spline_kind.map(|kind| (method, kind)),
            _ => Some((method, SplineKind::Cubic)),
        })
        .collect();
    let rows: Vec<InterpolationComparisonRow> = strategies
        .par_iter()
        .map(|(method, kind)| run_interpolation_strategy(*method, points, *kind))
        .collect();
    info!("\n{}", summary_table(&rows));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn criteria() -> StopCriteria {
        StopCriteria::new(1e-8, 100).unwrap()
    }

    #[test]
    fn test_root_comparison_order_and_results() {
        let input = RootComparisonInput::parse(
            "x^2 - 2",
            None,
            Some("x - (x^2 - 2)/3"),
            1.0,
            Some(2.0),
            criteria(),
        )
        .unwrap();
        let rows = compare_root_finding(&input);
        let names: Vec<&str> = rows.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(
            names,
            vec!["bisection", "false_position", "newton", "fixed_point", "secant"]
        );
        for row in &rows {
            assert!(row.converged, "{}", row.method);
            assert_relative_eq!(row.root.unwrap(), 2f64.sqrt(), epsilon = 1e-6);
        }
        // Newton needs the fewest steps and bisection the most
        let newton = rows.iter().find(|r| r.method == "newton").unwrap();
        let bisection = rows.iter().find(|r| r.method == "bisection").unwrap();
        assert!(newton.rank < bisection.rank);
        let mut ranks: Vec<usize> = rows.iter().map(|r| r.rank).collect();
        ranks.sort();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_failing_strategy_does_not_abort_batch() {
        // no sign change on [1, 2] and no g: two strategies fail, the rest run
        let input =
            RootComparisonInput::parse("x^2 - 9", Some("2*x"), None, 1.0, Some(2.0), criteria())
                .unwrap();
        let rows = compare_root_finding(&input);
        assert_eq!(rows.len(), 5);
        let bisection = &rows[0];
        assert!(!bisection.converged);
        assert_eq!(bisection.status, "error");
        assert!(bisection.message.as_ref().unwrap().contains("opposite signs"));
        assert!(!rows[3].converged);
        assert!(rows[3].message.as_ref().unwrap().contains("'g'"));
        assert!(rows[2].converged);
        assert_relative_eq!(rows[2].root.unwrap(), 3.0, epsilon = 1e-8);
        assert!(rows[0].rank > rows[2].rank);
    }

    #[test]
    fn test_parse_error_fails_whole_request() {
        let result = RootComparisonInput::parse("x^^2", None, None, 1.0, Some(2.0), criteria());
        assert!(matches!(result, Err(NumericalError::Parse(_))));
        let bad_g = RootComparisonInput::parse("x - 1", None, Some("sin("), 1.0, None, criteria());
        assert!(bad_g.is_err());
    }

    #[test]
    fn test_linear_comparison() {
        let system =
            LinearSystem::from_rows(&[vec![4.0, 1.0], vec![2.0, 3.0]], &[1.0, 2.0], &[0.0, 0.0])
                .unwrap();
        let rows = compare_linear(&system, 1.1, &StopCriteria::new(1e-4, 100).unwrap());
        let names: Vec<&str> = rows.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(names, vec!["jacobi", "gauss_seidel", "sor"]);
        for row in &rows {
            assert!(row.converges);
            assert!(row.spectral_radius.unwrap() < 1.0);
            assert_relative_eq!(row.solution[0], 0.1, epsilon = 1e-3);
        }
        let json = serde_json::to_value(&rows[0]).unwrap();
        for key in ["metodo", "iteraciones", "error_final", "radio_espectral", "converge", "tiempo_ms"] {
            assert!(json.get(key).is_some(), "{}", key);
        }
    }

    #[test]
    fn test_linear_comparison_isolates_bad_relaxation() {
        let system =
            LinearSystem::from_rows(&[vec![4.0, 1.0], vec![2.0, 3.0]], &[1.0, 2.0], &[0.0, 0.0])
                .unwrap();
        let rows = compare_linear(&system, 2.5, &StopCriteria::default());
        assert!(rows[0].converged && rows[1].converged);
        assert_eq!(rows[2].status, "error");
        assert_eq!(rows[2].spectral_radius, None);
        assert_eq!(rows[2].rank, 3);
    }

    #[test]
    fn test_interpolation_comparison() {
        let points = PointSet::new(vec![0.0, 1.0, 2.0, 4.0], vec![1.0, 3.0, 2.0, 5.0]).unwrap();
        let rows = compare_interpolation(&points, Some(SplineKind::Cubic));
        let names: Vec<&str> = rows.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(
            names,
            vec!["lagrange", "vandermonde", "newton_interpolation", "splines (cubic)"]
        );
        for row in &rows {
            assert!(row.max_residual < 1e-9, "{}", row.method);
        }
        assert_eq!(rows[0].degree, Some(3));
        assert_eq!(rows[3].polynomial.lines().count(), 3);
        let without_spline = compare_interpolation(&points, None);
        assert_eq!(without_spline.len(), 3);
    }

    #[test]
    fn test_summary_table_renders_rows() {
        let points = PointSet::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        let rows = compare_interpolation(&points, None);
        let table = summary_table(&rows);
        assert!(table.contains("lagrange"));
        assert!(table.contains("max residual"));
    }

    #[test]
    fn test_ranks() {
        let keys = vec![(false, 3, 0.1), (true, 10, 1e-9), (true, 4, f64::NAN), (true, 4, 1e-3)];
        assert_eq!(assign_ranks(&keys), vec![4, 3, 2, 1]);
    }
}
