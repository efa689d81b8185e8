//! Request/response layer: one named operation plus a flat parameter set in,
//! one flat serializable object out.
//!
//! Requests come from task-document sections (see [`crate::Utils::task_parser`]):
//! the section title names the operation and its `key: value` lines are the
//! parameters. Several spellings are accepted for the objective function
//! (`expression`, `f_expr`, `fx`) and its derivative (`df_expr`, `dfx`).
//!
//! # Example
//! ```
//! use RustedNumAn::numerical::requests::TaskDocument;
//! let document = TaskDocument::parse("
//! newton
//! expression: x^2 - 4
//! x0: 3
//! tol: 1e-6
//! niter: 50
//! ").unwrap();
//! let (_, request) = &document.requests[0];
//! let response = request.execute().unwrap();
//! let json = response.to_json().unwrap();
//! assert!(json.contains("\"root\""));
//! ```
use crate::Utils::logger::{save_trace_to_csv, trace_table};
use crate::Utils::task_parser::{SectionMap, Value, parse_sections};
use crate::numerical::comparison::{
    InterpolationComparisonRow, LinearComparisonRow, RootComparisonInput, RootComparisonRow,
    compare_interpolation, compare_linear, compare_root_finding, summary_table,
};
use crate::numerical::error_metric::ErrorType;
use crate::numerical::errors::NumericalError;
use crate::numerical::interpolation::{
    InterpolationMethod, PointSet, SplineKind, lagrange, newton_interpolation, spline, vandermonde,
};
use crate::numerical::iteration::{
    IterationRecord, MAX_ITERATIONS, StopCriteria, TraceRow,
};
use crate::numerical::root_finding::{
    BisectionRow, FalsePositionRow, FixedPointRow, NewtonRow, RootFindingResult, SecantRow,
    bisection, false_position, fixed_point, newton, newton_multiple_roots, secant,
};
use crate::somelinalg::iterative_solvers_cpu::{
    DEFAULT_RELAXATION, LinearMethod, LinearRow, LinearSolveResult, solve_linear,
};
use crate::somelinalg::linear_system::LinearSystem;
use crate::symbolic::symbolic_functions::SymbolicFunction;
use log::{LevelFilter, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

const OBJECTIVE: &[&str] = &["expression", "f_expr", "fx"];
const DERIVATIVE: &[&str] = &["df_expr", "dfx"];
const SECOND_DERIVATIVE: &[&str] = &["d2f_expr", "d2fx"];
const ITERATION_FUNCTION: &[&str] = &["g_expr", "g"];
const RELAXATION: &[&str] = &["relaxation_factor", "w", "omega"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Operation {
    Bisection,
    FalsePosition,
    Newton,
    FixedPoint,
    Secant,
    Jacobi,
    GaussSeidel,
    Sor,
    Lagrange,
    Vandermonde,
    NewtonInterpolation,
    Splines,
    #[strum(to_string = "comparison_lsm", serialize = "comparisonlsm")]
    ComparisonLsm,
    #[strum(to_string = "comparison_root_finding", serialize = "comparisonrootfinding")]
    ComparisonRootFinding,
    #[strum(
        to_string = "comparison_interpolation",
        serialize = "comparisoninterpolation"
    )]
    ComparisonInterpolation,
}

////////////////////////////////////////////////////////////////////////////////
//                          FIELD ACCESS
////////////////////////////////////////////////////////////////////////////////

/// Typed view over the key-value pairs of one section
struct Fields<'a> {
    section: &'a SectionMap,
}

impl<'a> Fields<'a> {
    fn new(section: &'a SectionMap) -> Self {
        Self { section }
    }

    /// first spelling that is present with at least one value
    fn lookup(&self, names: &[&str]) -> Option<(&'a str, &'a [Value])> {
        names.iter().find_map(|name| {
            self.section
                .get_key_value(*name)
                .and_then(|(key, values)| values.as_deref().map(|v| (key.as_str(), v)))
                .filter(|(_, v)| !v.is_empty())
        })
    }

    fn missing(names: &[&str]) -> NumericalError {
        NumericalError::MissingField(names.join(" | "))
    }

    fn opt_text(&self, names: &[&str]) -> Option<String> {
        self.lookup(names).map(|(_, values)| {
            values
                .iter()
                .map(|v| v.to_string_value())
                .collect::<Vec<_>>()
                .join(", ")
        })
    }

    fn text(&self, names: &[&str]) -> Result<String, NumericalError> {
        self.opt_text(names).ok_or_else(|| Self::missing(names))
    }

    fn opt_number(&self, names: &[&str]) -> Result<Option<f64>, NumericalError> {
        let Some((key, values)) = self.lookup(names) else {
            return Ok(None);
        };
        match values {
            [value] => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| NumericalError::invalid_parameter(key, "must be a number")),
            _ => Err(NumericalError::invalid_parameter(key, "expected a single number")),
        }
    }

    fn number(&self, names: &[&str]) -> Result<f64, NumericalError> {
        self.opt_number(names)?.ok_or_else(|| Self::missing(names))
    }

    fn numbers(key: &str, values: &[Value]) -> Result<Vec<f64>, NumericalError> {
        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| NumericalError::invalid_parameter(key, format!("'{}' is not a number", v)))
            })
            .collect()
    }

    fn opt_vector(&self, names: &[&str]) -> Result<Option<Vec<f64>>, NumericalError> {
        let Some((key, values)) = self.lookup(names) else {
            return Ok(None);
        };
        if values.iter().any(|v| v.as_row().is_some()) {
            return Err(NumericalError::invalid_parameter(key, "expected a vector, got a matrix"));
        }
        Self::numbers(key, values).map(Some)
    }

    fn vector(&self, names: &[&str]) -> Result<Vec<f64>, NumericalError> {
        self.opt_vector(names)?.ok_or_else(|| Self::missing(names))
    }

    /// rows separated by `;`; a plain list is a single row
    fn matrix(&self, names: &[&str]) -> Result<Vec<Vec<f64>>, NumericalError> {
        let (key, values) = self.lookup(names).ok_or_else(|| Self::missing(names))?;
        if values.iter().all(|v| v.as_row().is_some()) {
            values
                .iter()
                .filter_map(Value::as_row)
                .map(|row| Self::numbers(key, row))
                .collect()
        } else if values.iter().any(|v| v.as_row().is_some()) {
            Err(NumericalError::invalid_parameter(key, "malformed matrix rows"))
        } else {
            Ok(vec![Self::numbers(key, values)?])
        }
    }

    fn flag(&self, names: &[&str]) -> Result<bool, NumericalError> {
        let Some((key, values)) = self.lookup(names) else {
            return Ok(false);
        };
        match values.first() {
            Some(Value::Boolean(b)) => Ok(*b),
            Some(Value::Integer(i)) => Ok(*i != 0),
            _ => Err(NumericalError::invalid_parameter(key, "expected true or false")),
        }
    }

    fn criteria(&self) -> Result<StopCriteria, NumericalError> {
        let defaults = StopCriteria::default();
        let tol = self.opt_number(&["tol"])?.unwrap_or(defaults.tol);
        let niter = match self.opt_number(&["niter"])? {
            None => defaults.niter,
            Some(n) if n.fract() == 0.0 && n >= 1.0 && n <= MAX_ITERATIONS as f64 => n as usize,
            Some(n) => {
                return Err(NumericalError::invalid_parameter(
                    "niter",
                    format!("{} is not an integer in [1, {}]", n, MAX_ITERATIONS),
                ));
            }
        };
        let error_type = match self.opt_text(&["error_type"]) {
            None => ErrorType::default(),
            Some(text) => ErrorType::from_str(&text).map_err(|_| {
                NumericalError::invalid_parameter(
                    "error_type",
                    format!("'{}' is neither absolute nor relative", text),
                )
            })?,
        };
        Ok(StopCriteria::new(tol, niter)?.with_error_type(error_type))
    }

    fn linear_system(&self) -> Result<LinearSystem, NumericalError> {
        let rows = self.matrix(&["matrix_a", "a"])?;
        let b = self.vector(&["vector_b", "b"])?;
        let x0 = self.opt_vector(&["x0"])?.unwrap_or_else(|| vec![0.0; b.len()]);
        LinearSystem::from_rows(&rows, &b, &x0)
    }

    fn points(&self) -> Result<PointSet, NumericalError> {
        PointSet::new(self.vector(&["x"])?, self.vector(&["y"])?)
    }

    fn spline_kind(&self, names: &[&str]) -> Result<Option<SplineKind>, NumericalError> {
        let Some(text) = self.opt_text(names) else {
            return Ok(None);
        };
        SplineKind::from_str(text.trim()).map(Some).map_err(|_| {
            NumericalError::invalid_parameter(
                names[0],
                format!("'{}' is not one of linear, quadratic, cubic", text),
            )
        })
    }
}

////////////////////////////////////////////////////////////////////////////////
//                          REQUESTS
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
pub enum MethodRequest {
    Bisection {
        f: String,
        a: f64,
        b: f64,
        criteria: StopCriteria,
    },
    FalsePosition {
        f: String,
        xl: f64,
        xu: f64,
        criteria: StopCriteria,
    },
    Newton {
        f: String,
        /// derived symbolically when absent
        df: Option<String>,
        d2f: Option<String>,
        x0: f64,
        multiple_roots: bool,
        criteria: StopCriteria,
    },
    FixedPoint {
        f: String,
        g: String,
        x0: f64,
        criteria: StopCriteria,
    },
    Secant {
        f: String,
        x0: f64,
        x1: f64,
        criteria: StopCriteria,
    },
    Linear {
        method: LinearMethod,
        system: LinearSystem,
        omega: f64,
        criteria: StopCriteria,
    },
    Interpolation {
        method: InterpolationMethod,
        points: PointSet,
        /// spline degree, only read by `splines`
        kind: Option<SplineKind>,
    },
    ComparisonLsm {
        system: LinearSystem,
        omega: f64,
        criteria: StopCriteria,
    },
    ComparisonRootFinding {
        fx: String,
        dfx: Option<String>,
        g: Option<String>,
        x0: f64,
        x1: Option<f64>,
        criteria: StopCriteria,
    },
    ComparisonInterpolation {
        points: PointSet,
        kind: Option<SplineKind>,
    },
}

impl MethodRequest {
    /// Build a request from the parameters of one section. Structural problems
    /// (missing or malformed fields) are reported here, before anything runs.
    pub fn from_section(
        operation: Operation,
        section: &SectionMap,
    ) -> Result<MethodRequest, NumericalError> {
        let fields = Fields::new(section);
        let request = match operation {
            Operation::Bisection => MethodRequest::Bisection {
                f: fields.text(OBJECTIVE)?,
                a: fields.number(&["a"])?,
                b: fields.number(&["b"])?,
                criteria: fields.criteria()?,
            },
            Operation::FalsePosition => MethodRequest::FalsePosition {
                f: fields.text(OBJECTIVE)?,
                xl: fields.number(&["xl", "a"])?,
                xu: fields.number(&["xu", "b"])?,
                criteria: fields.criteria()?,
            },
            Operation::Newton => MethodRequest::Newton {
                f: fields.text(OBJECTIVE)?,
                df: fields.opt_text(DERIVATIVE),
                d2f: fields.opt_text(SECOND_DERIVATIVE),
                x0: fields.number(&["x0"])?,
                multiple_roots: fields.flag(&["multiple_roots"])?,
                criteria: fields.criteria()?,
            },
            Operation::FixedPoint => MethodRequest::FixedPoint {
                f: fields.text(OBJECTIVE)?,
                g: fields.text(ITERATION_FUNCTION)?,
                x0: fields.number(&["x0"])?,
                criteria: fields.criteria()?,
            },
            Operation::Secant => MethodRequest::Secant {
                f: fields.text(OBJECTIVE)?,
                x0: fields.number(&["x0"])?,
                x1: fields.number(&["x1"])?,
                criteria: fields.criteria()?,
            },
            Operation::Jacobi | Operation::GaussSeidel | Operation::Sor => {
                let (method, omega) = match operation {
                    Operation::Jacobi => (LinearMethod::Jacobi, DEFAULT_RELAXATION),
                    Operation::GaussSeidel => (LinearMethod::GaussSeidel, DEFAULT_RELAXATION),
                    _ => (LinearMethod::Sor, fields.number(RELAXATION)?),
                };
                MethodRequest::Linear {
                    method,
                    system: fields.linear_system()?,
                    omega,
                    criteria: fields.criteria()?,
                }
            }
            Operation::Lagrange
            | Operation::Vandermonde
            | Operation::NewtonInterpolation
            | Operation::Splines => {
                let (method, kind) = match operation {
                    Operation::Lagrange => (InterpolationMethod::Lagrange, None),
                    Operation::Vandermonde => (InterpolationMethod::Vandermonde, None),
                    Operation::NewtonInterpolation => (InterpolationMethod::NewtonInterpolation, None),
                    _ => (
                        InterpolationMethod::Splines,
                        Some(
                            fields
                                .spline_kind(&["d"])?
                                .ok_or_else(|| Fields::missing(&["d"]))?,
                        ),
                    ),
                };
                MethodRequest::Interpolation {
                    method,
                    points: fields.points()?,
                    kind,
                }
            }
            Operation::ComparisonLsm => MethodRequest::ComparisonLsm {
                system: fields.linear_system()?,
                omega: fields.opt_number(RELAXATION)?.unwrap_or(DEFAULT_RELAXATION),
                criteria: fields.criteria()?,
            },
            Operation::ComparisonRootFinding => MethodRequest::ComparisonRootFinding {
                fx: fields.text(OBJECTIVE)?,
                dfx: fields.opt_text(DERIVATIVE),
                g: fields.opt_text(ITERATION_FUNCTION),
                x0: fields.number(&["x0"])?,
                x1: fields.opt_number(&["x1"])?,
                criteria: fields.criteria()?,
            },
            Operation::ComparisonInterpolation => MethodRequest::ComparisonInterpolation {
                points: fields.points()?,
                kind: fields.spline_kind(&["grado", "d"])?,
            },
        };
        Ok(request)
    }

    pub fn execute(&self) -> Result<MethodResponse, NumericalError> {
        let response = match self {
            MethodRequest::Bisection { f, a, b, criteria } => {
                let f = SymbolicFunction::from_string(f, "x")?;
                MethodResponse::Bisection(RootResponse::from_result(bisection(
                    &f, *a, *b, criteria,
                )?))
            }
            MethodRequest::FalsePosition { f, xl, xu, criteria } => {
                let f = SymbolicFunction::from_string(f, "x")?;
                MethodResponse::FalsePosition(RootResponse::from_result(false_position(
                    &f, *xl, *xu, criteria,
                )?))
            }
            MethodRequest::Newton {
                f,
                df,
                d2f,
                x0,
                multiple_roots,
                criteria,
            } => {
                let f = SymbolicFunction::from_string(f, "x")?;
                let df = match df {
                    Some(text) => SymbolicFunction::from_string(text, "x")?,
                    None => f.derivative()?,
                };
                let result = if *multiple_roots {
                    let d2f = match d2f {
                        Some(text) => SymbolicFunction::from_string(text, "x")?,
                        None => df.derivative()?,
                    };
                    newton_multiple_roots(&f, &df, &d2f, *x0, criteria)?
                } else {
                    newton(&f, &df, *x0, criteria)?
                };
                MethodResponse::Newton(RootResponse::from_result(result))
            }
            MethodRequest::FixedPoint { f, g, x0, criteria } => {
                let f_fn = SymbolicFunction::from_string(f, "x")?;
                let g_fn = SymbolicFunction::from_string(g, "x")?;
                let mut response =
                    RootResponse::from_result(fixed_point(&f_fn, &g_fn, *x0, criteria)?);
                response.f_expr = Some(f.clone());
                response.g_expr = Some(g.clone());
                MethodResponse::FixedPoint(response)
            }
            MethodRequest::Secant { f, x0, x1, criteria } => {
                let f = SymbolicFunction::from_string(f, "x")?;
                MethodResponse::Secant(RootResponse::from_result(secant(&f, *x0, *x1, criteria)?))
            }
            MethodRequest::Linear {
                method,
                system,
                omega,
                criteria,
            } => MethodResponse::Linear(LinearResponse::from_result(
                *method,
                solve_linear(*method, system, *omega, criteria)?,
            )),
            MethodRequest::Interpolation {
                method,
                points,
                kind,
            } => match method {
                InterpolationMethod::Lagrange => {
                    let result = lagrange(points)?;
                    MethodResponse::Lagrange(LagrangeResponse {
                        pol: result.polynomial.to_string(),
                        polys: result.basis,
                        coefficients: result.polynomial.descending(),
                    })
                }
                InterpolationMethod::Vandermonde => {
                    let result = vandermonde(points)?;
                    MethodResponse::Vandermonde(VandermondeResponse {
                        pol: result.polynomial.to_string(),
                        coefficients: result.coefficients,
                        matrix: result.matrix,
                        condition_number: result.condition_number,
                    })
                }
                InterpolationMethod::NewtonInterpolation => {
                    let result = newton_interpolation(points)?;
                    MethodResponse::NewtonInterpolation(NewtonInterpolationResponse {
                        pol: result.polynomial.to_string(),
                        newton_form: result.newton_form,
                        coefficients: result.coefficients,
                        table: result.table,
                    })
                }
                InterpolationMethod::Splines => {
                    let kind = (*kind).ok_or_else(|| NumericalError::MissingField("d".to_string()))?;
                    let result = spline(points, kind)?;
                    MethodResponse::Splines(SplineResponse {
                        d: kind.to_string(),
                        pieces: result.describe(),
                        knots: result.knots.clone(),
                        coefficients: result.coefficients,
                    })
                }
            },
            MethodRequest::ComparisonLsm {
                system,
                omega,
                criteria,
            } => MethodResponse::ComparisonLsm(compare_linear(system, *omega, criteria)),
            MethodRequest::ComparisonRootFinding {
                fx,
                dfx,
                g,
                x0,
                x1,
                criteria,
            } => {
                let input = RootComparisonInput::parse(
                    fx,
                    dfx.as_deref(),
                    g.as_deref(),
                    *x0,
                    *x1,
                    *criteria,
                )?;
                MethodResponse::ComparisonRootFinding(compare_root_finding(&input))
            }
            MethodRequest::ComparisonInterpolation { points, kind } => {
                MethodResponse::ComparisonInterpolation(compare_interpolation(points, *kind))
            }
        };
        Ok(response)
    }
}

////////////////////////////////////////////////////////////////////////////////
//                          RESPONSES
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Serialize)]
pub struct RootResponse<S> {
    pub method: String,
    pub root: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_expr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g_expr: Option<String>,
    pub table: Vec<IterationRecord<S>>,
    pub iterations: usize,
    pub converged: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub elapsed_ms: f64,
}

impl<S> RootResponse<S> {
    fn from_result(result: RootFindingResult<S>) -> Self {
        Self {
            iterations: result.iterations(),
            converged: result.converged(),
            status: result.termination.status().to_string(),
            message: result.termination.failure().map(|e| e.to_string()),
            elapsed_ms: result.elapsed.as_secs_f64() * 1000.0,
            method: result.method,
            root: result.approximation,
            f_expr: None,
            g_expr: None,
            table: result.trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearStep {
    pub step: usize,
    pub x: Vec<f64>,
    pub error: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinearResponse {
    pub method: String,
    pub iterations: Vec<LinearStep>,
    pub spectral_radius: f64,
    /// `spectral_radius < 1`
    pub converges: bool,
    /// the run met the tolerance
    pub converged: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub solution: Vec<f64>,
    pub transition_matrix: Vec<Vec<f64>>,
    pub coefficient_vector: Vec<f64>,
    pub elapsed_ms: f64,
}

impl LinearResponse {
    fn from_result(method: LinearMethod, res: LinearSolveResult) -> Self {
        let result = &res.result;
        Self {
            method: method.to_string(),
            iterations: result
                .trace
                .iter()
                .map(|record| LinearStep {
                    step: record.iteration,
                    x: record.state.x.clone(),
                    error: record.error,
                })
                .collect(),
            spectral_radius: res.spectral_radius,
            converges: res.converges,
            converged: result.converged(),
            status: result.termination.status().to_string(),
            message: result.termination.failure().map(|e| e.to_string()),
            solution: res.solution().iter().copied().collect(),
            transition_matrix: res
                .transition_matrix
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
            coefficient_vector: res.coefficient_vector.iter().copied().collect(),
            elapsed_ms: result.elapsed.as_secs_f64() * 1000.0,
        }
    }

    pub fn trace(&self) -> Vec<IterationRecord<LinearRow>> {
        self.iterations
            .iter()
            .map(|step| IterationRecord {
                iteration: step.step,
                state: LinearRow { x: step.x.clone() },
                error: step.error,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LagrangeResponse {
    pub pol: String,
    pub polys: Vec<String>,
    /// highest power first
    pub coefficients: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VandermondeResponse {
    pub pol: String,
    pub coefficients: Vec<f64>,
    pub matrix: Vec<Vec<f64>>,
    pub condition_number: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewtonInterpolationResponse {
    pub pol: String,
    pub newton_form: String,
    pub coefficients: Vec<f64>,
    pub table: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplineResponse {
    pub d: String,
    pub knots: Vec<f64>,
    /// per interval, in powers of `(x - x_i)`
    pub coefficients: Vec<Vec<f64>>,
    pub pieces: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MethodResponse {
    Bisection(RootResponse<BisectionRow>),
    FalsePosition(RootResponse<FalsePositionRow>),
    Newton(RootResponse<NewtonRow>),
    FixedPoint(RootResponse<FixedPointRow>),
    Secant(RootResponse<SecantRow>),
    Linear(LinearResponse),
    Lagrange(LagrangeResponse),
    Vandermonde(VandermondeResponse),
    NewtonInterpolation(NewtonInterpolationResponse),
    Splines(SplineResponse),
    ComparisonLsm(Vec<LinearComparisonRow>),
    ComparisonRootFinding(Vec<RootComparisonRow>),
    ComparisonInterpolation(Vec<InterpolationComparisonRow>),
}

fn render_root<S: TraceRow>(response: &RootResponse<S>) -> String {
    let mut text = trace_table(&response.table);
    text.push_str(&format!(
        "\n{}: root = {}, iterations = {}, status = {}",
        response.method, response.root, response.iterations, response.status
    ));
    if let Some(message) = &response.message {
        text.push_str(&format!(" ({})", message));
    }
    text
}

impl MethodResponse {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human readable rendering: trace or summary tables plus a result line
    pub fn render(&self) -> String {
        match self {
            MethodResponse::Bisection(r) => render_root(r),
            MethodResponse::FalsePosition(r) => render_root(r),
            MethodResponse::Newton(r) => render_root(r),
            MethodResponse::FixedPoint(r) => render_root(r),
            MethodResponse::Secant(r) => render_root(r),
            MethodResponse::Linear(r) => {
                let mut text = trace_table(&r.trace());
                text.push_str(&format!(
                    "\n{}: x = {:?}, spectral radius = {:.6} ({}), status = {}",
                    r.method,
                    r.solution,
                    r.spectral_radius,
                    if r.converges { "converges" } else { "does not converge" },
                    r.status
                ));
                text
            }
            MethodResponse::Lagrange(r) => {
                let mut lines = vec![format!("P(x) = {}", r.pol)];
                lines.extend(r.polys.iter().enumerate().map(|(i, l)| format!("L{}(x) = {}", i, l)));
                lines.join("\n")
            }
            MethodResponse::Vandermonde(r) => format!(
                "P(x) = {}\ncoefficients = {:?}\ncondition number = {:e}",
                r.pol, r.coefficients, r.condition_number
            ),
            MethodResponse::NewtonInterpolation(r) => {
                format!("P(x) = {}\nNewton form: {}", r.pol, r.newton_form)
            }
            MethodResponse::Splines(r) => {
                let mut lines = vec![format!("{} spline", r.d)];
                lines.extend(r.pieces.iter().cloned());
                lines.join("\n")
            }
            MethodResponse::ComparisonLsm(rows) => summary_table(rows),
            MethodResponse::ComparisonRootFinding(rows) => summary_table(rows),
            MethodResponse::ComparisonInterpolation(rows) => summary_table(rows),
        }
    }

    /// Write the iteration trace as CSV. Returns `Ok(false)` for responses without a trace.
    pub fn save_trace_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<bool> {
        match self {
            MethodResponse::Bisection(r) => save_trace_to_csv(&r.table, path)?,
            MethodResponse::FalsePosition(r) => save_trace_to_csv(&r.table, path)?,
            MethodResponse::Newton(r) => save_trace_to_csv(&r.table, path)?,
            MethodResponse::FixedPoint(r) => save_trace_to_csv(&r.table, path)?,
            MethodResponse::Secant(r) => save_trace_to_csv(&r.table, path)?,
            MethodResponse::Linear(r) => save_trace_to_csv(&r.trace(), path)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

////////////////////////////////////////////////////////////////////////////////
//                          TASK DOCUMENTS
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
pub struct TaskSettings {
    pub loglevel: LevelFilter,
    /// `auto` picks a time-stamped name
    pub log_file: Option<String>,
    pub csv: Option<PathBuf>,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            loglevel: LevelFilter::Info,
            log_file: None,
            csv: None,
        }
    }
}

impl TaskSettings {
    pub fn from_section(section: &SectionMap) -> Result<Self, NumericalError> {
        let fields = Fields::new(section);
        let loglevel = match fields.opt_text(&["loglevel"]) {
            None => LevelFilter::Info,
            Some(text) => LevelFilter::from_str(text.trim()).map_err(|_| {
                NumericalError::invalid_parameter(
                    "loglevel",
                    format!("'{}' is not one of off, error, warn, info, debug", text),
                )
            })?,
        };
        Ok(Self {
            loglevel,
            log_file: fields.opt_text(&["log_file"]),
            csv: fields.opt_text(&["csv"]).map(PathBuf::from),
        })
    }

    /// CSV path of the `index`-th of `total` traces: `trace.csv`, `trace_2.csv`, ...
    pub fn csv_path(&self, index: usize, total: usize) -> Option<PathBuf> {
        let base = self.csv.as_ref()?;
        if total <= 1 || index == 0 {
            return Some(base.clone());
        }
        let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("trace");
        let extension = base.extension().and_then(|s| s.to_str()).unwrap_or("csv");
        Some(base.with_file_name(format!("{}_{}.{}", stem, index + 1, extension)))
    }
}

/// Parsed task document: optional `settings` plus requests in document order
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDocument {
    pub settings: TaskSettings,
    pub requests: Vec<(Operation, MethodRequest)>,
}

impl TaskDocument {
    pub fn parse(text: &str) -> Result<Self, NumericalError> {
        let sections = parse_sections(text)
            .map_err(|e| NumericalError::invalid_parameter("task document", e))?;
        let mut settings = TaskSettings::default();
        let mut requests = Vec::new();
        for (title, section) in &sections {
            if title == "settings" {
                settings = TaskSettings::from_section(section)?;
                continue;
            }
            let operation = Operation::from_str(title).map_err(|_| {
                NumericalError::invalid_parameter(
                    "operation",
                    format!("unknown operation '{}'", title),
                )
            })?;
            requests.push((operation, MethodRequest::from_section(operation, section)?));
        }
        if requests.is_empty() {
            return Err(NumericalError::invalid_parameter(
                "task document",
                "no operation sections",
            ));
        }
        info!("task document with {} request(s)", requests.len());
        Ok(Self { settings, requests })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NumericalError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NumericalError::invalid_parameter(
                "task file",
                format!("{}: {}", path.as_ref().display(), e),
            )
        })?;
        Self::parse(&text)
    }

    /// Execute every request in order, exporting traces when `csv` is set
    pub fn execute(&self) -> Vec<(Operation, Result<MethodResponse, NumericalError>)> {
        let total = self.requests.len();
        self.requests
            .iter()
            .enumerate()
            .map(|(index, (operation, request))| {
                let outcome = request.execute();
                match &outcome {
                    Ok(response) => {
                        if let Some(path) = self.settings.csv_path(index, total) {
                            match response.save_trace_csv(&path) {
                                Ok(true) => info!("{}: trace saved to {}", operation, path.display()),
                                Ok(false) => {}
                                Err(e) => warn!("{}: cannot write {}: {}", operation, path.display(), e),
                            }
                        }
                    }
                    Err(err) => warn!("{}: {} ({})", operation, err, err.category()),
                }
                (*operation, outcome)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::Value as Json;

    fn run_single(text: &str) -> Result<MethodResponse, NumericalError> {
        let document = TaskDocument::parse(text)?;
        document.requests[0].1.execute()
    }

    fn json(response: &MethodResponse) -> Json {
        serde_json::from_str(&response.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::from_str("comparisonLSM").unwrap(), Operation::ComparisonLsm);
        assert_eq!(
            Operation::from_str("comparisonRootFinding").unwrap(),
            Operation::ComparisonRootFinding
        );
        assert_eq!(Operation::from_str("Vandermonde").unwrap(), Operation::Vandermonde);
        assert_eq!(Operation::GaussSeidel.to_string(), "gauss_seidel");
        assert_eq!(Operation::ComparisonInterpolation.to_string(), "comparison_interpolation");
    }

    #[test]
    fn test_bisection_response() {
        let response = run_single(
            "bisection\nexpression: x^2 - 4\na: 0\nb: 5\ntol: 1e-6\nniter: 100\nerror_type: absolute",
        )
        .unwrap();
        let value = json(&response);
        assert_relative_eq!(value["root"].as_f64().unwrap(), 2.0, epsilon = 1e-5);
        let first = &value["table"][0];
        for key in ["iteration", "a", "b", "xm", "f_xm"] {
            assert!(first.get(key).is_some(), "{}", key);
        }
        // no previous midpoint yet
        assert!(first["error"].is_null());
        assert_eq!(value["status"], "converged");
    }

    #[test]
    fn test_objective_aliases() {
        for key in ["expression", "f_expr", "fx"] {
            let text = format!("secant\n{}: x^3 - 8\nx0: 1\nx1: 3", key);
            let response = run_single(&text).unwrap();
            let MethodResponse::Secant(r) = response else {
                panic!("secant response expected");
            };
            assert_relative_eq!(r.root, 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_newton_derivative_is_optional() {
        let given = run_single("newton\nf_expr: x^2 - 4\ndf_expr: 2*x\nx0: 3").unwrap();
        let derived = run_single("newton\nf_expr: x^2 - 4\nx0: 3").unwrap();
        let (MethodResponse::Newton(given), MethodResponse::Newton(derived)) = (given, derived)
        else {
            panic!("newton responses expected");
        };
        assert_eq!(given.table.len(), derived.table.len());
        assert_relative_eq!(given.root, derived.root);
        let multiple =
            run_single("newton\nfx: (x - 1)^2\nx0: 3\nmultiple_roots: true\ntol: 1e-10").unwrap();
        let MethodResponse::Newton(multiple) = multiple else {
            panic!("newton response expected");
        };
        assert_eq!(multiple.method, "newton_multiple_roots");
        assert_relative_eq!(multiple.root, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_fixed_point_echoes_expressions() {
        let response = run_single("fixed_point\nf_expr: x^2 - 2\ng_expr: x - (x^2 - 2)/3\nx0: 1")
            .unwrap();
        let value = json(&response);
        assert_eq!(value["f_expr"], "x^2 - 2");
        assert_eq!(value["g_expr"], "x - (x^2 - 2)/3");
        assert!(value["table"][0].get("g_x").is_some());
    }

    #[test]
    fn test_linear_response() {
        let response = run_single(
            "jacobi\nmatrix_a: 4, 1; 2, 3\nvector_b: 1, 2\nx0: 0, 0\ntol: 1e-4\nniter: 100",
        )
        .unwrap();
        let value = json(&response);
        assert_eq!(value["iterations"][0]["step"], 0);
        assert_eq!(value["iterations"][0]["x"], serde_json::json!([0.0, 0.0]));
        assert!(value["spectral_radius"].as_f64().unwrap() < 1.0);
        assert_eq!(value["converges"], true);
        let MethodResponse::Linear(r) = response else {
            panic!("linear response expected");
        };
        assert_relative_eq!(r.solution[0], 0.1, epsilon = 1e-3);
        assert_relative_eq!(r.solution[1], 0.6, epsilon = 1e-3);
        assert_eq!(r.trace().len(), r.iterations.len());
    }

    #[test]
    fn test_sor_needs_relaxation() {
        let text = "sor\nmatrix_a: 4, 1; 2, 3\nvector_b: 1, 2";
        assert!(matches!(run_single(text), Err(NumericalError::MissingField(_))));
        let response = run_single(&format!("{}\nw: 1.2", text)).unwrap();
        let MethodResponse::Linear(r) = response else {
            panic!("linear response expected");
        };
        assert_eq!(r.method, "sor");
        assert_eq!(r.iterations[0].x, vec![0.0, 0.0]);
        let invalid = run_single(&format!("{}\nrelaxation_factor: 2.5", text));
        assert!(matches!(invalid, Err(NumericalError::InvalidRelaxation(_))));
    }

    #[test]
    fn test_interpolation_responses() {
        let points = "x: 0, 1, 2\ny: 1, 0, 3";
        let value = json(&run_single(&format!("lagrange\n{}", points)).unwrap());
        assert_eq!(value["polys"].as_array().unwrap().len(), 3);
        assert!(value["pol"].as_str().unwrap().contains("x^2"));

        let value = json(&run_single(&format!("vandermonde\n{}", points)).unwrap());
        let coefficients: Vec<f64> = value["coefficients"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c.as_f64().unwrap())
            .collect();
        assert_relative_eq!(coefficients[0], 2.0, epsilon = 1e-10);

        let value = json(&run_single(&format!("newton_interpolation\n{}", points)).unwrap());
        assert!(value["newton_form"].as_str().is_some());

        let value = json(&run_single(&format!("splines\n{}\nd: cubic", points)).unwrap());
        assert_eq!(value["d"], "cubic");
        assert_eq!(value["coefficients"].as_array().unwrap().len(), 2);
        let by_degree = run_single(&format!("splines\n{}\nd: 2", points)).unwrap();
        assert_eq!(json(&by_degree)["d"], "quadratic");
        assert!(matches!(
            run_single(&format!("splines\n{}", points)),
            Err(NumericalError::MissingField(_))
        ));
        assert!(matches!(
            run_single("lagrange\nx: 1, 1\ny: 2, 3"),
            Err(NumericalError::DuplicateAbscissa(_))
        ));

        // only splines carry a degree
        let document = TaskDocument::parse(&format!("lagrange\n{}\nd: cubic", points)).unwrap();
        assert!(matches!(
            &document.requests[0].1,
            MethodRequest::Interpolation { kind: None, .. }
        ));
        let degreeless = MethodRequest::Interpolation {
            method: InterpolationMethod::Splines,
            points: PointSet::new(vec![0.0, 1.0], vec![1.0, 2.0]).unwrap(),
            kind: None,
        };
        assert!(matches!(
            degreeless.execute(),
            Err(NumericalError::MissingField(_))
        ));
    }

    #[test]
    fn test_comparisons() {
        let value = json(
            &run_single("comparisonLSM\nmatrix_a: 4, 1; 2, 3\nvector_b: 1, 2\nx0: 0, 0").unwrap(),
        );
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        for key in ["metodo", "iteraciones", "error_final", "radio_espectral", "converge", "tiempo_ms"] {
            assert!(rows[0].get(key).is_some(), "{}", key);
        }
        assert_eq!(rows[2]["metodo"], "sor");

        let value = json(
            &run_single("comparisonRootFinding\nfx: x^2 - 2\ng: x - (x^2 - 2)/3\nx0: 1\nx1: 2")
                .unwrap(),
        );
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r["converge"] == true));
        assert!(rows[0].get("raiz").is_some());

        let value = json(
            &run_single("comparison_interpolation\nx: 0, 1, 2, 3\ny: 1, 2, 0, 4\ngrado: 3").unwrap(),
        );
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].get("polinomio").is_some());
    }

    #[test]
    fn test_bad_requests() {
        assert!(matches!(
            TaskDocument::parse("integrate\nfx: x\n"),
            Err(NumericalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            run_single("bisection\nexpression: x^2 - 4\na: 0"),
            Err(NumericalError::MissingField(_))
        ));
        assert!(matches!(
            run_single("bisection\nexpression: x^2 - 4\na: 0\nb: 5\nniter: 500"),
            Err(NumericalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            run_single("bisection\nexpression: x^2 - 4\na: 0\nb: 5\ntol: 2"),
            Err(NumericalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            run_single("bisection\nexpression: x^2 - 4\na: 3\nb: 5"),
            Err(NumericalError::InvalidBracket { .. })
        ));
        assert!(matches!(
            run_single("bisection\nexpression: x^^2\na: 0\nb: 5"),
            Err(NumericalError::Parse(_))
        ));
        assert!(matches!(
            run_single("jacobi\nmatrix_a: 1, 2; 3\nvector_b: 1, 2"),
            Err(NumericalError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_settings_and_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("trace.csv");
        let text = format!(
            "secant\nfx: x^2 - 2\nx0: 1\nx1: 2\n\nlagrange\nx: 1, 2\ny: 3, 4\n\njacobi\nmatrix_a: 4, 1; 2, 3\nvector_b: 1, 2\n\nsettings\nloglevel: warn\ncsv: {}\n",
            csv.display()
        );
        let document = TaskDocument::parse(&text).unwrap();
        assert_eq!(document.settings.loglevel, LevelFilter::Warn);
        assert_eq!(document.requests.len(), 3);
        let outcomes = document.execute();
        assert!(outcomes.iter().all(|(_, outcome)| outcome.is_ok()));
        assert!(csv.exists());
        assert!(!dir.path().join("trace_2.csv").exists());
        let linear_csv = dir.path().join("trace_3.csv");
        let header = std::fs::read_to_string(&linear_csv).unwrap();
        assert!(header.starts_with("iteration,x1,x2,error"));
    }

    #[test]
    fn test_render() {
        let response = run_single("bisection\nexpression: x - 1\na: 0\nb: 4").unwrap();
        let text = response.render();
        assert!(text.contains("xm"));
        assert!(text.contains("bisection: root = 1"));
        let response = run_single("comparison_root_finding\nfx: x - 1\nx0: 0\nx1: 3").unwrap();
        assert!(response.render().contains("fixed_point"));
    }
}
