/// error taxonomy shared by all methods, with categories and user hints
pub mod errors;
/// absolute/relative distance between successive approximations
pub mod error_metric;
/// stop criteria, trace records and the loop shared by every iterative method
pub mod iteration;
///  ROOT FINDING FOR f(x) = 0
/// bisection, false position, Newton-Raphson (optionally corrected for multiple roots),
/// fixed point and secant
///  Example#1
/// ```
/// use RustedNumAn::symbolic::symbolic_functions::SymbolicFunction;
/// use RustedNumAn::numerical::root_finding::newton;
/// use RustedNumAn::numerical::iteration::StopCriteria;
/// let f = SymbolicFunction::from_string("x^2 - 4", "x").unwrap();
/// let df = f.derivative().unwrap();
/// let criteria = StopCriteria::new(1e-6, 50).unwrap();
/// let result = newton(&f, &df, 3.0, &criteria).unwrap();
/// assert!(result.converged());
/// assert!((result.approximation - 2.0).abs() < 1e-6);
/// for record in &result.trace {
///     println!("{} {:?} {}", record.iteration, record.state, record.error);
/// }
/// ```
pub mod root_finding;
/// INTERPOLATION
/// Lagrange, Vandermonde, Newton divided differences and piecewise splines
///  Example#1
/// ```
/// use RustedNumAn::numerical::interpolation::{PointSet, lagrange, spline, SplineKind};
/// let points = PointSet::new(vec![1.0, 2.0, 3.0], vec![1.0, 4.0, 9.0]).unwrap();
/// let result = lagrange(&points).unwrap();
/// println!("P(x) = {}", result.polynomial);
/// assert!((result.polynomial.evaluate(4.0) - 16.0).abs() < 1e-10);
/// let cubic = spline(&points, SplineKind::Cubic).unwrap();
/// for piece in cubic.describe() {
///     println!("{}", piece);
/// }
/// ```
pub mod interpolation;
/// run all methods of a family on the same input (in parallel) and rank them
pub mod comparison;
/// named operations with flat parameters in, serializable responses out; task documents
pub mod requests;
