#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedNumAn::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("x^2.3* log(x+y+y^2.6)").unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// let parsed_function = parsed_expression.lambdify_checked(&["x", "y"]).unwrap();
/// println!("Rust function: {:?}", parsed_function(&[1.0, 2.0]));
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// 1) expression tree and helpers for variables and substitution
/// 2) analytical derivatives
/// 3) algebraic simplification
///# Example#
/// ```
/// use RustedNumAn::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("exp(x)+ln(y)").unwrap();
/// let df_dx = f.diff("x").simplify_();
/// let df_dy = f.diff("y").simplify_();
/// println!("df_dx = {}, df_dy = {}", df_dx, df_dy);
/// assert_eq!(f.all_arguments_are_variables(), vec!["x", "y"]);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
pub mod symbolic_simplify;
/// compile expressions into thread-safe closures with domain checks
pub mod symbolic_lambdify;
///______________________________________________________________________________________________________________________________________________
/// single-variable function (expression + compiled closure + derivative) used by the root finders
pub mod symbolic_functions;
