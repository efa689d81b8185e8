//! Algebraic simplification of symbolic expressions.
//!
//! Derivatives produced by [`Expr::diff`] are full of `0 * u`, `1 * u` and `u ^ 1`
//! terms. `simplify_()` removes them bottom-up and folds constant subtrees, so the
//! derivative strings returned to the user stay readable and the compiled closures
//! do less work. Constant folding is skipped whenever the folded value would not be
//! finite: such subtrees are kept so that evaluation reports the failure.
use crate::symbolic::symbolic_engine::Expr;
use std::f64::consts::PI;

fn finite_const(value: f64) -> Option<Expr> {
    if value.is_finite() {
        Some(Expr::Const(value))
    } else {
        None
    }
}

fn fold_function(func: &Expr, arg: f64) -> Option<f64> {
    let value = match func {
        Expr::Exp(_) => arg.exp(),
        Expr::Ln(_) if arg > 0.0 => arg.ln(),
        Expr::Sqrt(_) if arg >= 0.0 => arg.sqrt(),
        Expr::Abs(_) => arg.abs(),
        Expr::sin(_) => arg.sin(),
        Expr::cos(_) => arg.cos(),
        Expr::tg(_) => arg.tan(),
        Expr::ctg(_) if arg.tan() != 0.0 => 1.0 / arg.tan(),
        Expr::arcsin(_) if arg.abs() <= 1.0 => arg.asin(),
        Expr::arccos(_) if arg.abs() <= 1.0 => arg.acos(),
        Expr::arctg(_) => arg.atan(),
        Expr::arcctg(_) => PI / 2.0 - arg.atan(),
        _ => return None,
    };
    if value.is_finite() { Some(value) } else { None }
}

impl Expr {
    /// Recursive algebraic simplification
    pub fn simplify_(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => {
                let (l, r) = (lhs.simplify_(), rhs.simplify_());
                match (&l, &r) {
                    (Expr::Const(a), Expr::Const(b)) => finite_const(a + b).unwrap_or(l + r),
                    _ if l.is_zero() => r,
                    _ if r.is_zero() => l,
                    _ => l + r,
                }
            }
            Expr::Sub(lhs, rhs) => {
                let (l, r) = (lhs.simplify_(), rhs.simplify_());
                match (&l, &r) {
                    (Expr::Const(a), Expr::Const(b)) => finite_const(a - b).unwrap_or(l - r),
                    _ if r.is_zero() => l,
                    _ if l.is_zero() => -r,
                    _ if l == r => Expr::Const(0.0),
                    _ => l - r,
                }
            }
            Expr::Mul(lhs, rhs) => {
                let (l, r) = (lhs.simplify_(), rhs.simplify_());
                match (&l, &r) {
                    (Expr::Const(a), Expr::Const(b)) => finite_const(a * b).unwrap_or(l * r),
                    _ if l.is_zero() || r.is_zero() => Expr::Const(0.0),
                    _ if l.is_one() => r,
                    _ if r.is_one() => l,
                    // c1 * (c2 * u) -> (c1*c2) * u
                    (Expr::Const(a), Expr::Mul(inner_l, inner_r)) => match inner_l.as_ref() {
                        Expr::Const(b) => match finite_const(a * b) {
                            Some(c) => (c * inner_r.as_ref().clone()).simplify_(),
                            None => l * r,
                        },
                        _ => l * r,
                    },
                    _ => l * r,
                }
            }
            Expr::Div(lhs, rhs) => {
                let (l, r) = (lhs.simplify_(), rhs.simplify_());
                match (&l, &r) {
                    (Expr::Const(a), Expr::Const(b)) if *b != 0.0 => {
                        finite_const(a / b).unwrap_or(l / r)
                    }
                    _ if r.is_one() => l,
                    _ if l.is_zero() && !r.is_zero() => Expr::Const(0.0),
                    _ => l / r,
                }
            }
            Expr::Pow(base, exp) => {
                let (b, e) = (base.simplify_(), exp.simplify_());
                match (&b, &e) {
                    (Expr::Const(x), Expr::Const(y)) => finite_const(x.powf(*y)).unwrap_or(b.pow(e)),
                    _ if e.is_zero() => Expr::Const(1.0),
                    _ if e.is_one() => b,
                    _ => b.pow(e),
                }
            }
            func => {
                let Some(arg) = func.function_argument() else {
                    return func.clone();
                };
                let arg = arg.simplify_();
                if let Expr::Const(value) = arg {
                    if let Some(folded) = fold_function(func, value) {
                        return Expr::Const(folded);
                    }
                }
                func.with_argument(arg).unwrap_or_else(|| func.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse_expression_with_vars;

    fn parse(s: &str) -> Expr {
        parse_expression_with_vars(s, &["x"]).unwrap()
    }

    #[test]
    fn test_identities() {
        assert_eq!(parse("0 + x*1").simplify_(), parse("x"));
        assert_eq!(parse("x^1 - 0").simplify_(), parse("x"));
        assert_eq!(parse("0*sin(x) + x^0").simplify_(), Expr::Const(1.0));
        assert_eq!(parse("x - x").simplify_(), Expr::Const(0.0));
        assert_eq!(parse("0/x").simplify_(), Expr::Const(0.0));
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(parse("2*3 + 4/2").simplify_(), Expr::Const(8.0));
        assert_eq!(parse("2*(3*x)").simplify_(), parse("6*x"));
        assert_eq!(parse("exp(0)").simplify_(), Expr::Const(1.0));
    }

    #[test]
    fn test_invalid_constants_are_not_folded() {
        assert_eq!(parse("1/0").simplify_(), parse("1/0"));
        assert_eq!(parse("ln(0)").simplify_(), parse("ln(0)"));
        assert_eq!(parse("sqrt(-1)").simplify_(), parse("sqrt(-1)"));
        assert_eq!(parse("0^(-1)").simplify_(), parse("0^(-1)"));
    }
}
