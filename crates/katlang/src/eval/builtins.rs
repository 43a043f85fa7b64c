//! Built-in math algorithms.
//!
//! Arities live in [`katlang_ast::language::BUILTINS`]; this module only
//! folds numbers. Arguments beyond the arity are ignored.

use katlang_ast::BinaryOp;

/// Largest number of fractional digits `round` honours.
const MAX_ROUND_DIGITS: i32 = 15;

/// Evaluate the built-in `name` over its leading arguments.
///
/// Returns `None` for names that are not built-ins or when fewer values
/// than the arity are supplied.
pub fn fold(name: &str, values: &[f64]) -> Option<f64> {
    let unary = |f: fn(f64) -> f64| values.first().map(|&a| f(a));
    let binary = |f: fn(f64, f64) -> f64| match values {
        [a, b, ..] => Some(f(*a, *b)),
        _ => None,
    };

    match name {
        "abs" => unary(f64::abs),
        "ceil" => unary(f64::ceil),
        "floor" => unary(f64::floor),
        "round" => binary(|value, digits| round_half_even(value, digits as i32)),
        "sign" => unary(sign),
        "div" => binary(|a, b| BinaryOp::Div.apply(a, b)),
        "mod" => binary(|a, b| BinaryOp::Mod.apply(a, b)),
        "pow" => binary(f64::powf),
        "sqrt" => unary(f64::sqrt),
        "ln" => unary(f64::ln),
        "lg" => unary(f64::log10),
        // log(a, b) is the logarithm of a in base b
        "log" => binary(|a, b| a.ln() / b.ln()),
        "sin" => unary(f64::sin),
        "asin" => unary(f64::asin),
        "cos" => unary(f64::cos),
        "acos" => unary(f64::acos),
        "tan" => unary(f64::tan),
        "atan" => unary(f64::atan),
        _ => None,
    }
}

fn sign(value: f64) -> f64 {
    if value.is_nan() {
        f64::NAN
    } else if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Round to `digits` fractional digits, ties to even.
///
/// `digits` is clamped to `0..=15`.
pub fn round_half_even(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits.clamp(0, MAX_ROUND_DIGITS));
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }

    let floor = scaled.floor();
    let fraction = scaled - floor;
    let rounded = if fraction > 0.5 {
        floor + 1.0
    } else if fraction < 0.5 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };
    rounded / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(1.23456, 4), 1.2346);
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(3.5, 0), 4.0);
        assert_eq!(round_half_even(-2.5, 0), -2.0);
        assert_eq!(round_half_even(1.25, 1), 1.2);
        assert_eq!(round_half_even(7.0, -3), 7.0);
    }

    #[test]
    fn test_sign() {
        assert_eq!(fold("sign", &[-4.0]), Some(-1.0));
        assert_eq!(fold("sign", &[0.0]), Some(0.0));
        assert_eq!(fold("sign", &[12.5]), Some(1.0));
    }

    #[test]
    fn test_log_uses_second_argument_as_base() {
        let value = fold("log", &[8.0, 2.0]).unwrap();
        assert!((value - 3.0).abs() < 1e-12);
        assert_eq!(fold("lg", &[1000.0]), Some(3.0));
    }

    #[test]
    fn test_integer_division_floors() {
        assert_eq!(fold("div", &[7.0, 2.0]), Some(3.0));
        assert_eq!(fold("mod", &[7.0, 2.0]), Some(1.0));
    }

    #[test]
    fn test_missing_values_and_unknown_names() {
        assert_eq!(fold("pow", &[2.0]), None);
        assert_eq!(fold("Func", &[1.0]), None);
        assert_eq!(fold("sqrt", &[16.0, 99.0]), Some(4.0));
    }
}
