//! Coercion library.
//!
//! Conversions from any [`Value`] to number, string and boolean, and the
//! equality and ordering rules built on them. Everything here is pure.
//!
//! The rules deliberately follow the host-equivalence contract of the
//! rule language rather than Rust's own notions: `"inf"` is not a number,
//! objects stringify as `[object Object]`, and `==` compares arrays and
//! objects by identity.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::EvalError;
use crate::temporal;
use crate::value::{Value, NULL};

// ──────────────────────────────────────────────
// Conversions
// ──────────────────────────────────────────────

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => parse_number(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [only] => to_number(only),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
        Value::Instant(dt) => temporal::to_millis(dt),
    }
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    // Rust's parser accepts these but the rule language does not.
    if matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "inf" | "-inf" | "+inf"
    ) {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Null => "null".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Array(items) => items.iter().map(to_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Instant(dt) => temporal::format_http_date(dt),
    }
}

/// Shortest text that parses back to the same number.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        exponential(n)
    } else {
        n.to_string()
    }
}

/// `1e+21`, `1.5e+300`, `1e-7`: shortest mantissa, signed exponent.
fn exponential(n: f64) -> String {
    let text = format!("{:e}", n);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => text,
    }
}

/// Truthiness used by conditionals.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => !(n.is_nan() || *n == 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) | Value::Instant(_) => true,
    }
}

/// Falsiness, the rule `and` stops on.
pub fn not(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Number(n) => n.is_nan() || *n == 0.0,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) | Value::Instant(_) => false,
    }
}

// ──────────────────────────────────────────────
// Equality
// ──────────────────────────────────────────────

/// Loose equality (`==`).
///
/// Pairs without a coercion rule (an instant against a string, boolean,
/// array or object) are a `TypeMismatch` rather than `false`.
pub fn equals(a: &Value, b: &Value) -> Result<bool, EvalError> {
    use Value::*;

    let eq = match (a, b) {
        (Array(x), Array(y)) => Arc::ptr_eq(x, y),
        (Object(x), Object(y)) => Arc::ptr_eq(x, y),
        (Null, Null) => true,
        (Bool(x), Bool(y)) => x == y,
        (Number(x), Number(y)) => x == y,
        (String(x), String(y)) => x == y,
        (Instant(x), Instant(y)) => x == y,

        (Number(x), other) => *x == to_number(other),
        (other, Number(y)) => to_number(other) == *y,

        (Null, _) | (_, Null) => false,

        (String(_), Bool(_)) | (Bool(_), String(_)) => to_number(a) == to_number(b),
        (String(s), Array(_) | Object(_)) => *s == to_string(b),
        (Array(_) | Object(_), String(s)) => to_string(a) == *s,
        (Bool(_), Array(_) | Object(_)) | (Array(_) | Object(_), Bool(_)) => {
            to_number(a) == to_number(b)
        }
        (Array(_), Object(_)) | (Object(_), Array(_)) => false,

        (Instant(_), _) | (_, Instant(_)) => {
            return Err(EvalError::TypeMismatch {
                left: a.type_name(),
                right: b.type_name(),
            })
        }
    };
    Ok(eq)
}

/// Strict equality (`===`): same kind and same value, no coercion.
///
/// Arrays and objects compare element-wise with the same rule.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Instant(x), Value::Instant(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            Arc::ptr_eq(x, y)
                || (x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| strict_equals(l, r)))
        }
        (Value::Object(x), Value::Object(y)) => {
            Arc::ptr_eq(x, y)
                || (x.len() == y.len()
                    && x
                        .iter()
                        .all(|(k, l)| y.get(k).is_some_and(|r| strict_equals(l, r))))
        }
        _ => false,
    }
}

// ──────────────────────────────────────────────
// Ordering
// ──────────────────────────────────────────────

/// One of the four ordering operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Comparison {
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (_, None) => false,
            (Comparison::Less, Some(o)) => o == Ordering::Less,
            (Comparison::LessOrEqual, Some(o)) => o != Ordering::Greater,
            (Comparison::Greater, Some(o)) => o == Ordering::Greater,
            (Comparison::GreaterOrEqual, Some(o)) => o != Ordering::Less,
        }
    }
}

/// Order two values.
///
/// A number on either side makes it a numeric comparison, otherwise a
/// string on either side makes it a lexicographic one, otherwise both
/// sides are coerced to numbers. `None` means unordered (NaN involved).
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => to_number(a).partial_cmp(&to_number(b)),
        (Value::String(_), _) | (_, Value::String(_)) => Some(to_string(a).cmp(&to_string(b))),
        _ => to_number(a).partial_cmp(&to_number(b)),
    }
}

/// Apply a comparison to operator arguments.
///
/// Three or more arguments form a chained range: `a < b < c` holds when
/// both `a < b` and `b < c` hold. Missing arguments count as null.
pub fn compare_chain<F>(op: Comparison, args: &[Value], order: F) -> Result<bool, EvalError>
where
    F: Fn(&Value, &Value) -> Result<Option<Ordering>, EvalError>,
{
    let arg = |i: usize| args.get(i).unwrap_or(&NULL);
    if !op.holds(order(arg(0), arg(1))?) {
        return Ok(false);
    }
    if args.len() >= 3 {
        return Ok(op.holds(order(arg(1), arg(2))?));
    }
    Ok(true)
}
