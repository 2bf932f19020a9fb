//! Standard operator set of the general dialect.
//!
//! Every function here has the operator signature: the data context plus
//! the already-evaluated arguments. Missing arguments read as null.

use std::sync::LazyLock;

use crate::coerce::{
    compare, compare_chain, equals, not, strict_equals, to_bool, to_number, to_string, Comparison,
};
use crate::error::EvalError;
use crate::operators::Operators;
use crate::value::{Value, NULL};

static BUILTINS: LazyLock<Operators> = LazyLock::new(|| {
    Operators::builder()
        .operator("==", |_, args| Ok(Value::Bool(equals(arg(args, 0), arg(args, 1))?)))
        .operator("!=", |_, args| Ok(Value::Bool(!equals(arg(args, 0), arg(args, 1))?)))
        .operator("===", |_, args| Ok(Value::Bool(strict_equals(arg(args, 0), arg(args, 1)))))
        .operator("!==", |_, args| Ok(Value::Bool(!strict_equals(arg(args, 0), arg(args, 1)))))
        .operator("<", |_, args| ordered(Comparison::Less, args))
        .operator(">", |_, args| ordered(Comparison::Greater, args))
        .operator("<=", |_, args| ordered(Comparison::LessOrEqual, args))
        .operator(">=", |_, args| ordered(Comparison::GreaterOrEqual, args))
        .operator("!", |_, args| Ok(Value::Bool(not(arg(args, 0)))))
        .operator("!!", |_, args| Ok(Value::Bool(to_bool(arg(args, 0)))))
        .operator("+", op_add)
        .operator("-", op_sub)
        .operator("*", op_mul)
        .operator("/", |_, args| {
            Ok(Value::Number(to_number(arg(args, 0)) / to_number(arg(args, 1))))
        })
        .operator("%", |_, args| {
            Ok(Value::Number(to_number(arg(args, 0)) % to_number(arg(args, 1))))
        })
        .operator("min", |_, args| Ok(Value::Number(extremum(args, f64::min))))
        .operator("max", |_, args| Ok(Value::Number(extremum(args, f64::max))))
        .operator("cat", |_, args| {
            Ok(Value::String(args.iter().map(to_string).collect()))
        })
        .operator("in", op_in)
        .operator("var", op_var)
        .operator("missing", op_missing)
        .operator("missing_some", op_missing_some)
        .operator("substr", op_substr)
        .operator("merge", op_merge)
        .operator("log", op_log)
        .build()
});

/// The standard operator table of the general dialect.
pub fn builtins() -> Operators {
    BUILTINS.clone()
}

/// Argument `i`, or null when absent.
pub(crate) fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&NULL)
}

pub(crate) fn ordered(op: Comparison, args: &[Value]) -> Result<Value, EvalError> {
    compare_chain(op, args, |a, b| Ok(compare(a, b))).map(Value::Bool)
}

// ──────────────────────────────────────────────
// Arithmetic
// ──────────────────────────────────────────────

fn op_add(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(args.iter().map(to_number).sum()))
}

fn op_mul(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(args.iter().map(to_number).product()))
}

fn op_sub(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let n = match args {
        [] => -0.0,
        [only] => -to_number(only),
        [a, b, ..] => to_number(a) - to_number(b),
    };
    Ok(Value::Number(n))
}

/// `min`/`max`: NaN when empty or when any operand is NaN.
fn extremum(args: &[Value], pick: fn(f64, f64) -> f64) -> f64 {
    let mut numbers = args.iter().map(to_number);
    let Some(first) = numbers.next() else {
        return f64::NAN;
    };
    numbers.fold(first, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            pick(acc, n)
        }
    })
}

// ──────────────────────────────────────────────
// Collections and strings
// ──────────────────────────────────────────────

fn op_in(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let needle = arg(args, 0);
    let found = match arg(args, 1) {
        Value::Array(items) => items.iter().any(|item| strict_equals(needle, item)),
        Value::String(haystack) => haystack.contains(to_string(needle).as_str()),
        _ => false,
    };
    Ok(Value::Bool(found))
}

fn op_merge(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let mut merged = Vec::with_capacity(args.len());
    for item in args {
        match item {
            Value::Array(inner) => merged.extend(inner.iter().cloned()),
            other => merged.push(other.clone()),
        }
    }
    Ok(Value::array(merged))
}

fn op_substr(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let chars: Vec<char> = to_string(arg(args, 0)).chars().collect();
    let (start, end) = substr_bounds(chars.len(), arg(args, 1), length_arg(args));
    Ok(Value::String(chars[start..end].iter().collect()))
}

/// `substr` counted in UTF-16 code units. Slices that split a surrogate
/// pair decode with replacement characters.
pub(crate) fn op_substr_utf16(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let units: Vec<u16> = to_string(arg(args, 0)).encode_utf16().collect();
    let (start, end) = substr_bounds(units.len(), arg(args, 1), length_arg(args));
    Ok(Value::String(String::from_utf16_lossy(&units[start..end])))
}

fn length_arg(args: &[Value]) -> Option<&Value> {
    args.get(2).filter(|v| !v.is_null())
}

/// Clamp `substr` arguments to a `start..end` range over `len` units.
fn substr_bounds(len: usize, index: &Value, length: Option<&Value>) -> (usize, usize) {
    let index = to_number(index);
    let start = if index.is_nan() {
        0
    } else if index < 0.0 {
        let back = -index;
        if back >= len as f64 {
            0
        } else {
            len - back as usize
        }
    } else {
        (index as usize).min(len)
    };

    let end = match length.map(to_number) {
        None => len,
        Some(n) if n.is_nan() => start,
        Some(n) => {
            let n = n.trunc();
            if n < 0.0 {
                let cut = -n;
                if cut >= len as f64 {
                    start
                } else {
                    (len - cut as usize).max(start)
                }
            } else {
                start.saturating_add(n as usize).min(len)
            }
        }
    };
    (start, end)
}

// ──────────────────────────────────────────────
// Data access
// ──────────────────────────────────────────────

fn op_var(data: &Value, args: &[Value]) -> Result<Value, EvalError> {
    Ok(lookup(data, arg(args, 0)).unwrap_or_else(|| arg(args, 1).clone()))
}

/// Resolve a `var` key against the data context. `None` means "use the
/// default".
pub(crate) fn lookup(data: &Value, key: &Value) -> Option<Value> {
    match key {
        Value::Null => return Some(data.clone()),
        Value::String(s) if s.is_empty() => return Some(data.clone()),
        Value::Number(n) if matches!(data, Value::Array(_) | Value::String(_)) => {
            if n.fract() != 0.0 || *n < 0.0 {
                return None;
            }
            return index_into(data, *n as usize);
        }
        _ => {}
    }

    let path = to_string(key);
    let mut current = data.clone();
    for segment in path.split('.') {
        current = match &current {
            Value::Object(map) => map.get(segment)?.clone(),
            Value::Array(items) if segment == "length" => Value::from(items.len()),
            Value::String(s) if segment == "length" => Value::from(s.chars().count()),
            Value::Array(_) | Value::String(_) => index_into(&current, segment.parse().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn index_into(collection: &Value, index: usize) -> Option<Value> {
    match collection {
        Value::Array(items) => items.get(index).cloned(),
        Value::String(s) => s.chars().nth(index).map(|c| Value::String(c.to_string())),
        _ => None,
    }
}

fn op_missing(data: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let keys = match args.first() {
        Some(Value::Array(items)) => items.as_slice(),
        _ => args,
    };
    Ok(Value::array(missing_keys(data, keys)))
}

fn op_missing_some(data: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let Some(keys) = arg(args, 1).as_array() else {
        return Ok(Value::array(Vec::new()));
    };
    let need = to_number(arg(args, 0));
    let missing = missing_keys(data, keys);
    if (keys.len() - missing.len()) as f64 >= need {
        return Ok(Value::array(Vec::new()));
    }
    Ok(Value::array(missing))
}

fn missing_keys(data: &Value, keys: &[Value]) -> Vec<Value> {
    keys.iter()
        .filter(|key| match lookup(data, key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .cloned()
        .collect()
}

// ──────────────────────────────────────────────
// Side effects
// ──────────────────────────────────────────────

fn op_log(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let value = arg(args, 0);
    let json = value.to_json();
    tracing::debug!(value = %json, "log");
    println!("{json}");
    Ok(value.clone())
}
