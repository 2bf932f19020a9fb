//! Extension operators layered over the standard set: time helpers and a
//! couple of list combinators.

use std::sync::LazyLock;

use time::OffsetDateTime;

use crate::builtins::{arg, builtins, op_substr_utf16};
use crate::coerce::to_number;
use crate::error::EvalError;
use crate::operators::Operators;
use crate::temporal::{self, MILLIS_PER_DAY, MILLIS_PER_HOUR};
use crate::value::Value;

static EXTRAS_ONLY: LazyLock<Operators> = LazyLock::new(|| {
    Operators::builder()
        .operator("now", |_, _| Ok(Value::Instant(OffsetDateTime::now_utc())))
        .operator("hours", |_, args| {
            Ok(Value::Number(to_number(arg(args, 0)) * MILLIS_PER_HOUR))
        })
        .operator("days", |_, args| {
            Ok(Value::Number(to_number(arg(args, 0)) * MILLIS_PER_DAY))
        })
        .operator("parseTime", |_, args| {
            temporal::parse_time(arg(args, 0)).map(Value::Instant)
        })
        .operator("formatTime", |_, args| {
            let dt = temporal::parse_time(arg(args, 0))?;
            Ok(Value::String(temporal::format_time(&dt)))
        })
        .operator("timeSince", op_time_since)
        .operator("combinations", |_, args| Ok(combinations(args)))
        .operator("zip", |_, args| Ok(zip(args)))
        .operator("substr_utf16", op_substr_utf16)
        .build()
});

static EXTRAS: LazyLock<Operators> =
    LazyLock::new(|| builtins().to_builder().extend(&EXTRAS_ONLY).build());

/// The standard set plus the extension operators.
pub fn extras() -> Operators {
    EXTRAS.clone()
}

/// Only the extension operators, for callers composing their own table.
pub fn extras_only() -> Operators {
    EXTRAS_ONLY.clone()
}

fn op_time_since(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let then = temporal::parse_time(arg(args, 0))?;
    let now = OffsetDateTime::now_utc();
    Ok(Value::Number(
        temporal::to_millis(&now) - temporal::to_millis(&then),
    ))
}

/// Cartesian product of the argument lists, last list varying fastest.
///
/// Walks an explicit index stack so the number of lists does not bound
/// the call stack. A non-array argument contributes no items.
pub fn combinations(lists: &[Value]) -> Value {
    let lists: Vec<&[Value]> = lists
        .iter()
        .map(|l| l.as_array().unwrap_or(&[]))
        .collect();
    let mut out = Vec::new();
    if lists.is_empty() {
        return Value::array(out);
    }

    let depth = lists.len();
    let mut stack = vec![0usize; depth + 1];
    let mut item = vec![Value::Null; depth];
    let mut ptr: isize = 0;

    while ptr >= 0 {
        let level = ptr as usize;
        if level == depth {
            out.push(Value::array(item.clone()));
            ptr -= 1;
            continue;
        }
        let index = stack[level];
        if index == lists[level].len() {
            ptr -= 1;
        } else {
            item[level] = lists[level][index].clone();
            stack[level] = index + 1;
            stack[level + 1] = 0;
            ptr += 1;
        }
    }
    Value::array(out)
}

/// Transpose the argument lists, stopping at the shortest.
pub fn zip(lists: &[Value]) -> Value {
    let lists: Vec<&[Value]> = lists
        .iter()
        .map(|l| l.as_array().unwrap_or(&[]))
        .collect();
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    let rows = (0..len)
        .map(|i| Value::array(lists.iter().map(|l| l[i].clone()).collect()))
        .collect();
    Value::array(rows)
}
