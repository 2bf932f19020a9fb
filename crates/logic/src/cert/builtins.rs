use std::sync::LazyLock;

use crate::builtins::{arg, lookup, ordered};
use crate::coerce::{compare_chain, strict_equals, to_number, to_string, Comparison};
use crate::error::EvalError;
use crate::extras::extras as general_extras;
use crate::operators::Operators;
use crate::temporal::{self, to_int, TimeUnit};
use crate::value::Value;

const UVCI_PREFIX: &str = "URN:UVCI:";

static BUILTINS: LazyLock<Operators> = LazyLock::new(|| {
    Operators::builder()
        .operator("===", |_, args| Ok(Value::Bool(strict_equals(arg(args, 0), arg(args, 1)))))
        .operator("<", |_, args| ordered(Comparison::Less, args))
        .operator(">", |_, args| ordered(Comparison::Greater, args))
        .operator("<=", |_, args| ordered(Comparison::LessOrEqual, args))
        .operator(">=", |_, args| ordered(Comparison::GreaterOrEqual, args))
        .operator("!", |_, args| Ok(Value::Bool(super::not(arg(args, 0)))))
        .operator("+", |_, args| {
            Ok(Value::Number(to_number(arg(args, 0)) + to_number(arg(args, 1))))
        })
        .operator("in", |_, args| {
            let needle = arg(args, 0);
            let found = arg(args, 1)
                .as_array()
                .is_some_and(|items| items.iter().any(|item| strict_equals(needle, item)));
            Ok(Value::Bool(found))
        })
        .operator("var", |data, args| {
            Ok(lookup(data, arg(args, 0)).unwrap_or_else(|| arg(args, 1).clone()))
        })
        .operator("before", |_, args| temporal_order(Comparison::Less, args))
        .operator("not-before", |_, args| {
            temporal_order(Comparison::GreaterOrEqual, args)
        })
        .operator("after", |_, args| temporal_order(Comparison::Greater, args))
        .operator("not-after", |_, args| temporal_order(Comparison::LessOrEqual, args))
        .operator("plusTime", op_plus_time)
        .operator("extractFromUVCI", |_, args| {
            Ok(extract_from_uvci(arg(args, 0), arg(args, 1)))
        })
        .build()
});

static EXTRAS: LazyLock<Operators> = LazyLock::new(|| {
    general_extras()
        .to_builder()
        .operator("!!", |_, args| Ok(Value::Bool(super::to_bool(arg(args, 0)))))
        .extend(&BUILTINS)
        .build()
});

/// The policy dialect's operator table.
pub fn builtins() -> Operators {
    BUILTINS.clone()
}

/// The general extension set with the policy operators laid over it.
pub fn extras() -> Operators {
    EXTRAS.clone()
}

/// Date comparison, with the same three-argument range form as the
/// numeric comparisons.
fn temporal_order(op: Comparison, args: &[Value]) -> Result<Value, EvalError> {
    compare_chain(op, args, |a, b| {
        let (a, b) = (temporal::parse_time(a)?, temporal::parse_time(b)?);
        Ok(Some(a.cmp(&b)))
    })
    .map(Value::Bool)
}

fn op_plus_time(_: &Value, args: &[Value]) -> Result<Value, EvalError> {
    let dt = temporal::parse_time(arg(args, 0))?;
    let unit = TimeUnit::parse(&to_string(arg(args, 2)))?;
    temporal::plus_time(dt, arg(args, 1), unit).map(Value::Instant)
}

/// Field `index` of a UVCI, split on `/`, `#` and `:` after dropping the
/// optional `URN:UVCI:` prefix. Null when the field does not exist.
pub fn extract_from_uvci(uvci: &Value, index: &Value) -> Value {
    let index = to_int(index);
    if uvci.is_null() || index < 0 {
        return Value::Null;
    }
    let text = to_string(uvci);
    let body = text.strip_prefix(UVCI_PREFIX).unwrap_or(&text);
    usize::try_from(index)
        .ok()
        .and_then(|i| body.split(['/', '#', ':']).nth(i))
        .map(Value::from)
        .unwrap_or(Value::Null)
}
