//! CertLogic, the restricted policy dialect.
//!
//! The tree shape is the same as the general dialect. The differences:
//!
//! - only `if` (exactly condition/then/else), `and` and `reduce` are
//!   control constructs,
//! - the reduce context also carries the outer data as `data`,
//! - truthiness treats an empty object as false,
//! - the operator set is small and adds date comparisons, `plusTime`
//!   and `extractFromUVCI`.

mod builtins;
mod eval;

pub use builtins::{builtins, extract_from_uvci, extras};
pub use eval::{evaluate, evaluate_with};

use crate::value::Value;

/// Policy truthiness: like the general rule, except that an empty object
/// is false.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        other => crate::coerce::to_bool(other),
    }
}

/// Policy falsiness.
pub fn not(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        other => crate::coerce::not(other),
    }
}
