//! JsonLogic rule evaluator -- accepts a logic tree + data context,
//! produces a JSON result.
//!
//! Rules are plain JSON data. A single-key object is an operation, an
//! array evaluates element-wise, everything else is a literal. Two
//! dialects share that shape:
//!
//! - the general dialect ([`evaluate`], [`builtins()`], [`extras()`]),
//! - CertLogic, a restricted policy dialect with date and certificate
//!   identifier operators ([`cert`]).
//!
//! Operator tables are immutable values handed to every evaluation.
//! Build a new one with [`Operators::builder`] or
//! [`Operators::to_builder`] to add, replace or namespace operators.

pub mod builtins;
pub mod cert;
pub mod coerce;
pub mod error;
pub mod eval;
pub mod extras;
pub mod operators;
pub mod temporal;
pub mod value;

pub use builtins::builtins;
pub use error::{ErrorKind, EvalError};
pub use eval::{evaluate, evaluate_with, EvalOptions};
pub use extras::extras;
pub use operators::{Entry, Operator, Operators, OperatorsBuilder};
pub use value::{Object, Value};

/// Evaluate general-dialect logic with the standard operator set.
///
/// # Arguments
/// * `logic` - Logic tree as JSON
/// * `data` - Data context as JSON
pub fn json_logic(
    logic: &serde_json::Value,
    data: &serde_json::Value,
) -> Result<serde_json::Value, EvalError> {
    evaluate(&Value::from(logic), &Value::from(data), &builtins()).map(|v| v.to_json())
}

/// Evaluate a CertLogic expression with the policy operator set.
pub fn cert_logic(
    logic: &serde_json::Value,
    data: &serde_json::Value,
) -> Result<serde_json::Value, EvalError> {
    cert::evaluate(&Value::from(logic), &Value::from(data), &cert::builtins()).map(|v| v.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_logic_entry_point() {
        let r = json_logic(&json!({"if": [{"<": [{"var": "age"}, 18]}, "minor", "adult"]}), &json!({"age": 30}));
        assert_eq!(r.ok(), Some(json!("adult")));
        assert_eq!(json_logic(&json!(null), &json!(null)).ok(), Some(json!(null)));
    }

    #[test]
    fn cert_logic_entry_point() {
        let logic = json!({"not-before": [
            {"plusTime": [{"var": "now"}, 0, "day"]},
            {"plusTime": [{"var": "vaccinated"}, 14, "day"]}
        ]});
        let data = json!({"now": "2021-06-20T00:00:00Z", "vaccinated": "2021-06-01"});
        assert_eq!(cert_logic(&logic, &data).ok(), Some(json!(true)));
    }
}
