use crate::error::EvalError;
use crate::eval::{check_depth, classify, dispatch, reduce_context, EvalOptions, Node};
use crate::operators::Operators;
use crate::value::{Value, NULL};

/// Evaluate a CertLogic expression against `data`.
pub fn evaluate(logic: &Value, data: &Value, operators: &Operators) -> Result<Value, EvalError> {
    evaluate_with(logic, data, operators, &EvalOptions::default())
}

pub fn evaluate_with(
    logic: &Value,
    data: &Value,
    operators: &Operators,
    options: &EvalOptions,
) -> Result<Value, EvalError> {
    CertEvaluator { operators, options }.eval(logic, data, 0)
}

struct CertEvaluator<'a> {
    operators: &'a Operators,
    options: &'a EvalOptions,
}

impl CertEvaluator<'_> {
    fn eval(&self, logic: &Value, data: &Value, depth: usize) -> Result<Value, EvalError> {
        check_depth(self.options, depth)?;
        match classify(logic) {
            Node::Literal => Ok(logic.clone()),
            Node::List(items) => items
                .iter()
                .map(|item| self.eval(item, data, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::array),
            Node::Operation { name, args } => self.operation(name, &args, data, depth + 1),
        }
    }

    fn operation(
        &self,
        name: &str,
        args: &[Value],
        data: &Value,
        depth: usize,
    ) -> Result<Value, EvalError> {
        match name {
            "if" => {
                let Some(condition) = args.first() else {
                    return Ok(Value::Null);
                };
                let branch = if super::to_bool(&self.eval(condition, data, depth)?) {
                    args.get(1)
                } else {
                    args.get(2)
                };
                match branch {
                    Some(logic) => self.eval(logic, data, depth),
                    None => Ok(Value::Null),
                }
            }
            "and" => {
                let mut current = Value::Null;
                for arg in args {
                    current = self.eval(arg, data, depth)?;
                    if super::not(&current) {
                        return Ok(current);
                    }
                }
                Ok(current)
            }
            "reduce" => {
                let Some(first) = args.first() else {
                    return Ok(Value::Null);
                };
                let items = self.eval(first, data, depth)?;
                let sublogic = args.get(1).unwrap_or(&NULL);
                let init = match args.get(2) {
                    Some(init) => self.eval(init, data, depth)?,
                    None => Value::Null,
                };
                let Some(items) = items.as_array() else {
                    return Ok(init);
                };
                let mut accumulator = init;
                for item in items {
                    let ctx = reduce_context(accumulator, item, Some(data));
                    accumulator = self.eval(sublogic, &ctx, depth)?;
                }
                Ok(accumulator)
            }
            _ => {
                let evaluated = args
                    .iter()
                    .map(|arg| self.eval(arg, data, depth))
                    .collect::<Result<Vec<_>, _>>()?;
                dispatch(self.operators, name, data, &evaluated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{builtins, extras};
    use serde_json::json;

    fn run(logic: serde_json::Value, data: serde_json::Value) -> Result<serde_json::Value, EvalError> {
        evaluate(&Value::from(logic), &Value::from(data), &builtins()).map(|v| v.to_json())
    }

    #[test]
    fn if_has_three_slots() {
        assert_eq!(run(json!({"if": [true, 1, 2]}), json!(null)).ok(), Some(json!(1)));
        assert_eq!(run(json!({"if": [{}, 1, 2]}), json!(null)).ok(), Some(json!(2)));
        assert_eq!(run(json!({"if": [false, 1]}), json!(null)).ok(), Some(json!(null)));
        assert_eq!(run(json!({"if": [true]}), json!(null)).ok(), Some(json!(null)));
        assert_eq!(run(json!({"if": []}), json!(null)).ok(), Some(json!(null)));
        // Extra slots are not an else-if chain.
        assert_eq!(
            run(json!({"if": [false, 1, false, 3, 4]}), json!(null)).ok(),
            Some(json!(false))
        );
    }

    #[test]
    fn and_stops_on_empty_object() {
        assert_eq!(run(json!({"and": [1, {}, 3]}), json!(null)).ok(), Some(json!({})));
        assert_eq!(run(json!({"and": [1, 2]}), json!(null)).ok(), Some(json!(2)));
    }

    #[test]
    fn reduce_context_exposes_outer_data() {
        let logic = json!({"reduce": [
            {"var": "xs"},
            {"+": [{"var": "accumulator"}, {"+": [{"var": "current"}, {"var": "data.bonus"}]}]},
            0
        ]});
        let r = run(logic, json!({"xs": [1, 2, 3], "bonus": 10}));
        assert_eq!(r.ok(), Some(json!(36)));
    }

    #[test]
    fn general_only_operators_are_unrecognized() {
        let err = run(json!({"or": [true]}), json!(null)).err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("Unrecognized operation: 'or'"));
        let err = run(json!({"map": [[1], 1]}), json!(null)).err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("Unrecognized operation: 'map'"));
    }

    #[test]
    fn extras_table_works_with_the_policy_evaluator() {
        let logic = Value::from(json!({"formatTime": {"plusTime": ["2021-01-01", 36, "hour"]}}));
        let r = evaluate(&logic, &Value::Null, &extras()).map(|v| v.to_json());
        assert_eq!(r.ok(), Some(json!("2021-01-02T12:00:00Z")));
    }
}
