//! JsonLogic tree evaluator (general dialect).
//!
//! A logic tree is plain JSON read structurally:
//!
//! - an array evaluates element-wise,
//! - an object with exactly one key is an operation (`{"op": args}`; a
//!   non-array `args` is a one-element argument list),
//! - anything else is a literal.
//!
//! Control-flow operations (`if`, `and`, `or`, and the collection
//! operations) are handled here because they decide which of their
//! arguments get evaluated. Every other operation evaluates all arguments
//! left to right and dispatches to the operator table.

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::coerce::{not, to_bool};
use crate::error::EvalError;
use crate::operators::Operators;
use crate::value::{Value, NULL};

/// Knobs for a single evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// Reject trees nested deeper than this. `None` means unbounded.
    pub max_depth: Option<usize>,
}

/// How a logic node is to be treated.
pub(crate) enum Node<'a> {
    List(&'a [Value]),
    Operation {
        name: &'a str,
        args: Cow<'a, [Value]>,
    },
    Literal,
}

pub(crate) fn classify(logic: &Value) -> Node<'_> {
    match logic {
        Value::Array(items) => Node::List(items),
        Value::Object(map) if map.len() == 1 => match map.get_index(0) {
            Some((name, Value::Array(args))) => Node::Operation {
                name,
                args: Cow::Borrowed(args.as_slice()),
            },
            Some((name, arg)) => Node::Operation {
                name,
                args: Cow::Owned(vec![arg.clone()]),
            },
            None => Node::Literal,
        },
        _ => Node::Literal,
    }
}

pub(crate) fn check_depth(options: &EvalOptions, depth: usize) -> Result<(), EvalError> {
    match options.max_depth {
        Some(limit) if depth > limit => Err(EvalError::DepthExceeded { limit }),
        _ => Ok(()),
    }
}

/// Resolve `name` and call it with already-evaluated arguments.
pub(crate) fn dispatch(
    operators: &Operators,
    name: &str,
    data: &Value,
    args: &[Value],
) -> Result<Value, EvalError> {
    let op = operators.resolve(name)?;
    tracing::trace!(operation = name, argc = args.len(), "dispatch");
    op.call(data, args)
}

pub(crate) fn reduce_context(accumulator: Value, current: &Value, outer: Option<&Value>) -> Value {
    let mut ctx = IndexMap::with_capacity(3);
    ctx.insert("accumulator".to_string(), accumulator);
    if let Some(data) = outer {
        ctx.insert("data".to_string(), data.clone());
    }
    ctx.insert("current".to_string(), current.clone());
    Value::object(ctx)
}

/// Evaluate `logic` against `data` with the given operator table.
pub fn evaluate(logic: &Value, data: &Value, operators: &Operators) -> Result<Value, EvalError> {
    evaluate_with(logic, data, operators, &EvalOptions::default())
}

pub fn evaluate_with(
    logic: &Value,
    data: &Value,
    operators: &Operators,
    options: &EvalOptions,
) -> Result<Value, EvalError> {
    Evaluator { operators, options }.eval(logic, data, 0)
}

struct Evaluator<'a> {
    operators: &'a Operators,
    options: &'a EvalOptions,
}

impl Evaluator<'_> {
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
            "if" | "?:" => self.eval_if(args, data, depth),
            "and" => {
                let mut current = Value::Null;
                for arg in args {
                    current = self.eval(arg, data, depth)?;
                    if not(&current) {
                        return Ok(current);
                    }
                }
                Ok(current)
            }
            "or" => {
                let mut current = Value::Null;
                for arg in args {
                    current = self.eval(arg, data, depth)?;
                    if to_bool(&current) {
                        return Ok(current);
                    }
                }
                Ok(current)
            }
            "filter" => {
                if args.len() < 2 {
                    return Ok(Value::array(Vec::new()));
                }
                let items = self.eval(&args[0], data, depth)?;
                let Some(items) = items.as_array() else {
                    return Ok(Value::array(Vec::new()));
                };
                let mut kept = Vec::new();
                for item in items {
                    if to_bool(&self.eval(&args[1], item, depth)?) {
                        kept.push(item.clone());
                    }
                }
                Ok(Value::array(kept))
            }
            "map" => {
                let Some(first) = args.first() else {
                    return Ok(Value::array(Vec::new()));
                };
                let items = self.eval(first, data, depth)?;
                let Some(items) = items.as_array() else {
                    return Ok(Value::array(Vec::new()));
                };
                let sublogic = args.get(1).unwrap_or(&NULL);
                items
                    .iter()
                    .map(|item| self.eval(sublogic, item, depth))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::array)
            }
            "reduce" => self.eval_reduce(args, data, depth),
            "all" => {
                if args.len() < 2 {
                    return Ok(Value::Bool(false));
                }
                let items = self.eval(&args[0], data, depth)?;
                let items = match items.as_array() {
                    Some(items) if !items.is_empty() => items,
                    _ => return Ok(Value::Bool(false)),
                };
                for item in items {
                    if !to_bool(&self.eval(&args[1], item, depth)?) {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            "some" | "none" => {
                let vacuous = name == "none";
                if args.len() < 2 {
                    return Ok(Value::Bool(vacuous));
                }
                let items = self.eval(&args[0], data, depth)?;
                let Some(items) = items.as_array() else {
                    return Ok(Value::Bool(vacuous));
                };
                for item in items {
                    if to_bool(&self.eval(&args[1], item, depth)?) {
                        return Ok(Value::Bool(!vacuous));
                    }
                }
                Ok(Value::Bool(vacuous))
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

    /// `[cond, value, cond, value, ..., else]`: the first truthy condition
    /// selects its value; nothing after it is evaluated.
    fn eval_if(&self, args: &[Value], data: &Value, depth: usize) -> Result<Value, EvalError> {
        let mut index = 0;
        while index + 1 < args.len() {
            if to_bool(&self.eval(&args[index], data, depth)?) {
                return self.eval(&args[index + 1], data, depth);
            }
            index += 2;
        }
        match args.get(index) {
            Some(otherwise) => self.eval(otherwise, data, depth),
            None => Ok(Value::Null),
        }
    }

    fn eval_reduce(&self, args: &[Value], data: &Value, depth: usize) -> Result<Value, EvalError> {
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
        tracing::trace!(items = items.len(), "reduce");
        let mut accumulator = init;
        for item in items {
            let ctx = reduce_context(accumulator, item, None);
            accumulator = self.eval(sublogic, &ctx, depth)?;
        }
        Ok(accumulator)
    }
}
