//! Evaluation order, dispatch and temporal properties.
//!
//! Order is observed through a `probe` operator that records its first
//! argument and returns its second.

use std::sync::{Arc, Mutex};

use jsonlogic::coerce::to_string;
use jsonlogic::{cert, evaluate, extras, ErrorKind, EvalError, Operators, Value};
use serde_json::json;

fn probed(base: Operators) -> (Operators, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let ops = base
        .to_builder()
        .operator("probe", move |_, args| {
            let label = args.first().map(to_string).unwrap_or_default();
            log.lock().unwrap().push(label);
            Ok(args.get(1).cloned().unwrap_or(Value::Null))
        })
        .build();
    (ops, seen)
}

fn probe(label: &str, value: serde_json::Value) -> serde_json::Value {
    json!({"probe": [label, value]})
}

fn run(logic: serde_json::Value, data: serde_json::Value, ops: &Operators) -> serde_json::Value {
    evaluate(&Value::from(logic), &Value::from(data), ops)
        .map(|v| v.to_json())
        .unwrap_or_else(|e| panic!("evaluation failed: {}", e))
}

// ──────────────────────────────────────────────
// Short-circuiting
// ──────────────────────────────────────────────

#[test]
fn if_evaluates_only_the_taken_branch() {
    let (ops, seen) = probed(extras());
    let logic = json!({"if": [
        probe("c1", json!(true)), probe("t1", json!("A")),
        probe("c2", json!(true)), probe("t2", json!("B")),
        probe("e", json!("C"))
    ]});
    assert_eq!(run(logic, json!(null), &ops), json!("A"));
    assert_eq!(*seen.lock().unwrap(), vec!["c1", "t1"]);
}

#[test]
fn if_falls_through_to_else() {
    let (ops, seen) = probed(extras());
    let logic = json!({"if": [
        probe("c1", json!(false)), probe("t1", json!("A")),
        probe("c2", json!(0)), probe("t2", json!("B")),
        probe("e", json!("C"))
    ]});
    assert_eq!(run(logic, json!(null), &ops), json!("C"));
    assert_eq!(*seen.lock().unwrap(), vec!["c1", "c2", "e"]);
}

#[test]
fn and_stops_at_first_falsy() {
    let (ops, seen) = probed(extras());
    let logic = json!({"and": [false, probe("never", json!(true))]});
    assert_eq!(run(logic, json!(null), &ops), json!(false));
    assert!(seen.lock().unwrap().is_empty());

    let logic = json!({"and": [probe("a", json!(1)), probe("b", json!("")), probe("c", json!(3))]});
    assert_eq!(run(logic, json!(null), &ops), json!(""));
    assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
}

#[test]
fn or_stops_at_first_truthy() {
    let (ops, seen) = probed(extras());
    let logic = json!({"or": [probe("a", json!(0)), probe("b", json!("yes")), probe("c", json!(true))]});
    assert_eq!(run(logic, json!(null), &ops), json!("yes"));
    assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
}

#[test]
fn generic_operators_evaluate_every_argument_in_order() {
    let (ops, seen) = probed(extras());
    let logic = json!({"+": [probe("a", json!(1)), probe("b", json!(2)), probe("c", json!(3))]});
    assert_eq!(run(logic, json!(null), &ops), json!(6));
    assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn cert_if_and_short_circuit() {
    let (ops, seen) = probed(cert::builtins());
    let logic = Value::from(json!({"if": [
        probe("c", json!({})), probe("then", json!(1)), probe("else", json!(2))
    ]}));
    let r = cert::evaluate(&logic, &Value::Null, &ops).map(|v| v.to_json());
    assert_eq!(r.ok(), Some(json!(2)));
    assert_eq!(*seen.lock().unwrap(), vec!["c", "else"]);

    seen.lock().unwrap().clear();
    let logic = Value::from(json!({"and": [probe("a", json!({})), probe("b", json!(1))]}));
    let r = cert::evaluate(&logic, &Value::Null, &ops).map(|v| v.to_json());
    assert_eq!(r.ok(), Some(json!({})));
    assert_eq!(*seen.lock().unwrap(), vec!["a"]);
}

// ──────────────────────────────────────────────
// Dispatch
// ──────────────────────────────────────────────

fn fives(calls: Arc<Mutex<Vec<(serde_json::Value, Vec<serde_json::Value>)>>>) -> Operators {
    let add_calls = Arc::clone(&calls);
    Operators::builder()
        .operator("add", move |data, args| {
            add_calls
                .lock()
                .unwrap()
                .push((data.to_json(), args.iter().map(Value::to_json).collect()));
            Ok(Value::Number(jsonlogic::coerce::to_number(&args[0]) + 5.0))
        })
        .operator("subtract", |_, args| {
            Ok(Value::Number(jsonlogic::coerce::to_number(&args[0]) - 5.0))
        })
        .build()
}

#[test]
fn namespaced_operators_receive_data_and_arguments() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let ops = extras()
        .to_builder()
        .namespace("fives", fives(Arc::clone(&calls)))
        .build();
    assert_eq!(run(json!({"fives.add": 37}), json!({"k": 1}), &ops), json!(42));
    assert_eq!(run(json!({"fives.subtract": [37]}), json!(null), &ops), json!(32));
    assert_eq!(*calls.lock().unwrap(), vec![(json!({"k": 1}), vec![json!(37)])]);
}

#[test]
fn unresolved_namespace_names_the_failing_prefix() {
    let ops = extras()
        .to_builder()
        .namespace("fives", fives(Arc::new(Mutex::new(Vec::new()))))
        .build();
    let err = evaluate(&Value::from(json!({"fives.multiply": [1]})), &Value::Null, &ops)
        .expect_err("multiply is not registered");
    assert_eq!(err.to_string(), "Unrecognized operation: 'fives.multiply'");
    assert_eq!(err.kind(), ErrorKind::Referential);

    let err = evaluate(&Value::from(json!({"sixes.add": [1]})), &Value::Null, &ops)
        .expect_err("sixes is not registered");
    assert_eq!(err.to_string(), "Unrecognized operation: 'sixes'");
}

#[test]
fn custom_operator_errors_propagate_unmodified() {
    let ops = extras()
        .to_builder()
        .operator("fail", |_, _| Err(EvalError::custom("quota exhausted")))
        .build();
    let err = evaluate(
        &Value::from(json!({"if": [true, {"cat": ["x", {"fail": []}]}]})),
        &Value::Null,
        &ops,
    )
    .expect_err("fail always fails");
    assert_eq!(err.kind(), ErrorKind::Custom);
    assert_eq!(err.to_string(), "quota exhausted");
}

#[test]
fn removing_an_operator_does_not_touch_the_source_table() {
    let base = extras();
    let trimmed = base.to_builder().remove("log").build();
    assert!(base.contains("log"));
    assert!(evaluate(&Value::from(json!({"log": [1]})), &Value::Null, &trimmed).is_err());
}

// ──────────────────────────────────────────────
// Properties
// ──────────────────────────────────────────────

#[test]
fn literals_are_returned_unchanged() {
    let ops = extras();
    for literal in [
        json!(null),
        json!(true),
        json!(-12.5),
        json!("if"),
        json!({}),
        json!({"if": 1, "and": 2}),
        json!([1, [2, [3, {}]], "x"]),
    ] {
        assert_eq!(run(literal.clone(), json!({"a": 1}), &ops), literal);
    }
}

#[test]
fn documented_examples() {
    let ops = extras();
    assert_eq!(run(json!({"if": [true, "A"]}), json!(null), &ops), json!("A"));
    assert_eq!(run(json!({"if": [false, "A"]}), json!(null), &ops), json!(null));
    assert_eq!(run(json!({"all": [[], {"==": [{"var": ""}, 1]}]}), json!(null), &ops), json!(false));
    assert_eq!(run(json!({"var": ""}), json!(0), &ops), json!(0));
    assert_eq!(run(json!({"var": ["a", "fallback"]}), json!(null), &ops), json!("fallback"));
    assert_eq!(run(json!({"substr": ["äöü", 0, -2]}), json!(null), &ops), json!("ä"));
    assert_eq!(
        run(json!({"combinations": [[1, 2], ["a", "b"]]}), json!(null), &ops),
        json!([[1, "a"], [1, "b"], [2, "a"], [2, "b"]])
    );
}

#[test]
fn format_then_parse_round_trips() {
    let ops = extras();
    for input in [
        "2021-06-01",
        "2021-06-01T12:34:56Z",
        "2021-06-01T12:34:56.789+05:30",
        "1999-12-31T23:59:59-08:00",
        "2024-02-29T00:00:00.001Z",
    ] {
        let once = run(json!({"formatTime": input}), json!(null), &ops);
        let twice = run(json!({"formatTime": {"parseTime": once.clone()}}), json!(null), &ops);
        assert_eq!(once, twice, "{}", input);
        let same = run(
            json!({"==": [{"parseTime": input}, {"parseTime": once}]}),
            json!(null),
            &ops,
        );
        assert_eq!(same, json!(true), "{}", input);
    }
}

#[test]
fn twelve_months_make_a_year() {
    let ops = cert::extras();
    let step = |logic: serde_json::Value, t: serde_json::Value| {
        cert::evaluate(&Value::from(logic), &Value::from(json!({"t": t})), &ops)
            .map(|v| v.to_json())
            .unwrap_or_else(|e| panic!("evaluation failed: {}", e))
    };
    for start in [
        "2021-01-15T00:00:00Z",
        "2020-03-28T10:00:00+02:00",
        "2019-08-28",
        "2023-12-01T23:59:59Z",
    ] {
        let mut t = json!(start);
        for _ in 0..12 {
            t = step(json!({"formatTime": {"plusTime": [{"var": "t"}, 1, "month"]}}), t);
        }
        let yearly = step(
            json!({"formatTime": {"plusTime": [{"var": "t"}, 1, "year"]}}),
            json!(start),
        );
        assert_eq!(t, yearly, "{}", start);
    }
}
