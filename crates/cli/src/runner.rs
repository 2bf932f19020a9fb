//! Conformance suite runner.
//!
//! Convention:
//!   jsonlogic/  -- *.json: flat array; a string opens a group, each
//!                  `[logic, data, expected]` triple is a case of that group
//!   certlogic/  -- *.json: `{name, cases: [{name, certLogicExpression,
//!                  assertions: [{data, expected, certLogicExpression?, error?}]}]}`
//!
//! One TAP line per jsonlogic group and per certlogic case.

use crate::tap::Tap;
use jsonlogic::{cert, EvalOptions, Operators};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub struct RunResult {
    pub failed: usize,
}

pub fn run_suite(suite_dir: &Path, options: &EvalOptions) -> RunResult {
    let mut tap = Tap::new();

    let general = jsonlogic::extras();
    for path in json_files(&suite_dir.join("jsonlogic")) {
        run_jsonlogic_file(&path, &general, options, &mut tap);
    }

    let policy = cert::builtins();
    for path in json_files(&suite_dir.join("certlogic")) {
        run_certlogic_file(&path, &policy, options, &mut tap);
    }

    let failed = tap.failure_count();
    tap.finish();

    RunResult { failed }
}

fn run_jsonlogic_file(path: &Path, ops: &Operators, options: &EvalOptions, tap: &mut Tap) {
    let file = stem(path);
    let cases = match read_json(path) {
        Ok(Value::Array(cases)) => cases,
        Ok(_) => {
            tap.not_ok(format!("jsonlogic/{}", file), "fixture is not an array");
            return;
        }
        Err(e) => {
            tap.not_ok(format!("jsonlogic/{}", file), e);
            return;
        }
    };

    let mut group: Option<(String, Vec<String>, usize)> = None;
    let close = |group: Option<(String, Vec<String>, usize)>, tap: &mut Tap| {
        if let Some((name, failures, total)) = group {
            let desc = format!("jsonlogic/{} {} ({} cases)", file, name, total);
            if failures.is_empty() {
                tap.ok(desc);
            } else {
                tap.not_ok(desc, failures.join("\n"));
            }
        }
    };

    for case in &cases {
        if let Value::String(name) = case {
            close(group.take(), tap);
            group = Some((name.trim_start_matches("# ").to_string(), Vec::new(), 0));
            continue;
        }
        let (_, failures, total) =
            group.get_or_insert_with(|| ("(ungrouped)".to_string(), Vec::new(), 0));
        *total += 1;
        let Some([logic, data, expected]) = case
            .as_array()
            .and_then(|c| <&[Value; 3]>::try_from(c.as_slice()).ok())
        else {
            failures.push(format!("malformed case: {}", case));
            continue;
        };
        let got = jsonlogic::evaluate_with(
            &jsonlogic::Value::from(logic),
            &jsonlogic::Value::from(data),
            ops,
            options,
        );
        match got {
            Ok(v) if json_equal(&v.to_json(), expected) => {}
            Ok(v) => failures.push(format!(
                "logic: {}\ndata: {}\n{}",
                logic,
                data,
                json_diff(expected, &v.to_json())
            )),
            Err(e) => failures.push(format!("logic: {}\ndata: {}\nerror: {}", logic, data, e)),
        }
    }
    close(group.take(), tap);
}

fn run_certlogic_file(path: &Path, ops: &Operators, options: &EvalOptions, tap: &mut Tap) {
    let file = stem(path);
    let suite = match read_json(path) {
        Ok(v) => v,
        Err(e) => {
            tap.not_ok(format!("certlogic/{}", file), e);
            return;
        }
    };
    let suite_name = suite["name"].as_str().unwrap_or(&file).to_string();
    let Some(cases) = suite["cases"].as_array() else {
        tap.not_ok(format!("certlogic/{}", suite_name), "fixture has no cases");
        return;
    };

    for case in cases {
        let desc = format!(
            "certlogic/{} {}",
            suite_name,
            case["name"].as_str().unwrap_or("(unnamed)")
        );
        let Some(assertions) = case["assertions"].as_array() else {
            tap.not_ok(desc, "case has no assertions");
            continue;
        };
        let mut failures = Vec::new();
        for assertion in assertions {
            let logic = assertion
                .get("certLogicExpression")
                .unwrap_or(&case["certLogicExpression"]);
            let got = cert::evaluate_with(
                &jsonlogic::Value::from(logic),
                &jsonlogic::Value::from(&assertion["data"]),
                ops,
                options,
            );
            let expected_error = assertion.get("error").and_then(Value::as_str);
            match (expected_error, got) {
                (Some(fragment), Err(e)) if e.to_string().contains(fragment) => {}
                (Some(fragment), Err(e)) => failures.push(format!(
                    "logic: {}\nexpected error containing {:?}, got: {}",
                    logic, fragment, e
                )),
                (Some(fragment), Ok(v)) => failures.push(format!(
                    "logic: {}\nexpected error containing {:?}, got value {}",
                    logic,
                    fragment,
                    v.to_json()
                )),
                (None, Ok(v)) if json_equal(&v.to_json(), &assertion["expected"]) => {}
                (None, Ok(v)) => failures.push(format!(
                    "logic: {}\ndata: {}\n{}",
                    logic,
                    assertion["data"],
                    json_diff(&assertion["expected"], &v.to_json())
                )),
                (None, Err(e)) => failures.push(format!(
                    "logic: {}\ndata: {}\nerror: {}",
                    logic, assertion["data"], e
                )),
            }
        }
        if failures.is_empty() {
            tap.ok(desc);
        } else {
            tap.not_ok(desc, failures.join("\n"));
        }
    }
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn read_json(path: &Path) -> Result<Value, String> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&src).map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))
}

/// Deep equality of two JSON values, normalizing number types.
pub(crate) fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(am), Value::Object(bm)) => {
            if am.len() != bm.len() {
                return false;
            }
            am.iter()
                .all(|(k, v)| bm.get(k).is_some_and(|bv| json_equal(v, bv)))
        }
        (Value::Array(av), Value::Array(bv)) => {
            av.len() == bv.len() && av.iter().zip(bv).all(|(a, b)| json_equal(a, b))
        }
        (Value::Number(an), Value::Number(bn)) => an.as_f64() == bn.as_f64(),
        (Value::Null, Value::Null) => true,
        _ => a == b,
    }
}

fn json_diff(expected: &Value, got: &Value) -> String {
    let exp_str = serde_json::to_string(expected).unwrap_or_default();
    let got_str = serde_json::to_string(got).unwrap_or_default();
    format!("--- expected\n{}\n+++ got\n{}", exp_str, got_str)
}
