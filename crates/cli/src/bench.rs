//! Timing harness for `jsonlogic bench`.
//!
//! Each iteration parses both JSON arguments, evaluates with the extension
//! operator set and serializes the result into a sink. The four phases
//! (parse, apply, print and their sum) are reported in milliseconds.

use std::io::Write;
use std::time::Instant;

use jsonlogic::{evaluate_with, EvalError, EvalOptions, Operators, Value};
use serde::Serialize;

/// Summary of one phase, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub min: u128,
    pub max: u128,
    pub avg: f64,
    pub median: f64,
    pub sum: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub count: usize,
    pub parse: Stats,
    pub apply: Stats,
    pub print: Stats,
    pub sum: Stats,
}

#[derive(Debug)]
pub enum BenchError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Eval(EvalError),
}

impl std::fmt::Display for BenchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchError::Io(e) => write!(f, "write failed: {}", e),
            BenchError::Json(e) => write!(f, "invalid JSON: {}", e),
            BenchError::Eval(e) => write!(f, "evaluation failed: {}", e),
        }
    }
}

/// Sorts `times` in place.
pub fn summarize(times: &mut [u128]) -> Option<Stats> {
    if times.is_empty() {
        return None;
    }
    times.sort_unstable();
    let count = times.len();
    let median = if count % 2 == 0 {
        (times[count / 2 - 1] + times[count / 2]) as f64 / 2.0
    } else {
        times[count / 2] as f64
    };
    let sum: u128 = times.iter().sum();
    Some(Stats {
        min: times[0],
        max: times[count - 1],
        avg: sum as f64 / count as f64,
        median,
        sum,
    })
}

fn parse_pair(logic: &str, data: &str) -> Result<(Value, Value), BenchError> {
    let logic: serde_json::Value = serde_json::from_str(logic).map_err(BenchError::Json)?;
    let data: serde_json::Value = serde_json::from_str(data).map_err(BenchError::Json)?;
    Ok((Value::from(logic), Value::from(data)))
}

pub fn run(
    count: usize,
    logic: &str,
    data: &str,
    operators: &Operators,
    options: &EvalOptions,
) -> Result<BenchReport, BenchError> {
    // Fail fast on bad input before timing anything.
    let (l, d) = parse_pair(logic, data)?;
    evaluate_with(&l, &d, operators, options).map_err(BenchError::Eval)?;

    let mut parse_times = Vec::with_capacity(count);
    let mut apply_times = Vec::with_capacity(count);
    let mut print_times = Vec::with_capacity(count);
    let mut sum_times = Vec::with_capacity(count);
    let mut sink = std::io::sink();

    for _ in 0..count {
        let start = Instant::now();
        let (l, d) = parse_pair(logic, data)?;
        let parse_done = Instant::now();
        let result = evaluate_with(&l, &d, operators, options).map_err(BenchError::Eval)?;
        let apply_done = Instant::now();
        serde_json::to_writer(&mut sink, &result).map_err(BenchError::Json)?;
        sink.write_all(b"\n").map_err(BenchError::Io)?;
        let print_done = Instant::now();

        parse_times.push((parse_done - start).as_nanos());
        apply_times.push((apply_done - parse_done).as_nanos());
        print_times.push((print_done - apply_done).as_nanos());
        sum_times.push((print_done - start).as_nanos());
    }

    let zero = Stats {
        min: 0,
        max: 0,
        avg: 0.0,
        median: 0.0,
        sum: 0,
    };
    Ok(BenchReport {
        count,
        parse: summarize(&mut parse_times).unwrap_or(zero),
        apply: summarize(&mut apply_times).unwrap_or(zero),
        print: summarize(&mut print_times).unwrap_or(zero),
        sum: summarize(&mut sum_times).unwrap_or(zero),
    })
}

fn ms(nanos: f64) -> f64 {
    nanos / 1_000_000.0
}

fn row(name: &str, st: &Stats) -> String {
    format!(
        "{:<5} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}",
        name,
        ms(st.min as f64),
        ms(st.max as f64),
        ms(st.avg),
        ms(st.median),
        ms(st.sum as f64),
    )
}

/// Fixed-width table, one row per phase.
pub fn render_table(report: &BenchReport) -> String {
    let mut out = String::from("             min        max        avg     median        sum\n");
    for (name, st) in [
        ("parse", &report.parse),
        ("apply", &report.apply),
        ("print", &report.print),
        ("sum", &report.sum),
    ] {
        out.push_str(&row(name, st));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_and_odd_counts() {
        let st = summarize(&mut [4, 1, 3, 2]).unwrap();
        assert_eq!(st.min, 1);
        assert_eq!(st.max, 4);
        assert_eq!(st.median, 2.5);
        assert_eq!(st.sum, 10);
        assert_eq!(st.avg, 2.5);
        assert_eq!(summarize(&mut [5, 1, 3]).unwrap().median, 3.0);
        assert!(summarize(&mut []).is_none());
    }

    #[test]
    fn run_reports_every_phase() {
        let report = run(
            3,
            r#"{"+": [1, {"var": "x"}]}"#,
            r#"{"x": 2}"#,
            &jsonlogic::extras(),
            &EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(report.count, 3);
        assert!(report.sum.sum >= report.apply.sum);
        let table = render_table(&report);
        assert_eq!(table.lines().count(), 5);
        assert!(table.lines().nth(1).unwrap().starts_with("parse "));
    }

    #[test]
    fn bad_logic_fails_before_timing() {
        let err = run(10, "{", "null", &jsonlogic::extras(), &EvalOptions::default()).unwrap_err();
        assert!(matches!(err, BenchError::Json(_)));
        let err = run(10, r#"{"nope": []}"#, "null", &jsonlogic::extras(), &EvalOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("Unrecognized operation: 'nope'"));
    }

    #[test]
    fn write_failures_are_reported() {
        let err = BenchError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(err.to_string(), "write failed: closed");
    }
}
