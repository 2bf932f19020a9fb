mod bench;
mod config;
mod runner;
mod tap;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use jsonlogic::{EvalError, EvalOptions, Operators, Value};

use crate::config::{Config, OperatorSet};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// JsonLogic and CertLogic rule evaluator.
#[derive(Parser)]
#[command(name = "jsonlogic", version, about = "JsonLogic and CertLogic rule evaluator")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate JsonLogic against a data context
    Eval {
        /// Logic as JSON text
        logic: String,
        /// Data context as JSON text (default: null)
        data: Option<String>,
        /// Operator table to evaluate with
        #[arg(long, value_enum)]
        operators: Option<OperatorSet>,
        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
        /// Reject logic nested deeper than this
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Evaluate a CertLogic expression against a data context
    Cert {
        /// CertLogic expression as JSON text
        logic: String,
        /// Data context as JSON text (default: null)
        data: Option<String>,
        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
        /// Reject logic nested deeper than this
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Time repeated parse / evaluate / print cycles
    Bench {
        /// Logic as JSON text
        logic: String,
        /// Data context as JSON text
        data: String,
        /// Number of iterations
        count: Option<usize>,
    },

    /// Run the conformance test suite
    Test {
        /// Path to the conformance suite directory
        #[arg(default_value = "conformance")]
        suite_dir: PathBuf,
    },
}

const DEFAULT_BENCH_REPEAT: usize = 1000;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match config::read_config(path) {
            Ok(c) => c,
            Err(msg) => {
                report_error(&format!("error: {}", msg), cli.output, cli.quiet);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Eval {
            logic,
            data,
            operators,
            pretty,
            max_depth,
        } => {
            let table = operators
                .or(config.eval.operators)
                .unwrap_or_default()
                .table();
            let options = EvalOptions {
                max_depth: max_depth.or(config.eval.max_depth),
            };
            let pretty = pretty || config.eval.pretty.unwrap_or(false);
            cmd_eval(
                Dialect::General,
                &logic,
                data.as_deref(),
                &table,
                &options,
                pretty,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Cert {
            logic,
            data,
            pretty,
            max_depth,
        } => {
            let options = EvalOptions {
                max_depth: max_depth.or(config.eval.max_depth),
            };
            let pretty = pretty || config.eval.pretty.unwrap_or(false);
            cmd_eval(
                Dialect::Cert,
                &logic,
                data.as_deref(),
                &jsonlogic::cert::extras(),
                &options,
                pretty,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Bench { logic, data, count } => {
            let count = count
                .or(config.bench.repeat)
                .unwrap_or(DEFAULT_BENCH_REPEAT);
            let options = EvalOptions {
                max_depth: config.eval.max_depth,
            };
            cmd_bench(count, &logic, &data, &options, cli.output, cli.quiet);
        }
        Commands::Test { suite_dir } => {
            let options = EvalOptions {
                max_depth: config.eval.max_depth,
            };
            cmd_test(&suite_dir, &options);
        }
    }
}

/// Logs go to stderr so stdout stays a clean JSON result.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("JSONLOGIC_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Clone, Copy)]
enum Dialect {
    General,
    Cert,
}

fn parse_arg(name: &str, text: &str, output: OutputFormat, quiet: bool) -> Value {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(v) => Value::from(v),
        Err(e) => {
            let msg = format!("error: invalid JSON in {}: {}", name, e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_eval(
    dialect: Dialect,
    logic: &str,
    data: Option<&str>,
    operators: &Operators,
    options: &EvalOptions,
    pretty: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let logic = parse_arg("logic", logic, output, quiet);
    let data = match data {
        Some(text) => parse_arg("data", text, output, quiet),
        None => Value::Null,
    };

    tracing::debug!(?dialect, "evaluating");
    let result = match dialect {
        Dialect::General => jsonlogic::evaluate_with(&logic, &data, operators, options),
        Dialect::Cert => jsonlogic::cert::evaluate_with(&logic, &data, operators, options),
    };

    match result {
        Ok(value) => {
            let json = value.to_json();
            let text = if pretty {
                serde_json::to_string_pretty(&json)
            } else {
                serde_json::to_string(&json)
            };
            match text {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    report_error(&format!("serialization error: {}", e), output, quiet);
                    process::exit(1);
                }
            }
        }
        Err(e) => {
            report_eval_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_bench(
    count: usize,
    logic: &str,
    data: &str,
    options: &EvalOptions,
    output: OutputFormat,
    quiet: bool,
) {
    let report = match bench::run(count, logic, data, &jsonlogic::extras(), options) {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    match output {
        OutputFormat::Text => print!("{}", bench::render_table(&report)),
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
            println!("{}", text);
        }
    }
}

fn cmd_test(suite_dir: &Path, options: &EvalOptions) {
    if !suite_dir.exists() {
        eprintln!(
            "error: conformance suite directory not found: {}",
            suite_dir.display()
        );
        process::exit(1);
    }

    let result = runner::run_suite(suite_dir, options);
    if result.failed > 0 {
        process::exit(1);
    }
}

fn report_eval_error(err: &EvalError, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", err),
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({"error": err.to_string(), "kind": err.kind().to_string()})
        ),
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({"error": msg})),
    }
}
