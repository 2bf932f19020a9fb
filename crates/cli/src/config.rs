//! Configuration file for the `jsonlogic` binary.
//!
//! Every field is optional; command-line flags win over file values.
//!
//! # Example
//!
//! ```toml
//! [eval]
//! operators = "extras"   # or "builtins"
//! max_depth = 256
//! pretty = false
//!
//! [bench]
//! repeat = 1000
//! ```

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub eval: EvalSettings,
    #[serde(default)]
    pub bench: BenchSettings,
}

/// `[eval]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalSettings {
    /// Operator table for the general dialect.
    pub operators: Option<OperatorSet>,
    /// Reject logic nested deeper than this.
    pub max_depth: Option<usize>,
    /// Pretty-print results.
    pub pretty: Option<bool>,
}

/// `[bench]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchSettings {
    /// Iterations when `bench` is run without a count.
    pub repeat: Option<usize>,
}

/// Which operator table `eval` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OperatorSet {
    Builtins,
    #[default]
    Extras,
}

impl OperatorSet {
    pub fn table(self) -> jsonlogic::Operators {
        match self {
            OperatorSet::Builtins => jsonlogic::builtins(),
            OperatorSet::Extras => jsonlogic::extras(),
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Read and parse a config file.
///
/// Returns a human-readable error string on failure.
pub fn read_config(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.eval.operators.is_none());
        assert!(config.eval.max_depth.is_none());
        assert!(config.bench.repeat.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let config: Config = toml::from_str(
            r#"
            [eval]
            operators = "builtins"
            max_depth = 64
            pretty = true

            [bench]
            repeat = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.eval.operators, Some(OperatorSet::Builtins));
        assert_eq!(config.eval.max_depth, Some(64));
        assert_eq!(config.eval.pretty, Some(true));
        assert_eq!(config.bench.repeat, Some(50));
    }

    #[test]
    fn rejects_unknown_keys_and_values() {
        assert!(toml::from_str::<Config>("[eval]\nfoo = 1\n").is_err());
        assert!(toml::from_str::<Config>("[eval]\noperators = \"all\"\n").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_config(Path::new("/nonexistent/jsonlogic.toml")).unwrap_err();
        assert!(err.contains("could not read"));
    }
}
