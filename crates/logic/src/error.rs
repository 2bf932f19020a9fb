//! Evaluation errors.
//!
//! Every failure surfaces to the caller; nothing inside the evaluator
//! retries or substitutes a default. The only fallbacks are the ones the
//! operators define as part of their result (`var` defaults, vacuous
//! `all`/`some`/`none`, empty results of `filter`/`map`).

use std::fmt;

/// Errors that can occur while evaluating a logic tree.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// An operator name (or a segment of a namespaced name) is not present
    /// in the operator table.
    #[error("Unrecognized operation: '{name}'")]
    UnrecognizedOperation { name: String },

    /// `==` met a pair of kinds it has no coercion rule for.
    #[error("type error: cannot compare {left} with {right}")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },

    /// A string that does not match the accepted date/time patterns.
    #[error("invalid date/time: {input:?}")]
    InvalidTime { input: String },

    /// `plusTime` was given a unit other than year, month, day or hour.
    #[error("illegal unit: {unit:?}")]
    InvalidTimeUnit { unit: String },

    /// Date arithmetic left the representable calendar range.
    #[error("date/time out of range: {message}")]
    TimeOutOfRange { message: String },

    /// The logic tree is nested deeper than the configured limit.
    #[error("logic nested deeper than {limit} levels")]
    DepthExceeded { limit: usize },

    /// Failure raised by a caller-supplied operator.
    #[error(transparent)]
    Custom(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification of an [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unresolved operator name or namespace segment.
    Referential,
    /// No coercion rule for the operand kinds.
    Type,
    /// Malformed input value (time string, time unit).
    Value,
    /// A configured resource limit was hit.
    Resource,
    /// Raised by an operator outside this crate.
    Custom,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::UnrecognizedOperation { .. } => ErrorKind::Referential,
            EvalError::TypeMismatch { .. } => ErrorKind::Type,
            EvalError::InvalidTime { .. }
            | EvalError::InvalidTimeUnit { .. }
            | EvalError::TimeOutOfRange { .. } => ErrorKind::Value,
            EvalError::DepthExceeded { .. } => ErrorKind::Resource,
            EvalError::Custom(_) => ErrorKind::Custom,
        }
    }

    /// Wrap an arbitrary error raised by a custom operator.
    pub fn custom<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        EvalError::Custom(err.into())
    }

    pub(crate) fn unrecognized(name: impl Into<String>) -> Self {
        EvalError::UnrecognizedOperation { name: name.into() }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Referential => "referential",
            ErrorKind::Type => "type",
            ErrorKind::Value => "value",
            ErrorKind::Resource => "resource",
            ErrorKind::Custom => "custom",
        };
        f.write_str(s)
    }
}
