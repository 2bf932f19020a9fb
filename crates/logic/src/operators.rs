//! Operator tables.
//!
//! A table maps a name segment to either an operator or a nested table
//! (a namespace). Tables are immutable snapshots: to add or drop entries,
//! start a builder from an existing table, overlay, and build a new one.
//! Evaluators only ever read the table they are handed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::EvalError;
use crate::value::Value;

/// Signature of every operator: the data context plus evaluated arguments.
pub type OperatorFn = dyn Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync;

/// A callable operator.
#[derive(Clone)]
pub struct Operator(Arc<OperatorFn>);

impl Operator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Operator(Arc::new(f))
    }

    pub fn call(&self, data: &Value, args: &[Value]) -> Result<Value, EvalError> {
        (self.0)(data, args)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operator(..)")
    }
}

/// One slot of a table.
#[derive(Debug, Clone)]
pub enum Entry {
    Operator(Operator),
    Namespace(Operators),
}

/// Immutable, cheaply clonable operator table.
#[derive(Debug, Clone, Default)]
pub struct Operators {
    entries: Arc<HashMap<String, Entry>>,
}

impl Operators {
    pub fn builder() -> OperatorsBuilder {
        OperatorsBuilder::default()
    }

    /// Start a builder pre-filled with this table's entries.
    pub fn to_builder(&self) -> OperatorsBuilder {
        OperatorsBuilder {
            entries: (*self.entries).clone(),
        }
    }

    pub fn get(&self, segment: &str) -> Option<&Entry> {
        self.entries.get(segment)
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.entries.contains_key(segment)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-level names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Find the operator for a possibly dotted name.
    ///
    /// An exact key wins. Otherwise a dotted name is walked one segment at
    /// a time through nested tables. The error names the path up to and
    /// including the first segment that could not be followed.
    pub fn resolve(&self, name: &str) -> Result<&Operator, EvalError> {
        match self.entries.get(name) {
            Some(Entry::Operator(op)) => return Ok(op),
            Some(Entry::Namespace(_)) => return Err(EvalError::unrecognized(name)),
            None if !name.contains('.') => {
                tracing::debug!(operation = name, "unrecognized operation");
                return Err(EvalError::unrecognized(name));
            }
            None => {}
        }

        let segments: Vec<&str> = name.split('.').collect();
        let last = segments.len() - 1;
        let mut table = self;
        for (index, segment) in segments.iter().enumerate() {
            let failed_at = |i: usize| {
                let prefix = segments[..=i].join(".");
                tracing::debug!(operation = name, prefix = %prefix, "unrecognized namespace path");
                EvalError::unrecognized(prefix)
            };
            match table.entries.get(*segment) {
                None => return Err(failed_at(index)),
                Some(Entry::Operator(op)) if index == last => return Ok(op),
                Some(Entry::Operator(_)) => return Err(failed_at(index + 1)),
                Some(Entry::Namespace(_)) if index == last => return Err(failed_at(index)),
                Some(Entry::Namespace(inner)) => table = inner,
            }
        }
        Err(EvalError::unrecognized(name))
    }
}

/// Accumulates entries for a new [`Operators`] snapshot.
#[derive(Debug, Default)]
pub struct OperatorsBuilder {
    entries: HashMap<String, Entry>,
}

impl OperatorsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an operator.
    pub fn operator<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), Entry::Operator(Operator::new(f)));
        self
    }

    /// Register or replace a nested table.
    pub fn namespace(mut self, name: impl Into<String>, table: Operators) -> Self {
        self.entries.insert(name.into(), Entry::Namespace(table));
        self
    }

    pub fn entry(mut self, name: impl Into<String>, entry: Entry) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }

    /// Overlay every entry of `other`; its entries win on conflict.
    pub fn extend(mut self, other: &Operators) -> Self {
        for (name, entry) in other.entries.iter() {
            self.entries.insert(name.clone(), entry.clone());
        }
        self
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.entries.remove(name);
        self
    }

    pub fn build(self) -> Operators {
        Operators {
            entries: Arc::new(self.entries),
        }
    }
}
