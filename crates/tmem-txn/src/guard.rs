//! Statement guards: builtin or caller-supplied predicates over the document
//! and the selected node.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tmem_ledger::child;
use tmem_types::{is_empty_value, PathKey};

use crate::error::{Result, TxnError};

/// Caller-supplied predicate: `(document, selected, extra args)`.
///
/// Returning `Err` fails the guard and aborts the transaction.
pub type Predicate =
    Arc<dyn Fn(&Value, &Value, &[Value]) -> std::result::Result<bool, String> + Send + Sync>;

/// Predicates shipped with the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// `empty(attr?)`: the node, or its named attribute, has no entries.
    Empty,
    /// `exists(attr)`: the node has the key.
    Exists,
}

impl Builtin {
    pub fn as_str(self) -> &'static str {
        match self {
            Builtin::Empty => "empty",
            Builtin::Exists => "exists",
        }
    }

    fn evaluate(self, selected: &Value, args: &[Value]) -> Result<bool> {
        let attribute = args
            .first()
            .map(|arg| {
                PathKey::from_value(arg)
                    .map_err(|e| TxnError::Guard(format!("{}: {e}", self.as_str())))
            })
            .transpose()?;

        match (self, attribute) {
            (Builtin::Empty, None) => Ok(is_empty_value(selected)),
            (Builtin::Empty, Some(key)) => {
                Ok(child(selected, &key).map_or(true, is_empty_value))
            }
            (Builtin::Exists, Some(key)) => Ok(child(selected, &key).is_some()),
            (Builtin::Exists, None) => {
                Err(TxnError::Guard("exists requires an attribute name".into()))
            }
        }
    }
}

impl FromStr for Builtin {
    type Err = TxnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "empty" => Ok(Builtin::Empty),
            "exists" => Ok(Builtin::Exists),
            other => Err(TxnError::Guard(format!(
                "no built-in function with {other:?} name"
            ))),
        }
    }
}

/// A guard attached to a statement (`if`, `unless` or `validate`).
#[derive(Clone)]
pub enum Guard {
    /// Named builtin, resolved when the guard is evaluated.
    Builtin { name: String, args: Vec<Value> },
    Predicate { func: Predicate, args: Vec<Value> },
}

impl Guard {
    pub fn builtin(name: impl Into<String>, args: Vec<Value>) -> Self {
        Guard::Builtin {
            name: name.into(),
            args,
        }
    }

    pub fn empty() -> Self {
        Self::builtin(Builtin::Empty.as_str(), Vec::new())
    }

    pub fn empty_attr(attribute: impl Into<PathKey>) -> Self {
        Self::builtin(Builtin::Empty.as_str(), vec![attribute.into().to_value()])
    }

    pub fn exists(attribute: impl Into<PathKey>) -> Self {
        Self::builtin(Builtin::Exists.as_str(), vec![attribute.into().to_value()])
    }

    pub fn predicate<F>(func: F) -> Self
    where
        F: Fn(&Value, &Value, &[Value]) -> std::result::Result<bool, String> + Send + Sync + 'static,
    {
        Guard::Predicate {
            func: Arc::new(func),
            args: Vec::new(),
        }
    }

    /// Extra arguments passed to the predicate after the document and node.
    pub fn with_args(mut self, extra: Vec<Value>) -> Self {
        match &mut self {
            Guard::Builtin { args, .. } | Guard::Predicate { args, .. } => *args = extra,
        }
        self
    }

    pub fn evaluate(&self, document: &Value, selected: &Value) -> Result<bool> {
        match self {
            Guard::Builtin { name, args } => name.parse::<Builtin>()?.evaluate(selected, args),
            Guard::Predicate { func, args } => {
                func(document, selected, args).map_err(TxnError::Guard)
            }
        }
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, args) = match self {
            Guard::Builtin { name, args } => (Value::String(name.clone()).to_string(), args),
            Guard::Predicate { args, .. } => ("<predicate>".to_string(), args),
        };
        write!(f, "[{head}")?;
        for arg in args {
            write!(f, ", {arg}")?;
        }
        write!(f, "]")
    }
}
