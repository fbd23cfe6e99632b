//! High-level operations.
//!
//! Each operation inspects the selected node, checks its preconditions and
//! returns the low-level instruction that performs it together with the
//! rollback that undoes it. Operations never mutate the document themselves.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use tmem_ledger::check_key;
use tmem_types::{kind_name, structural_eq, Instruction, Opcode, Path, PathKey};

use crate::error::{Result, TxnError};
use crate::rollback::Rollback;

/// The closed set of high-level operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Set,
    Add,
    Delete,
    DeleteValue,
    Sort,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Set => "set",
            OperationKind::Add => "add",
            OperationKind::Delete => "delete",
            OperationKind::DeleteValue => "deleteValue",
            OperationKind::Sort => "sort",
        }
    }

    /// Inclusive bounds on the argument count.
    fn arity(self) -> (usize, usize) {
        match self {
            OperationKind::Set => (2, 2),
            OperationKind::Add | OperationKind::Delete | OperationKind::DeleteValue => (1, 1),
            OperationKind::Sort => (0, 1),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = TxnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "set" => Ok(OperationKind::Set),
            "add" => Ok(OperationKind::Add),
            "delete" => Ok(OperationKind::Delete),
            "deleteValue" => Ok(OperationKind::DeleteValue),
            "sort" => Ok(OperationKind::Sort),
            other => Err(TxnError::operation(format!("no {other:?} operation"))),
        }
    }
}

/// An operation invocation as written in a statement: a name and arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationCall {
    pub name: String,
    pub args: Vec<Value>,
}

impl OperationCall {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn set(key: impl Into<PathKey>, value: Value) -> Self {
        Self::new("set", vec![key.into().to_value(), value])
    }

    pub fn add(value: Value) -> Self {
        Self::new("add", vec![value])
    }

    pub fn delete(key: impl Into<PathKey>) -> Self {
        Self::new("delete", vec![key.into().to_value()])
    }

    pub fn delete_value(value: Value) -> Self {
        Self::new("deleteValue", vec![value])
    }

    pub fn sort() -> Self {
        Self::new("sort", Vec::new())
    }

    pub fn sort_by(attribute: impl Into<PathKey>) -> Self {
        Self::new("sort", vec![attribute.into().to_value()])
    }
}

impl fmt::Display for OperationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", Value::String(self.name.clone()))?;
        for arg in &self.args {
            write!(f, ", {arg}")?;
        }
        write!(f, "]")
    }
}

/// Output of compiling one operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    /// `None` when the operation turned out to be a no-op.
    pub instruction: Option<Instruction>,
    pub rollback: Rollback,
}

impl Compiled {
    fn new(instruction: Instruction, rollback: Rollback) -> Self {
        Self {
            instruction: Some(instruction),
            rollback,
        }
    }

    fn noop() -> Self {
        Self {
            instruction: None,
            rollback: Rollback::None,
        }
    }
}

/// Compile `kind` against `node`, the container selected at `path`.
pub fn compile(kind: OperationKind, path: &Path, node: &Value, args: &[Value]) -> Result<Compiled> {
    let (min, max) = kind.arity();
    if args.len() < min || args.len() > max {
        return Err(TxnError::operation(format!(
            "{kind} expects {} arguments, got {}",
            if min == max { min.to_string() } else { format!("{min} to {max}") },
            args.len()
        )));
    }

    match kind {
        OperationKind::Set => set(path, node, &args[0], &args[1]),
        OperationKind::Add => add(path, node, &args[0]),
        OperationKind::Delete => delete(path, node, &args[0]),
        OperationKind::DeleteValue => delete_value(path, node, &args[0]),
        OperationKind::Sort => sort(path, node, args.first()),
    }
}

fn container_key(node: &Value, key: &Value) -> Result<PathKey> {
    let key = PathKey::from_value(key).map_err(|e| TxnError::operation(e.to_string()))?;
    check_key(node, &key).map_err(TxnError::Operation)?;
    Ok(key)
}

fn not_a_container(node: &Value) -> TxnError {
    TxnError::operation(format!("{} node should be a map or array", kind_name(node)))
}

fn index_of(key: &PathKey) -> Result<usize> {
    key.as_index()
        .ok_or_else(|| TxnError::operation(format!("index {key} is out of range")))
}

fn set(path: &Path, node: &Value, key: &Value, value: &Value) -> Result<Compiled> {
    let key = container_key(node, key)?;
    match node {
        Value::Array(items) => {
            let index = index_of(&key)?;
            let prior_len = items.len();
            if index > prior_len {
                return Err(TxnError::operation(format!(
                    "can't set index {index} beyond array length {prior_len}"
                )));
            }
            Ok(Compiled::new(
                Instruction::new(Opcode::ASet, vec![key.to_value(), value.clone()]),
                Rollback::ArraySet {
                    path: path.clone(),
                    index,
                    prior: items.get(index).cloned(),
                    prior_len,
                },
            ))
        }
        Value::Object(map) => {
            let name = key.as_map_key().into_owned();
            Ok(Compiled::new(
                Instruction::new(Opcode::HSet, vec![key.to_value(), value.clone()]),
                Rollback::MapSet {
                    path: path.clone(),
                    prior: map.get(&name).cloned(),
                    key: name,
                },
            ))
        }
        other => Err(not_a_container(other)),
    }
}

fn add(path: &Path, node: &Value, value: &Value) -> Result<Compiled> {
    if !node.is_array() {
        return Err(TxnError::operation(format!(
            "can't add value {value} to non-array ({})",
            kind_name(node)
        )));
    }
    Ok(Compiled::new(
        Instruction::new(Opcode::AAdd, vec![value.clone()]),
        Rollback::ArrayPop { path: path.clone() },
    ))
}

fn delete(path: &Path, node: &Value, key: &Value) -> Result<Compiled> {
    let key = container_key(node, key)?;
    match node {
        Value::Array(items) => {
            let index = index_of(&key)?;
            let rollback = match items.get(index) {
                Some(value) => Rollback::ArrayInsert {
                    path: path.clone(),
                    index,
                    value: value.clone(),
                },
                None => Rollback::None,
            };
            Ok(Compiled::new(
                Instruction::new(Opcode::ADelete, vec![key.to_value()]),
                rollback,
            ))
        }
        Value::Object(map) => {
            let name = key.as_map_key().into_owned();
            let rollback = match map.get(&name) {
                Some(value) => Rollback::MapRestore {
                    path: path.clone(),
                    value: value.clone(),
                    key: name,
                },
                None => Rollback::None,
            };
            Ok(Compiled::new(
                Instruction::new(Opcode::HDelete, vec![key.to_value()]),
                rollback,
            ))
        }
        other => Err(not_a_container(other)),
    }
}

fn delete_value(path: &Path, node: &Value, value: &Value) -> Result<Compiled> {
    match node {
        Value::Array(items) => {
            let found = items.iter().position(|item| structural_eq(item, value));
            Ok(match found {
                Some(index) => Compiled::new(
                    Instruction::new(Opcode::ADelete, vec![Value::from(index as u64)]),
                    Rollback::ArrayInsert {
                        path: path.clone(),
                        index,
                        value: items[index].clone(),
                    },
                ),
                None => Compiled::noop(),
            })
        }
        Value::Object(map) => {
            let found = map.iter().find(|(_, item)| structural_eq(item, value));
            Ok(match found {
                Some((key, item)) => Compiled::new(
                    Instruction::new(Opcode::HDelete, vec![Value::String(key.clone())]),
                    Rollback::MapRestore {
                        path: path.clone(),
                        key: key.clone(),
                        value: item.clone(),
                    },
                ),
                None => Compiled::noop(),
            })
        }
        other => Err(not_a_container(other)),
    }
}

fn sort(path: &Path, node: &Value, attribute: Option<&Value>) -> Result<Compiled> {
    let Value::Array(items) = node else {
        return Err(TxnError::operation(format!(
            "can't sort non-array ({})",
            kind_name(node)
        )));
    };
    let instruction = match attribute {
        None | Some(Value::Null) => Instruction::new(Opcode::ASort, Vec::new()),
        Some(attribute) => {
            let key = PathKey::from_value(attribute).map_err(|_| {
                TxnError::operation(format!("invalid attribute for sorting {attribute}"))
            })?;
            Instruction::new(Opcode::ASortBy, vec![key.to_value()])
        }
    };
    Ok(Compiled::new(
        instruction,
        Rollback::ArrayRestore {
            path: path.clone(),
            snapshot: items.clone(),
        },
    ))
}
