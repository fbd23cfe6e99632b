//! Path selection over the document tree.
//!
//! Every step must land on a container, and the key must match the
//! container's kind: integers for arrays, strings or integers for maps. The
//! selected node itself must be a container.

use serde_json::Value;
use tmem_types::{display_path, is_container, kind_name, Instruction, PathKey};

use crate::error::{LedgerError, Result};

/// Check that `node` is a container addressable by `key`.
pub fn check_key(node: &Value, key: &PathKey) -> std::result::Result<(), String> {
    match (node, key) {
        (Value::Array(_), PathKey::Index(_)) => Ok(()),
        (Value::Array(_), PathKey::Name(name)) => {
            Err(format!("key {name:?} for array should be an integer"))
        }
        (Value::Object(_), _) => Ok(()),
        (other, _) => Err(format!(
            "{} node should be a map or array",
            kind_name(other)
        )),
    }
}

/// The child under `key`, if present.
pub fn child<'a>(node: &'a Value, key: &PathKey) -> Option<&'a Value> {
    match node {
        Value::Array(items) => key.as_index().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(key.as_map_key().as_ref()),
        _ => None,
    }
}

/// Mutable access to the child under `key`, if present.
pub fn child_mut<'a>(node: &'a mut Value, key: &PathKey) -> Option<&'a mut Value> {
    match node {
        Value::Array(items) => key.as_index().and_then(|i| items.get_mut(i)),
        Value::Object(map) => map.get_mut(key.as_map_key().as_ref()),
        _ => None,
    }
}

fn selection_error(path: &[PathKey], reason: impl Into<String>) -> LedgerError {
    LedgerError::Selection {
        path: display_path(path),
        reason: reason.into(),
    }
}

fn missing(path: &[PathKey], depth: usize) -> LedgerError {
    selection_error(path, format!("no value at {}", path[depth]))
}

/// Walk `path` from the root, validating each step.
pub fn resolve<'a>(document: &'a Value, path: &[PathKey]) -> Result<&'a Value> {
    let mut node = document;
    for (depth, key) in path.iter().enumerate() {
        check_key(node, key).map_err(|reason| selection_error(path, reason))?;
        node = child(node, key).ok_or_else(|| missing(path, depth))?;
    }
    if !is_container(node) {
        return Err(selection_error(
            path,
            format!("selected {} node should be a map or array", kind_name(node)),
        ));
    }
    Ok(node)
}

/// Mutable counterpart of [`resolve`].
pub fn resolve_mut<'a>(document: &'a mut Value, path: &[PathKey]) -> Result<&'a mut Value> {
    let mut node = document;
    for (depth, key) in path.iter().enumerate() {
        check_key(node, key).map_err(|reason| selection_error(path, reason))?;
        node = child_mut(node, key).ok_or_else(|| missing(path, depth))?;
    }
    if !is_container(node) {
        return Err(selection_error(
            path,
            format!("selected {} node should be a map or array", kind_name(node)),
        ));
    }
    Ok(node)
}

/// Validate `path` against the document and compile it into a `select`
/// instruction carrying the full path.
pub fn select(document: &Value, path: &[PathKey]) -> Result<Instruction> {
    resolve(document, path)?;
    Ok(Instruction::select(path))
}
