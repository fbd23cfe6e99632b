use std::cmp::Ordering;

use serde_json::Value;
use tmem_types::{
    compare_values, path_from_values, read_instruction, Instruction, OpLog, Opcode, Path, PathKey,
};
use tracing::{debug, trace};

use crate::error::{LedgerError, Result};
use crate::select::{child, resolve, resolve_mut};

/// Result of replaying a token stream into a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayResult {
    /// Path of the node selected when the stream ended.
    pub selection: Path,
    /// Number of instructions applied, `select` included.
    pub applied: u64,
}

/// Mechanical replay of low-level operation logs.
///
/// Replay trusts its input: it does only the checks a handler needs to touch
/// the tree and has no rollback. Logs produced by the transaction compiler
/// replayed onto the same pre-state always reproduce the committed post-state.
pub struct ReplayEngine;

impl ReplayEngine {
    /// Replay a whole log from the root.
    pub fn replay(document: &mut Value, log: &OpLog) -> Result<ReplayResult> {
        Self::update(document, log.tokens(), 0, Vec::new())
    }

    /// Replay `tokens` starting at `start_index` with `selection` as the
    /// initially selected node. Returns the final selection.
    pub fn update(
        document: &mut Value,
        tokens: &[Value],
        start_index: usize,
        selection: Path,
    ) -> Result<ReplayResult> {
        let mut selection = selection;
        let mut index = start_index;
        let mut applied = 0u64;

        while index < tokens.len() {
            let (instruction, next) = read_instruction(tokens, index)?;
            trace!(opcode = %instruction.opcode, offset = index, "replaying instruction");
            match handler(instruction.opcode) {
                None => {
                    let path = path_from_values(instruction.args)?;
                    resolve(document, &path)?;
                    selection = path;
                }
                Some(apply) => {
                    let node = resolve_mut(document, &selection)?;
                    apply(node, instruction.args).map_err(|reason| LedgerError::Apply {
                        opcode: instruction.opcode,
                        offset: index,
                        reason,
                    })?;
                }
            }
            applied += 1;
            index = next;
        }

        debug!(applied, tokens = tokens.len() - start_index.min(tokens.len()), "replay complete");
        Ok(ReplayResult { selection, applied })
    }

    /// Apply a single instruction against `selection`; returns the selection
    /// in effect afterwards.
    pub fn apply(document: &mut Value, selection: Path, instruction: &Instruction) -> Result<Path> {
        let tokens = instruction.to_tokens();
        Ok(Self::update(document, &tokens, 0, selection)?.selection)
    }
}

static NULL: Value = Value::Null;

type Handler = fn(&mut Value, &[Value]) -> std::result::Result<(), String>;

/// Handler for a mutating opcode. `select` changes the selection rather
/// than a node, so it has none.
fn handler(opcode: Opcode) -> Option<Handler> {
    let handler: Handler = match opcode {
        Opcode::Select => return None,
        Opcode::ASet => array_set,
        Opcode::HSet => map_set,
        Opcode::AAdd => array_add,
        Opcode::ADelete => array_delete,
        Opcode::HDelete => map_delete,
        Opcode::ASort => array_sort,
        Opcode::ASortBy => array_sort_by,
    };
    Some(handler)
}

fn arg(args: &[Value], i: usize) -> std::result::Result<&Value, String> {
    args.get(i).ok_or_else(|| format!("missing argument {i}"))
}

fn key_arg(args: &[Value], i: usize) -> std::result::Result<PathKey, String> {
    PathKey::from_value(arg(args, i)?).map_err(|e| e.to_string())
}

fn index_arg(args: &[Value], i: usize) -> std::result::Result<usize, String> {
    let value = arg(args, i)?;
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| format!("index {value} should be a non-negative integer"))
}

fn as_array(node: &mut Value) -> std::result::Result<&mut Vec<Value>, String> {
    node.as_array_mut().ok_or_else(|| "selected node is not an array".to_string())
}

fn as_map(node: &mut Value) -> std::result::Result<&mut serde_json::Map<String, Value>, String> {
    node.as_object_mut().ok_or_else(|| "selected node is not a map".to_string())
}

fn array_set(node: &mut Value, args: &[Value]) -> std::result::Result<(), String> {
    let index = index_arg(args, 0)?;
    let value = arg(args, 1)?.clone();
    let items = as_array(node)?;
    match index.cmp(&items.len()) {
        Ordering::Less => items[index] = value,
        Ordering::Equal => items.push(value),
        Ordering::Greater => {
            return Err(format!("index {index} is beyond length {}", items.len()));
        }
    }
    Ok(())
}

fn map_set(node: &mut Value, args: &[Value]) -> std::result::Result<(), String> {
    let key = key_arg(args, 0)?;
    let value = arg(args, 1)?.clone();
    as_map(node)?.insert(key.as_map_key().into_owned(), value);
    Ok(())
}

fn array_add(node: &mut Value, args: &[Value]) -> std::result::Result<(), String> {
    let value = arg(args, 0)?.clone();
    as_array(node)?.push(value);
    Ok(())
}

fn array_delete(node: &mut Value, args: &[Value]) -> std::result::Result<(), String> {
    let index = index_arg(args, 0)?;
    let items = as_array(node)?;
    if index < items.len() {
        items.remove(index);
    }
    Ok(())
}

fn map_delete(node: &mut Value, args: &[Value]) -> std::result::Result<(), String> {
    let key = key_arg(args, 0)?;
    as_map(node)?.remove(key.as_map_key().as_ref());
    Ok(())
}

fn array_sort(node: &mut Value, _args: &[Value]) -> std::result::Result<(), String> {
    as_array(node)?.sort_by(compare_values);
    Ok(())
}

fn array_sort_by(node: &mut Value, args: &[Value]) -> std::result::Result<(), String> {
    let attribute = key_arg(args, 0)?;
    as_array(node)?.sort_by(|a, b| {
        compare_values(
            child(a, &attribute).unwrap_or(&NULL),
            child(b, &attribute).unwrap_or(&NULL),
        )
    });
    Ok(())
}
