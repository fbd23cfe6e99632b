use serde_json::Value;
use tmem_ledger::{resolve_mut, LedgerError};
use tmem_types::Path;

/// Value-typed inverse of exactly one applied instruction.
///
/// Each record carries the path of the node it restores, so it stays valid
/// as long as rollbacks are applied in reverse order of application.
#[derive(Clone, Debug, PartialEq)]
pub enum Rollback {
    /// Nothing to undo.
    None,
    /// Undo `aSet`: restore the prior slot, or truncate back to `prior_len`
    /// when the set appended.
    ArraySet {
        path: Path,
        index: usize,
        prior: Option<Value>,
        prior_len: usize,
    },
    /// Undo `hSet`: restore the prior value or drop the key it created.
    MapSet {
        path: Path,
        key: String,
        prior: Option<Value>,
    },
    /// Undo `aAdd`.
    ArrayPop { path: Path },
    /// Undo `aDelete`.
    ArrayInsert {
        path: Path,
        index: usize,
        value: Value,
    },
    /// Undo `hDelete`.
    MapRestore {
        path: Path,
        key: String,
        value: Value,
    },
    /// Undo bulk mutations (`aSort`, `aSortBy`) from a full snapshot.
    ArrayRestore { path: Path, snapshot: Vec<Value> },
}

impl Rollback {
    /// Apply the inverse to `document`.
    pub fn undo(self, document: &mut Value) -> Result<(), LedgerError> {
        match self {
            Rollback::None => Ok(()),
            Rollback::ArraySet {
                path,
                index,
                prior,
                prior_len,
            } => {
                if let Some(items) = resolve_mut(document, &path)?.as_array_mut() {
                    match prior {
                        Some(value) if index < prior_len => items[index] = value,
                        _ => items.truncate(prior_len),
                    }
                }
                Ok(())
            }
            Rollback::MapSet { path, key, prior } => {
                if let Some(map) = resolve_mut(document, &path)?.as_object_mut() {
                    match prior {
                        Some(value) => {
                            map.insert(key, value);
                        }
                        None => {
                            map.remove(&key);
                        }
                    }
                }
                Ok(())
            }
            Rollback::ArrayPop { path } => {
                if let Some(items) = resolve_mut(document, &path)?.as_array_mut() {
                    items.pop();
                }
                Ok(())
            }
            Rollback::ArrayInsert { path, index, value } => {
                if let Some(items) = resolve_mut(document, &path)?.as_array_mut() {
                    let index = index.min(items.len());
                    items.insert(index, value);
                }
                Ok(())
            }
            Rollback::MapRestore { path, key, value } => {
                if let Some(map) = resolve_mut(document, &path)?.as_object_mut() {
                    map.insert(key, value);
                }
                Ok(())
            }
            Rollback::ArrayRestore { path, snapshot } => {
                if let Some(items) = resolve_mut(document, &path)?.as_array_mut() {
                    *items = snapshot;
                }
                Ok(())
            }
        }
    }
}
