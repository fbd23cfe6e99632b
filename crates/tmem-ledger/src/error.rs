use tmem_types::{Opcode, TypeError};

/// Errors produced by selection, replay, and rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("can't select {path}: {reason}")]
    Selection { path: String, reason: String },

    #[error("malformed operation log: {0}")]
    Malformed(#[from] TypeError),

    #[error("can't apply {opcode} at token {offset}: {reason}")]
    Apply {
        opcode: Opcode,
        offset: usize,
        reason: String,
    },

    #[error("render error: {0}")]
    Render(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Convenience alias used throughout the ledger crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
