use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),

    #[error("invalid path key {0}: expected a string or a non-negative integer")]
    InvalidPathKey(String),

    #[error("truncated operation log at token {index}: {reason}")]
    Truncated { index: usize, reason: String },

    #[error("invalid argument count at token {index}: {found}")]
    InvalidArgCount { index: usize, found: String },
}

pub type Result<T> = std::result::Result<T, TypeError>;
