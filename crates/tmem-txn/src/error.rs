use tmem_ledger::LedgerError;

/// Errors produced while compiling a transaction.
///
/// Every failure inside [`crate::update`] is reported as [`TxnError::Aborted`]
/// after all previously applied statements have been rolled back; the
/// wrapped cause is one of the other variants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TxnError {
    /// The statement's path could not be selected.
    #[error("selection failed: {0}")]
    Selection(LedgerError),

    /// A guard predicate failed or named an unknown builtin.
    #[error("guard failed: {0}")]
    Guard(String),

    /// An explicit validator returned `false`.
    #[error("validation failed!")]
    ValidationFailed,

    /// Unknown operation or a violated operation precondition.
    #[error("operation failed: {0}")]
    Operation(String),

    /// Applying a compiled instruction to the document failed.
    #[error("replay failed: {0}")]
    Replay(#[from] LedgerError),

    /// Transaction input could not be parsed into statements.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// A statement failed and the transaction was unwound.
    #[error("can't apply statement #{index} {statement} - {cause}")]
    Aborted {
        index: usize,
        statement: String,
        cause: Box<TxnError>,
    },
}

impl TxnError {
    /// The innermost cause, looking through [`TxnError::Aborted`].
    pub fn root_cause(&self) -> &TxnError {
        match self {
            TxnError::Aborted { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    pub(crate) fn operation(message: impl Into<String>) -> Self {
        TxnError::Operation(message.into())
    }
}

/// Convenience alias used throughout the txn crate.
pub type Result<T> = std::result::Result<T, TxnError>;
