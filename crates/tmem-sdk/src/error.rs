use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("transaction error: {0}")]
    Transaction(#[from] tmem_txn::TxnError),

    #[error("ledger error: {0}")]
    Ledger(#[from] tmem_ledger::LedgerError),

    #[error("malformed log: {0}")]
    Malformed(#[from] tmem_types::TypeError),

    #[error("gate error: {0}")]
    Gate(#[from] tmem_gate::GateError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("hook error: {0}")]
    Hook(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
