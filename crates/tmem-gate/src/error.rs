/// Errors returned by the admission gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// A writer is already waiting for admission.
    #[error("can't add writer, there's already queued writer!")]
    WriterAlreadyQueued,

    /// A writer currently holds the gate.
    #[error("can't add writer, there's already active writer!")]
    WriterAlreadyActive,

    /// The reader queue is at capacity.
    #[error("can't add reader, readers queue limit of {limit} reached!")]
    ReaderQueueFull { limit: usize },

    /// The gate's scheduler has shut down before the request was granted.
    #[error("gate closed before the request was granted")]
    Closed,
}

impl GateError {
    /// Whether this is a caller mistake reported at the registration call
    /// rather than a scheduling outcome.
    pub fn is_usage_error(&self) -> bool {
        !matches!(self, GateError::Closed)
    }
}

pub type GateResult<T> = Result<T, GateError>;
