use serde::{Deserialize, Serialize};

/// Configuration for the admission gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// When `true`, every request is granted immediately and releasing is a
    /// no-op. Readers and writers are no longer isolated from each other.
    pub disabled: bool,
    /// Maximum number of readers allowed to wait in the queue at once.
    pub reader_queue_size_limit: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            reader_queue_size_limit: 100,
        }
    }
}

impl GateConfig {
    /// A pass-through configuration for single-threaded embedders.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Default::default()
        }
    }

    pub fn with_reader_queue_size_limit(mut self, limit: usize) -> Self {
        self.reader_queue_size_limit = limit;
        self
    }
}
