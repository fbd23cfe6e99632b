use serde::{Deserialize, Serialize};
use tmem_gate::GateConfig;

use crate::error::{SdkError, SdkResult};

/// Configuration for a [`Store`](crate::Store).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub gate: GateConfig,
    /// Keep at most this many committed logs in the journal, dropping the
    /// oldest first. `None` keeps everything.
    pub journal_limit: Option<usize>,
}

impl StoreConfig {
    /// Parse a TOML document, e.g.
    ///
    /// ```toml
    /// journal_limit = 64
    ///
    /// [gate]
    /// reader_queue_size_limit = 16
    /// ```
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn with_journal_limit(mut self, limit: usize) -> Self {
        self.journal_limit = Some(limit);
        self
    }
}
