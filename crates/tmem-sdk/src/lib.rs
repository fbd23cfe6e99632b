//! High-level SDK for tmem.
//!
//! [`Store`] is the embedding entry point: it owns a document, runs
//! transactions against it atomically under an admission gate, replays logs
//! committed by peers and keeps a journal of everything committed.
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use tmem_sdk::{Store, StoreConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Store::new(json!({"posts": []}), StoreConfig::default());
//! let log = store
//!     .transact_value(&json!([{"select": "posts", "operation": ["add", "hello"]}]))
//!     .await
//!     .unwrap();
//!
//! let replica = Store::new(json!({"posts": []}), StoreConfig::default());
//! replica.apply_log(&log).await.unwrap();
//! assert_eq!(replica.snapshot().await.unwrap(), json!({"posts": ["hello"]}));
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod store;

pub use config::StoreConfig;
pub use error::{SdkError, SdkResult};
pub use hooks::{CommitHook, NoOpHook};
pub use store::Store;

// Re-export key types
pub use tmem_gate::{GateConfig, GateStatus};
pub use tmem_ledger::{parse, render, ReplayEngine, ReplayResult};
pub use tmem_txn::{parse_transaction, Guard, OperationCall, Statement, TxnError};
pub use tmem_types::{OpLog, Path, PathKey, Value};
