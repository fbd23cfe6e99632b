//! Transaction compiler for tmem.
//!
//! A transaction is an ordered list of declarative [`Statement`]s. Each one
//! selects a node, optionally checks `if`/`unless` and `validate` guards, and
//! performs one high-level operation. [`update`] compiles the statements to
//! low-level instructions, applies them to the document as it goes and
//! returns the resulting [`OpLog`](tmem_types::OpLog). On any failure every
//! change is rolled back and the document is left untouched.
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use tmem_txn::{parse_transaction, update};
//!
//! let mut doc = json!({"tags": {"a": []}});
//! let statements = parse_transaction(&json!([
//!     {"select": "tags", "operation": ["delete", "a"], "if": ["empty", "a"]},
//!     {"select": "tags", "operation": ["set", "b", []], "unless": ["exists", "b"]}
//! ]))
//! .unwrap();
//!
//! let log = update(&mut doc, &statements).unwrap();
//! assert_eq!(doc, json!({"tags": {"b": []}}));
//! assert_eq!(
//!     serde_json::to_value(&log).unwrap(),
//!     json!(["select", 1, "tags", "hDelete", 1, "a", "hSet", 2, "b", []])
//! );
//! ```

pub mod compiler;
pub mod error;
pub mod guard;
pub mod operation;
pub mod rollback;
pub mod statement;

pub use compiler::update;
pub use error::TxnError;
pub use guard::{Builtin, Guard, Predicate};
pub use operation::{compile, Compiled, OperationCall, OperationKind};
pub use rollback::Rollback;
pub use statement::{parse_transaction, Condition, Statement};
