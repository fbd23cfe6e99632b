//! Low-level operation log for tmem.
//!
//! This crate provides:
//! - Path selection with container/key-kind validation (`select`)
//! - `ReplayEngine`, the mechanical single-pass applier of flat token logs
//! - Textual rendering of logs as aligned, parseable JSON (`render`/`parse`)
//!
//! A log committed by the transaction compiler can be fed to
//! [`ReplayEngine::replay`] alone, by a peer or after a restart, to rebuild
//! identical state.

pub mod error;
pub mod render;
pub mod replay;
pub mod select;

pub use error::LedgerError;
pub use render::{parse, render};
pub use replay::{ReplayEngine, ReplayResult};
pub use select::{check_key, child, child_mut, resolve, resolve_mut, select};
