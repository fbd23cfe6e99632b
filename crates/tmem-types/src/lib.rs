//! Foundation types for tmem.
//!
//! tmem is an embeddable in-memory document store: transactions of
//! declarative statements compile into a compact, replayable low-level
//! operation log. This crate holds the shared vocabulary every other tmem
//! crate depends on.
//!
//! # Key Types
//!
//! - [`PathKey`] / [`Path`] - keys and indices addressing nodes from the root
//! - [`Opcode`] - the closed set of low-level opcodes
//! - [`Instruction`] - one owned `[opcode, argCount, args…]` instruction
//! - [`OpLog`] - the flat, self-delimiting token stream
//! - [`ComboMap`] - read-only view of a map with pending changes applied

pub mod error;
pub mod instruction;
pub mod log;
pub mod overlay;
pub mod path;
pub mod value;

pub use error::TypeError;
pub use instruction::{read_instruction, Instruction, InstructionRef, Opcode};
pub use log::{Instructions, OpLog};
pub use overlay::{ChangeSet, ComboMap};
pub use path::{display_path, path_from_values, Path, PathKey};
pub use value::{compare_values, deep_clone, is_container, is_empty_value, kind_name, structural_eq};

pub use serde_json::Value;
