//! Reader/writer admission gate for tmem.
//!
//! The gate serializes exclusive writers against concurrent readers of a
//! shared document. Callers wrap each read or write in a [`Grant`] obtained
//! from the gate and release it when done; dropping the grant releases it
//! too.
//!
//! # Quick Start
//!
//! ```rust
//! use tmem_gate::{AdmissionGate, GateConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gate = AdmissionGate::new(GateConfig::default());
//! let writer = gate.add_writer().unwrap().await.unwrap();
//! // ... mutate the document ...
//! writer.release();
//!
//! let reader = gate.add_reader().unwrap().await.unwrap();
//! assert_eq!(reader.id(), Some(0));
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gate;

pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use gate::{AccessKind, ActiveReader, ActiveWriter, AdmissionGate, GateStatus, Grant, PendingGrant};
