//! # Command Auditing
//!
//! Append-only, best-effort status log keyed by `(command_id, handler_id)`.
//! Audit is observability, not correctness: the writer swallows every
//! persistence failure and logs it, so a broken audit store can never change
//! a command's outcome.

pub mod store;
pub mod writer;

pub use store::{AuditStore, AuditStoreError, InMemoryAuditStore};
pub use writer::CommandAuditWriter;
