//! # Distributed Lock Manager
//!
//! Named mutual-exclusion primitive for shared documents and external
//! resources. Workflows acquire locks before any read-modify-write on a
//! shared document and before mutating an external resource shared across
//! commands.

pub mod manager;

pub use manager::{EntityId, LockGuard, LockManager};
