//! # Durable Workflow Runtime
//!
//! A replay-safe workflow runtime: each workflow instance executes as a
//! single-threaded, cooperatively-scheduled body whose suspension points
//! (activities, timers, sub-workflows, external events, locks) journal their
//! outcomes before the body advances. On restart the journal is replayed
//! deterministically up to the last committed step, then execution resumes
//! live. Continue-as-new is a first-class suspension that discards the
//! journal and restarts the body with new input, bounding history growth in
//! polling loops.
//!
//! Activities are the only place for non-deterministic work (time,
//! randomness, external I/O) and must be idempotent: the runtime retries
//! them on transient failure, and a retried activity may have partially
//! succeeded before the failure.

pub mod context;
pub mod engine;
pub mod journal;
pub mod types;

pub use context::WorkflowContext;
pub use engine::{InstanceInfo, WorkflowRuntime};
pub use journal::{InMemoryJournalStore, JournalError, JournalStore, StepOutcome};
pub use types::{ActivityError, RetryPolicy, WorkflowError, WorkflowFailure, WorkflowStatus};
