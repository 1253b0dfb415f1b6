//! # Command Dispatch
//!
//! Maps a command instance to exactly one registered handler through a
//! compile-time registration table keyed by [`crate::models::CommandKind`].
//! There is no runtime type inspection: a handler declares the kinds it
//! handles and registration rejects duplicates.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{can_handle, CommandDispatcher, DispatchError};
pub use handler::{CommandHandler, HandlerContext, HandlerError};
