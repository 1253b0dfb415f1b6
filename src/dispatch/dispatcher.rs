//! Registration table mapping command kinds to handlers.

use crate::dispatch::handler::CommandHandler;
use crate::models::command::{Command, CommandKind};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("no handler registered for command type '{0}'")]
    UnhandledCommand(String),
    #[error("duplicate handler registration for command type '{kind}': '{existing}' and '{duplicate}'")]
    DuplicateHandler {
        kind: String,
        existing: String,
        duplicate: String,
    },
}

/// True iff the command's concrete kind is among the handler's declared kinds
pub fn can_handle(handler: &dyn CommandHandler, command: &Command) -> bool {
    handler.handled_kinds().contains(&command.kind())
}

#[derive(Default)]
pub struct CommandDispatcher {
    table: HashMap<CommandKind, Arc<dyn CommandHandler>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every kind it declares. Registering a second
    /// handler for an already-mapped kind is a construction error.
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) -> Result<(), DispatchError> {
        for kind in handler.handled_kinds() {
            if let Some(existing) = self.table.get(&kind) {
                return Err(DispatchError::DuplicateHandler {
                    kind: kind.to_string(),
                    existing: existing.handler_id().to_string(),
                    duplicate: handler.handler_id().to_string(),
                });
            }
            debug!(kind = %kind, handler = handler.handler_id(), "handler registered");
            self.table.insert(kind, Arc::clone(&handler));
        }
        Ok(())
    }

    /// The handler mapped to a kind, orchestration or not
    pub fn resolve(&self, kind: CommandKind) -> Option<Arc<dyn CommandHandler>> {
        self.table.get(&kind).map(Arc::clone)
    }

    /// The unique top-level (orchestration) handler for a command. Absence of
    /// a match, or a match that only runs out-of-band, is an unhandled
    /// command naming the command's type.
    pub fn dispatch(&self, command: &Command) -> Result<Arc<dyn CommandHandler>, DispatchError> {
        match self.table.get(&command.kind()) {
            Some(handler) if handler.orchestration() => Ok(Arc::clone(handler)),
            _ => Err(DispatchError::UnhandledCommand(command.type_name())),
        }
    }

    pub fn registered_kinds(&self) -> Vec<CommandKind> {
        self.table.keys().copied().collect()
    }
}
