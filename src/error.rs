use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TeamforgeError {
    CommandError(String),
    DispatchError(String),
    WorkflowError(String),
    LockError(String),
    StoreError(String),
    BroadcastError(String),
    ConfigurationError(String),
}

impl fmt::Display for TeamforgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamforgeError::CommandError(msg) => write!(f, "Command error: {msg}"),
            TeamforgeError::DispatchError(msg) => write!(f, "Dispatch error: {msg}"),
            TeamforgeError::WorkflowError(msg) => write!(f, "Workflow error: {msg}"),
            TeamforgeError::LockError(msg) => write!(f, "Lock error: {msg}"),
            TeamforgeError::StoreError(msg) => write!(f, "Store error: {msg}"),
            TeamforgeError::BroadcastError(msg) => write!(f, "Broadcast error: {msg}"),
            TeamforgeError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for TeamforgeError {}

pub type Result<T> = std::result::Result<T, TeamforgeError>;
