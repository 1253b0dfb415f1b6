//! # Data Model
//!
//! Typed envelopes for command intents and results, the domain documents they
//! carry, and the records the audit and broadcast subsystems exchange.

pub mod audit;
pub mod broadcast;
pub mod command;
pub mod data;
pub mod deployment;
pub mod result;

pub use audit::AuditRecord;
pub use broadcast::{BroadcastItem, BroadcastMessage};
pub use command::{Command, CommandAction, CommandKind};
pub use data::{
    ChangeEvent, Component, Document, DocumentKind, Organization, OrganizationRole, Project,
    ProjectMembership, ProjectRole, User,
};
pub use deployment::{DeploymentDescriptor, DeploymentState, ProvisioningError};
pub use result::{CommandError, CommandResult, CommandRuntimeStatus, ErrorSeverity};
