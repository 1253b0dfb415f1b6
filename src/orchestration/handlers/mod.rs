//! Domain command handlers.
//!
//! Every handler takes the locks its read-modify-write needs, persists
//! through journaled activities, and reports its outcome as a
//! `CommandResult`. Handlers never talk to collaborators directly; the
//! handler context routes everything through the workflow.

pub mod organization;
pub mod project;
pub mod user;

pub use organization::OrganizationCommandHandler;
pub use project::{
    ProjectCreateCommandHandler, ProjectDeployCommandHandler, ProjectDestroyCommandHandler,
};
pub use user::UserCommandHandler;
