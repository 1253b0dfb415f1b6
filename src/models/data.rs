//! # Domain Documents
//!
//! Container documents managed by the provisioning system. Every document
//! carries an `etag` (bumped on each write) and a `timestamp`; both flow into
//! broadcast items so subscribers can detect stale notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Document mutation surfaced by the store's change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEvent {
    Create,
    Update,
    Delete,
}

impl ChangeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeEvent::Create => "create",
            ChangeEvent::Update => "update",
            ChangeEvent::Delete => "delete",
        }
    }
}

/// Discriminator for the document payload carried by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Organization,
    Project,
    User,
    Component,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Organization => "organization",
            DocumentKind::Project => "project",
            DocumentKind::User => "user",
            DocumentKind::Component => "component",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMembership {
    pub project_id: String,
    pub role: ProjectRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub slug: String,
    pub display_name: String,
    pub resource_id: Option<String>,
    pub etag: String,
    pub timestamp: DateTime<Utc>,
}

impl Organization {
    pub fn new(slug: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            slug: slug.into(),
            display_name: display_name.into(),
            resource_id: None,
            etag: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub organization: String,
    pub slug: String,
    pub display_name: String,
    /// Provisioning template handed to the deployment activity
    pub template: serde_json::Value,
    pub resource_id: Option<String>,
    pub deployment_outputs: HashMap<String, String>,
    pub etag: String,
    pub timestamp: DateTime<Utc>,
}

impl Project {
    pub fn new(
        organization: impl Into<String>,
        slug: impl Into<String>,
        display_name: impl Into<String>,
        template: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization: organization.into(),
            slug: slug.into(),
            display_name: display_name.into(),
            template,
            resource_id: None,
            deployment_outputs: HashMap::new(),
            etag: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub organization: String,
    pub display_name: Option<String>,
    pub role: OrganizationRole,
    pub project_memberships: Vec<ProjectMembership>,
    pub etag: String,
    pub timestamp: DateTime<Utc>,
}

impl User {
    pub fn new(organization: impl Into<String>, role: OrganizationRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization: organization.into(),
            display_name: None,
            role,
            project_memberships: Vec::new(),
            etag: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn membership(&self, project_id: &str) -> Option<&ProjectMembership> {
        self.project_memberships
            .iter()
            .find(|m| m.project_id == project_id)
    }

    /// Add or replace the membership for a project
    pub fn ensure_membership(&mut self, project_id: impl Into<String>, role: ProjectRole) {
        let project_id = project_id.into();
        match self
            .project_memberships
            .iter_mut()
            .find(|m| m.project_id == project_id)
        {
            Some(existing) => existing.role = role,
            None => self
                .project_memberships
                .push(ProjectMembership { project_id, role }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub organization: String,
    pub project_id: String,
    pub slug: Option<String>,
    pub template_id: String,
    pub resource_id: Option<String>,
    pub etag: String,
    pub timestamp: DateTime<Utc>,
}

/// Tagged union over all container documents.
///
/// The explicit `type` discriminator is what makes polymorphic decoding of
/// queued command envelopes possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "document", rename_all = "snake_case")]
pub enum Document {
    Organization(Organization),
    Project(Project),
    User(User),
    Component(Component),
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Organization(_) => DocumentKind::Organization,
            Document::Project(_) => DocumentKind::Project,
            Document::User(_) => DocumentKind::User,
            Document::Component(_) => DocumentKind::Component,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Document::Organization(d) => &d.id,
            Document::Project(d) => &d.id,
            Document::User(d) => &d.id,
            Document::Component(d) => &d.id,
        }
    }

    pub fn etag(&self) -> &str {
        match self {
            Document::Organization(d) => &d.etag,
            Document::Project(d) => &d.etag,
            Document::User(d) => &d.etag,
            Document::Component(d) => &d.etag,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Document::Organization(d) => d.timestamp,
            Document::Project(d) => d.timestamp,
            Document::User(d) => d.timestamp,
            Document::Component(d) => d.timestamp,
        }
    }

    pub fn slug(&self) -> Option<&str> {
        match self {
            Document::Organization(d) => Some(&d.slug),
            Document::Project(d) => Some(&d.slug),
            Document::User(_) => None,
            Document::Component(d) => d.slug.as_deref(),
        }
    }

    /// The organization an item belongs to; an organization document is its
    /// own context
    pub fn organization_context(&self) -> Option<&str> {
        match self {
            Document::Organization(d) => Some(&d.id),
            Document::Project(d) => Some(&d.organization),
            Document::User(d) => Some(&d.organization),
            Document::Component(d) => Some(&d.organization),
        }
    }

    /// The project an item belongs to; a project document is its own context
    pub fn project_context(&self) -> Option<&str> {
        match self {
            Document::Project(d) => Some(&d.id),
            Document::Component(d) => Some(&d.project_id),
            _ => None,
        }
    }

    pub fn component_context(&self) -> Option<&str> {
        match self {
            Document::Component(d) => Some(&d.id),
            _ => None,
        }
    }

    /// Assign a fresh etag and timestamp; the store calls this on every write
    pub fn bump(&mut self) {
        let etag = Uuid::new_v4().to_string();
        let now = Utc::now();
        match self {
            Document::Organization(d) => {
                d.etag = etag;
                d.timestamp = now;
            }
            Document::Project(d) => {
                d.etag = etag;
                d.timestamp = now;
            }
            Document::User(d) => {
                d.etag = etag;
                d.timestamp = now;
            }
            Document::Component(d) => {
                d.etag = etag;
                d.timestamp = now;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_discriminator_round_trips() {
        let doc = Document::Project(Project::new(
            "org-1",
            "alpha",
            "Alpha",
            serde_json::json!({"tier": "standard"}),
        ));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "project");

        let decoded: Document = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn organization_is_its_own_context() {
        let org = Organization::new("acme", "Acme");
        let id = org.id.clone();
        let doc = Document::Organization(org);
        assert_eq!(doc.organization_context(), Some(id.as_str()));
        assert_eq!(doc.project_context(), None);
    }

    #[test]
    fn ensure_membership_replaces_role() {
        let mut user = User::new("org-1", OrganizationRole::Member);
        user.ensure_membership("p1", ProjectRole::Member);
        user.ensure_membership("p1", ProjectRole::Owner);
        assert_eq!(user.project_memberships.len(), 1);
        assert_eq!(user.membership("p1").unwrap().role, ProjectRole::Owner);
    }
}
