//! Project membership model: per-project roles and the capability lattice
//! they grant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-project role, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord,
)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Viewer,
    Developer,
    Manager,
}

/// Permission level requested against a project, ordered like roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    View,
    Contribute,
    Manage,
}

impl ProjectRole {
    /// The highest capability this role grants. A role covers every
    /// capability at or below its own level.
    pub fn max_capability(self) -> Capability {
        match self {
            ProjectRole::Viewer => Capability::View,
            ProjectRole::Developer => Capability::Contribute,
            ProjectRole::Manager => Capability::Manage,
        }
    }

    pub fn covers(self, capability: Capability) -> bool {
        self.max_capability() >= capability
    }
}

/// Membership row: one role per (project, user) pair.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

/// Membership joined with the member's username for list views.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MembershipWithUser {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMembership {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMembership {
    pub role: ProjectRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering() {
        assert!(ProjectRole::Viewer < ProjectRole::Developer);
        assert!(ProjectRole::Developer < ProjectRole::Manager);
    }

    #[test]
    fn capability_ordering() {
        assert!(Capability::View < Capability::Contribute);
        assert!(Capability::Contribute < Capability::Manage);
    }

    #[test]
    fn viewer_covers_view_only() {
        assert!(ProjectRole::Viewer.covers(Capability::View));
        assert!(!ProjectRole::Viewer.covers(Capability::Contribute));
        assert!(!ProjectRole::Viewer.covers(Capability::Manage));
    }

    #[test]
    fn developer_covers_contribute_and_below() {
        assert!(ProjectRole::Developer.covers(Capability::View));
        assert!(ProjectRole::Developer.covers(Capability::Contribute));
        assert!(!ProjectRole::Developer.covers(Capability::Manage));
    }

    #[test]
    fn manager_covers_everything() {
        assert!(ProjectRole::Manager.covers(Capability::View));
        assert!(ProjectRole::Manager.covers(Capability::Contribute));
        assert!(ProjectRole::Manager.covers(Capability::Manage));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProjectRole::Manager).unwrap(),
            "\"manager\""
        );
        let parsed: ProjectRole = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(parsed, ProjectRole::Viewer);
    }
}
