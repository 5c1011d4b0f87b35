//! Authorization gate: one decision function for every project-scoped
//! operation.
//!
//! Precedence: superuser, then project owner, then the membership role for
//! (user, project), each role covering the capabilities at or below its
//! level. No membership row means Deny. The gate only decides; callers act
//! on the result.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::membership::{Capability, ProjectRole};

/// An authenticated actor: interactive user or CI caller behind an API key.
/// Key validation happens before this point, so the gate treats both alike.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: Uuid,
    pub is_superuser: bool,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Pure precedence evaluation over already-loaded facts.
pub fn evaluate(
    principal: &Principal,
    owner_id: Uuid,
    membership_role: Option<ProjectRole>,
    capability: Capability,
) -> Decision {
    if principal.is_superuser {
        return Decision::Allow;
    }
    if principal.id == owner_id {
        return Decision::Allow;
    }
    match membership_role {
        Some(role) if role.covers(capability) => Decision::Allow,
        _ => Decision::Deny,
    }
}

/// Look up the principal's membership role for a project, if any.
pub async fn membership_role(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ProjectRole>, AppError> {
    let role = sqlx::query_scalar::<_, ProjectRole>(
        "SELECT role FROM memberships WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(role)
}

/// Decide whether a principal holds a capability on a project.
///
/// Returns `NotFound` if the project does not exist; resources carrying a
/// project foreign key must be resolved to their project before calling.
pub async fn decide(
    pool: &PgPool,
    principal: &Principal,
    capability: Capability,
    project_id: Uuid,
) -> Result<Decision, AppError> {
    let owner_id = sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    if principal.is_superuser || principal.id == owner_id {
        return Ok(Decision::Allow);
    }

    let role = membership_role(pool, project_id, principal.id).await?;
    Ok(evaluate(principal, owner_id, role, capability))
}

/// Enforce a capability, mapping Deny to `Forbidden`.
pub async fn require(
    pool: &PgPool,
    principal: &Principal,
    capability: Capability,
    project_id: Uuid,
) -> Result<(), AppError> {
    match decide(pool, principal, capability, project_id).await? {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AppError::Forbidden(
            "Insufficient project permissions".to_string(),
        )),
    }
}

/// Enforce view access, collapsing Deny to `NotFound` so callers cannot
/// distinguish an invisible resource from an absent one.
pub async fn require_visible(
    pool: &PgPool,
    principal: &Principal,
    project_id: Uuid,
) -> Result<(), AppError> {
    match decide(pool, principal, Capability::View, project_id).await? {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AppError::NotFound("Project not found".to_string())),
    }
}

/// Projects the principal may view: all for a superuser, otherwise owned
/// projects plus any with a membership row.
pub async fn visible_project_ids(
    pool: &PgPool,
    principal: &Principal,
) -> Result<Vec<Uuid>, AppError> {
    let ids = if principal.is_superuser {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM projects")
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM projects WHERE owner_id = $1
            UNION
            SELECT project_id FROM memberships WHERE user_id = $1
            "#,
        )
        .bind(principal.id)
        .fetch_all(pool)
        .await?
    };

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: Uuid) -> Principal {
        Principal {
            id,
            is_superuser: false,
        }
    }

    #[test]
    fn superuser_always_allowed() {
        let root = Principal {
            id: Uuid::new_v4(),
            is_superuser: true,
        };
        let owner = Uuid::new_v4();
        for capability in [Capability::View, Capability::Contribute, Capability::Manage] {
            assert_eq!(evaluate(&root, owner, None, capability), Decision::Allow);
        }
    }

    #[test]
    fn owner_always_allowed() {
        let owner_id = Uuid::new_v4();
        let owner = user(owner_id);
        for capability in [Capability::View, Capability::Contribute, Capability::Manage] {
            assert_eq!(
                evaluate(&owner, owner_id, None, capability),
                Decision::Allow
            );
        }
    }

    #[test]
    fn viewer_allowed_view_only() {
        let member = user(Uuid::new_v4());
        let owner = Uuid::new_v4();
        assert_eq!(
            evaluate(&member, owner, Some(ProjectRole::Viewer), Capability::View),
            Decision::Allow
        );
        assert_eq!(
            evaluate(
                &member,
                owner,
                Some(ProjectRole::Viewer),
                Capability::Contribute
            ),
            Decision::Deny
        );
        assert_eq!(
            evaluate(
                &member,
                owner,
                Some(ProjectRole::Viewer),
                Capability::Manage
            ),
            Decision::Deny
        );
    }

    #[test]
    fn developer_allowed_contribute() {
        let member = user(Uuid::new_v4());
        let owner = Uuid::new_v4();
        assert_eq!(
            evaluate(
                &member,
                owner,
                Some(ProjectRole::Developer),
                Capability::Contribute
            ),
            Decision::Allow
        );
        assert_eq!(
            evaluate(
                &member,
                owner,
                Some(ProjectRole::Developer),
                Capability::Manage
            ),
            Decision::Deny
        );
    }

    #[test]
    fn manager_allowed_manage() {
        let member = user(Uuid::new_v4());
        let owner = Uuid::new_v4();
        assert_eq!(
            evaluate(
                &member,
                owner,
                Some(ProjectRole::Manager),
                Capability::Manage
            ),
            Decision::Allow
        );
    }

    #[test]
    fn non_member_denied_everything() {
        let stranger = user(Uuid::new_v4());
        let owner = Uuid::new_v4();
        for capability in [Capability::View, Capability::Contribute, Capability::Manage] {
            assert_eq!(evaluate(&stranger, owner, None, capability), Decision::Deny);
        }
    }
}
