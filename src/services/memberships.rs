//! Membership management with the last-manager invariant.
//!
//! Every project keeps at least one MANAGER membership row (the owner gets
//! one at project creation). The check and the write share one transaction
//! with the project's membership rows locked, so two concurrent demotions
//! cannot both slip past the count.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::membership::{
    Capability, CreateMembership, Membership, MembershipWithUser, ProjectRole,
};
use crate::services::access::{self, Principal};

/// Add a member to a project (MANAGE required). Duplicate (project, user)
/// pairs are a Conflict.
pub async fn add_member(
    pool: &PgPool,
    caller: &Principal,
    input: &CreateMembership,
) -> Result<Membership, AppError> {
    access::require(pool, caller, Capability::Manage, input.project_id).await?;

    let user_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(input.user_id)
            .fetch_one(pool)
            .await?;
    if !user_exists {
        return Err(AppError::Validation("User does not exist".to_string()));
    }

    let membership = sqlx::query_as::<_, Membership>(
        r#"
        INSERT INTO memberships (project_id, user_id, role)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(input.project_id)
    .bind(input.user_id)
    .bind(input.role)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("User is already a member of this project".to_string())
        }
        _ => AppError::Database(e),
    })?;

    Ok(membership)
}

/// List a project's memberships with usernames (VIEW required; invisible
/// projects surface as NotFound).
pub async fn list_for_project(
    pool: &PgPool,
    caller: &Principal,
    project_id: Uuid,
) -> Result<Vec<MembershipWithUser>, AppError> {
    access::require_visible(pool, caller, project_id).await?;

    let members = sqlx::query_as::<_, MembershipWithUser>(
        r#"
        SELECT m.id, m.project_id, m.user_id, u.username, m.role, m.created_at
        FROM memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.project_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

/// Count the project's MANAGER rows while holding row locks, so concurrent
/// demotions serialize on the same snapshot.
async fn locked_manager_count(
    tx: &mut Transaction<'_, Postgres>,
    project_id: Uuid,
) -> Result<i64, AppError> {
    let roles = sqlx::query_scalar::<_, ProjectRole>(
        "SELECT role FROM memberships WHERE project_id = $1 FOR UPDATE",
    )
    .bind(project_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(roles
        .iter()
        .filter(|r| **r == ProjectRole::Manager)
        .count() as i64)
}

async fn load_membership(pool: &PgPool, id: Uuid) -> Result<Membership, AppError> {
    sqlx::query_as::<_, Membership>("SELECT * FROM memberships WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))
}

/// Change a member's role (MANAGE required). Demoting the last MANAGER is an
/// InvariantViolation.
pub async fn change_role(
    pool: &PgPool,
    caller: &Principal,
    membership_id: Uuid,
    new_role: ProjectRole,
) -> Result<Membership, AppError> {
    let membership = load_membership(pool, membership_id).await?;
    access::require(pool, caller, Capability::Manage, membership.project_id).await?;

    let mut tx = pool.begin().await?;

    if membership.role == ProjectRole::Manager && new_role != ProjectRole::Manager {
        let managers = locked_manager_count(&mut tx, membership.project_id).await?;
        if managers <= 1 {
            return Err(AppError::InvariantViolation(
                "Cannot demote the last manager of the project".to_string(),
            ));
        }
    }

    let updated = sqlx::query_as::<_, Membership>(
        "UPDATE memberships SET role = $1 WHERE id = $2 RETURNING *",
    )
    .bind(new_role)
    .bind(membership_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(updated)
}

/// Remove a member (MANAGE required). Removing the last MANAGER is an
/// InvariantViolation.
pub async fn remove_member(
    pool: &PgPool,
    caller: &Principal,
    membership_id: Uuid,
) -> Result<(), AppError> {
    let membership = load_membership(pool, membership_id).await?;
    access::require(pool, caller, Capability::Manage, membership.project_id).await?;

    let mut tx = pool.begin().await?;

    if membership.role == ProjectRole::Manager {
        let managers = locked_manager_count(&mut tx, membership.project_id).await?;
        if managers <= 1 {
            return Err(AppError::InvariantViolation(
                "Cannot remove the last manager of the project".to_string(),
            ));
        }
    }

    sqlx::query("DELETE FROM memberships WHERE id = $1")
        .bind(membership_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}
