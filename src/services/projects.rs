//! Project service. Creating a project also materializes a MANAGER
//! membership for the owner in the same transaction.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::services::access::{self, Principal};

/// Create a project owned by the caller, with an owner MANAGER membership.
pub async fn create(
    pool: &PgPool,
    owner: &Principal,
    input: &CreateProject,
) -> Result<Project, AppError> {
    let mut tx = pool.begin().await?;

    let project = sqlx::query_as::<_, Project>(
        r#"
        INSERT INTO projects (name, description, owner_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(owner.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Project name already exists".to_string())
        }
        _ => AppError::Database(e),
    })?;

    sqlx::query(
        "INSERT INTO memberships (project_id, user_id, role) VALUES ($1, $2, 'manager')",
    )
    .bind(project.id)
    .bind(owner.id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(project)
}

/// Fetch a project the caller can view. Invisible projects surface as NotFound.
pub async fn get(pool: &PgPool, caller: &Principal, id: Uuid) -> Result<Project, AppError> {
    access::require_visible(pool, caller, id).await?;

    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
}

/// List projects visible to the caller, newest first.
pub async fn list(
    pool: &PgPool,
    caller: &Principal,
    pagination: &Pagination,
) -> Result<PagedResult<Project>, AppError> {
    let ids = access::visible_project_ids(pool, caller).await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM projects WHERE id = ANY($1)",
    )
    .bind(&ids)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, Project>(
        "SELECT * FROM projects WHERE id = ANY($1) ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&ids)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

/// Update project metadata (MANAGE required).
pub async fn update(
    pool: &PgPool,
    caller: &Principal,
    id: Uuid,
    input: &UpdateProject,
) -> Result<Project, AppError> {
    access::require(pool, caller, crate::models::membership::Capability::Manage, id).await?;

    sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Project name already exists".to_string())
        }
        _ => AppError::Database(e),
    })?
    .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
}

/// Delete a project. Only the owner or a superuser may delete; memberships,
/// configurations, and jobs go with it (FK cascade).
pub async fn delete(pool: &PgPool, caller: &Principal, id: Uuid) -> Result<(), AppError> {
    let owner_id = sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    if caller.id != owner_id && !caller.is_superuser {
        return Err(AppError::Forbidden(
            "Only the project owner may delete a project".to_string(),
        ));
    }

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
