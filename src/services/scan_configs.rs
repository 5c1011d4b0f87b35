//! Scan configuration service. Mutations require MANAGE on the owning
//! project; reads require VIEW. Jobs snapshot configuration data at
//! creation, so edits here never touch in-flight jobs.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::membership::Capability;
use crate::models::scan_config::{
    CreateScanConfiguration, ScanConfiguration, UpdateScanConfiguration,
};
use crate::services::access::{self, Principal};

pub async fn create(
    pool: &PgPool,
    caller: &Principal,
    input: &CreateScanConfiguration,
) -> Result<ScanConfiguration, AppError> {
    access::require(pool, caller, Capability::Manage, input.project_id).await?;

    sqlx::query_as::<_, ScanConfiguration>(
        r#"
        INSERT INTO scan_configurations
            (project_id, name, description, has_predefined_targets, target_details, tool_settings, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(input.project_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.has_predefined_targets)
    .bind(&input.target_details)
    .bind(&input.tool_settings)
    .bind(caller.id)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Configuration name already exists in this project".to_string())
        }
        _ => AppError::Database(e),
    })
}

pub async fn get(
    pool: &PgPool,
    caller: &Principal,
    id: Uuid,
) -> Result<ScanConfiguration, AppError> {
    let config = sqlx::query_as::<_, ScanConfiguration>(
        "SELECT * FROM scan_configurations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Scan configuration not found".to_string()))?;

    // Invisible resources collapse to NotFound, same as absent ones
    access::require_visible(pool, caller, config.project_id)
        .await
        .map_err(|_| AppError::NotFound("Scan configuration not found".to_string()))?;

    Ok(config)
}

pub async fn list_for_project(
    pool: &PgPool,
    caller: &Principal,
    project_id: Uuid,
) -> Result<Vec<ScanConfiguration>, AppError> {
    access::require_visible(pool, caller, project_id).await?;

    let configs = sqlx::query_as::<_, ScanConfiguration>(
        "SELECT * FROM scan_configurations WHERE project_id = $1 ORDER BY name",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(configs)
}

pub async fn update(
    pool: &PgPool,
    caller: &Principal,
    id: Uuid,
    input: &UpdateScanConfiguration,
) -> Result<ScanConfiguration, AppError> {
    let existing = get(pool, caller, id).await?;
    access::require(pool, caller, Capability::Manage, existing.project_id).await?;

    sqlx::query_as::<_, ScanConfiguration>(
        r#"
        UPDATE scan_configurations
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            has_predefined_targets = COALESCE($3, has_predefined_targets),
            target_details = COALESCE($4, target_details),
            tool_settings = COALESCE($5, tool_settings),
            updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.has_predefined_targets)
    .bind(&input.target_details)
    .bind(&input.tool_settings)
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Configuration name already exists in this project".to_string())
        }
        _ => AppError::Database(e),
    })
}

/// Delete a configuration. Jobs that used it survive with
/// `scan_configuration_id` set to NULL (FK SET NULL).
pub async fn delete(pool: &PgPool, caller: &Principal, id: Uuid) -> Result<(), AppError> {
    let existing = get(pool, caller, id).await?;
    access::require(pool, caller, Capability::Manage, existing.project_id).await?;

    sqlx::query("DELETE FROM scan_configurations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
