//! Result recorder: append-only scan results tied to terminal status writes.
//!
//! `record` inserts a result and moves the job to COMPLETED in one
//! transaction; `record_error` does the same for FAILED. A reader can never
//! observe a terminal job without its explanatory result, and results are
//! never edited after insertion.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::scan_job::{ScanJobStatus, ScanResult};

/// Lock the job row and return its current status.
async fn lock_job_status(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
) -> Result<ScanJobStatus, AppError> {
    sqlx::query_scalar::<_, ScanJobStatus>(
        "SELECT status FROM scan_jobs WHERE id = $1 FOR UPDATE",
    )
    .bind(job_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Scan job not found".to_string()))
}

async fn latest_result(pool: &PgPool, job_id: Uuid) -> Result<ScanResult, AppError> {
    sqlx::query_as::<_, ScanResult>(
        "SELECT * FROM scan_results WHERE scan_job_id = $1 ORDER BY recorded_at DESC LIMIT 1",
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Scan result not found".to_string()))
}

async fn insert_result(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
    tool_name: &str,
    summary: Option<&serde_json::Value>,
    findings: &serde_json::Value,
    error_message: Option<&str>,
) -> Result<ScanResult, AppError> {
    let result = sqlx::query_as::<_, ScanResult>(
        r#"
        INSERT INTO scan_results (scan_job_id, tool_name, summary, findings, error_message)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(job_id)
    .bind(tool_name)
    .bind(summary)
    .bind(findings)
    .bind(error_message)
    .fetch_one(&mut **tx)
    .await?;

    Ok(result)
}

/// Record a successful scan result and complete the job.
///
/// Only legal for a RUNNING job. A duplicate message for an already
/// COMPLETED job is a no-op returning the existing result; anything else is
/// an invalid transition.
pub async fn record(
    pool: &PgPool,
    job_id: Uuid,
    tool_name: &str,
    summary: serde_json::Value,
    findings: serde_json::Value,
) -> Result<ScanResult, AppError> {
    let mut tx = pool.begin().await?;

    match lock_job_status(&mut tx, job_id).await? {
        ScanJobStatus::Running => {}
        ScanJobStatus::Completed => {
            tx.rollback().await?;
            return latest_result(pool, job_id).await;
        }
        other => {
            return Err(AppError::InvalidTransition(format!(
                "Cannot complete a job in status {other:?}"
            )))
        }
    }

    let result = insert_result(&mut tx, job_id, tool_name, Some(&summary), &findings, None).await?;

    sqlx::query(
        "UPDATE scan_jobs SET status = 'COMPLETED', completed_at = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(job_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(job_id = %job_id, tool = tool_name, "Scan job completed");

    Ok(result)
}

/// Record a worker-side failure and fail the job.
///
/// Legal from any non-terminal state, including before the job ever reached
/// RUNNING. The error result lands in the same transaction as the FAILED
/// status, so a failed job always carries an explanation. Duplicate
/// messages for an already FAILED job are a no-op.
pub async fn record_error(
    pool: &PgPool,
    job_id: Uuid,
    tool_name: &str,
    error_message: &str,
) -> Result<ScanResult, AppError> {
    if error_message.trim().is_empty() {
        return Err(AppError::Validation(
            "Error message must not be empty".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    match lock_job_status(&mut tx, job_id).await? {
        status if !status.is_terminal() => {}
        ScanJobStatus::Failed => {
            tx.rollback().await?;
            return latest_result(pool, job_id).await;
        }
        other => {
            return Err(AppError::InvalidTransition(format!(
                "Cannot fail a job in status {other:?}"
            )))
        }
    }

    let result = insert_result(
        &mut tx,
        job_id,
        tool_name,
        None,
        &serde_json::json!([]),
        Some(error_message),
    )
    .await?;

    sqlx::query(
        "UPDATE scan_jobs SET status = 'FAILED', completed_at = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(job_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::warn!(job_id = %job_id, tool = tool_name, error = error_message, "Scan job failed");

    Ok(result)
}
