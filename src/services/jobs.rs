//! Scan job state machine: creation, dispatch, and worker-side progress.
//!
//! Lifecycle: PENDING → QUEUED → RUNNING → COMPLETED | FAILED. Any
//! non-terminal job may fail. Status writes are guarded UPDATEs keyed on the
//! expected current status, so a duplicate worker message re-applying a
//! transition is a no-op and a backward move is rejected.
//!
//! Known gap: a job whose worker dies stays QUEUED/RUNNING forever — there
//! is no heartbeat or timeout yet. The CANCELLED and TIMEOUT states are
//! reserved for that future work.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::membership::Capability;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::scan_config::ScanConfiguration;
use crate::models::scan_job::{
    CiTriggerRequest, CreateScanJob, ScanJob, ScanJobStatus, ScanJobWithResults, ScanResult,
};
use crate::services::access::{self, Principal};
use crate::services::dispatch::TaskDispatcher;

/// Check whether a status transition follows the state machine graph.
///
/// Cancellation edges are part of the model but nothing produces them yet.
pub fn is_valid_transition(from: ScanJobStatus, to: ScanJobStatus) -> bool {
    use ScanJobStatus::*;
    matches!(
        (from, to),
        (Pending, Queued)
            | (Queued, Running)
            | (Running, Completed)
            // Any non-terminal state may fail, including before RUNNING
            | (Pending | Queued | Running, Failed)
            // Reserved for future cancellation / heartbeat-timeout support
            | (Pending | Queued | Running, Cancelled)
            | (Queued | Running, Timeout)
    )
}

/// Create a scan job in PENDING state.
///
/// Requires CONTRIBUTE on the project. The configuration must exist and
/// belong to the project (mismatch is a validation error, not an
/// authorization one). Target and tool data are snapshotted onto the job
/// row; later configuration edits never reach this job. No dispatch happens
/// here — a permission failure can never leave an orphaned job row, and the
/// caller decides when to hand the job to the execution substrate.
pub async fn create(
    pool: &PgPool,
    caller: &Principal,
    input: &CreateScanJob,
) -> Result<ScanJob, AppError> {
    insert_job(pool, caller, input.project_id, input.scan_configuration_id, None).await
}

/// CI variant of [`create`]: same state machine and checks, plus CI
/// provenance fields and the `triggered_by_ci` flag.
pub async fn create_from_ci(
    pool: &PgPool,
    caller: &Principal,
    input: &CiTriggerRequest,
) -> Result<ScanJob, AppError> {
    insert_job(
        pool,
        caller,
        input.project_id,
        input.scan_configuration_id,
        Some(input),
    )
    .await
}

async fn insert_job(
    pool: &PgPool,
    caller: &Principal,
    project_id: Uuid,
    scan_configuration_id: Uuid,
    ci: Option<&CiTriggerRequest>,
) -> Result<ScanJob, AppError> {
    access::require(pool, caller, Capability::Contribute, project_id).await?;

    let config = sqlx::query_as::<_, ScanConfiguration>(
        "SELECT * FROM scan_configurations WHERE id = $1",
    )
    .bind(scan_configuration_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Scan configuration not found".to_string()))?;

    if config.project_id != project_id {
        return Err(AppError::Validation(
            "Scan configuration does not belong to this project".to_string(),
        ));
    }

    let job = sqlx::query_as::<_, ScanJob>(
        r#"
        INSERT INTO scan_jobs
            (project_id, scan_configuration_id, initiator_id, status,
             target_info, tool_settings,
             commit_hash, branch_name, repository_url, ci_build_id, triggered_by_ci)
        VALUES ($1, $2, $3, 'PENDING', $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(project_id)
    .bind(scan_configuration_id)
    .bind(caller.id)
    .bind(&config.target_details)
    .bind(&config.tool_settings)
    .bind(ci.and_then(|c| c.commit_hash.clone()))
    .bind(ci.and_then(|c| c.branch_name.clone()))
    .bind(ci.and_then(|c| c.repository_url.clone()))
    .bind(ci.and_then(|c| c.ci_build_id.clone()))
    .bind(ci.is_some())
    .fetch_one(pool)
    .await?;

    tracing::info!(job_id = %job.id, project_id = %project_id, ci = ci.is_some(), "Scan job created");

    Ok(job)
}

/// Hand a PENDING job to the execution substrate.
///
/// On success the handle and QUEUED status land in one write. On failure the
/// job stays PENDING with no handle, and re-invoking dispatch on the same
/// job is the supported retry path. Re-dispatching an already QUEUED job is
/// a no-op.
pub async fn dispatch(
    pool: &PgPool,
    dispatcher: &dyn TaskDispatcher,
    job_id: Uuid,
) -> Result<ScanJob, AppError> {
    let job = find_by_id(pool, job_id).await?;

    match job.status {
        ScanJobStatus::Pending => {}
        ScanJobStatus::Queued => return Ok(job),
        other => {
            return Err(AppError::InvalidTransition(format!(
                "Cannot dispatch a job in status {other:?}"
            )))
        }
    }

    let handle = dispatcher
        .submit(job_id)
        .await
        .map_err(|e| AppError::Dispatch(e.to_string()))?;

    let queued = sqlx::query_as::<_, ScanJob>(
        r#"
        UPDATE scan_jobs
        SET status = 'QUEUED', task_handle = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(&handle)
    .bind(job_id)
    .fetch_optional(pool)
    .await?
    // Lost the race with another dispatcher; the stored handle wins.
    .ok_or_else(|| {
        AppError::Conflict("Job was dispatched concurrently".to_string())
    })?;

    tracing::info!(job_id = %job_id, handle = %handle, "Scan job queued");

    Ok(queued)
}

/// Worker callback: the job has started processing.
///
/// Idempotently rewrites the task handle (the dispatch path may have used a
/// different identifier than the one the worker received) and records
/// `started_at` once. A repeated message for an already RUNNING job is a
/// no-op; anything else is rejected.
pub async fn mark_running(
    pool: &PgPool,
    job_id: Uuid,
    task_handle: &str,
) -> Result<ScanJob, AppError> {
    let updated = sqlx::query_as::<_, ScanJob>(
        r#"
        UPDATE scan_jobs
        SET status = 'RUNNING',
            task_handle = $1,
            started_at = COALESCE(started_at, NOW()),
            updated_at = NOW()
        WHERE id = $2 AND status IN ('QUEUED', 'RUNNING')
        RETURNING *
        "#,
    )
    .bind(task_handle)
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(job) => Ok(job),
        None => {
            let job = find_by_id(pool, job_id).await?;
            Err(AppError::InvalidTransition(format!(
                "Cannot mark a {:?} job as RUNNING",
                job.status
            )))
        }
    }
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<ScanJob, AppError> {
    sqlx::query_as::<_, ScanJob>("SELECT * FROM scan_jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Scan job not found".to_string()))
}

/// Look up a job by its external task handle.
pub async fn find_by_task_handle(pool: &PgPool, handle: &str) -> Result<ScanJob, AppError> {
    sqlx::query_as::<_, ScanJob>("SELECT * FROM scan_jobs WHERE task_handle = $1")
        .bind(handle)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Scan job not found".to_string()))
}

/// Fetch a job with its results, visibility-filtered. An invisible job is
/// indistinguishable from an absent one.
pub async fn get(
    pool: &PgPool,
    caller: &Principal,
    id: Uuid,
) -> Result<ScanJobWithResults, AppError> {
    let job = find_by_id(pool, id).await?;

    access::require_visible(pool, caller, job.project_id)
        .await
        .map_err(|_| AppError::NotFound("Scan job not found".to_string()))?;

    let results = sqlx::query_as::<_, ScanResult>(
        "SELECT * FROM scan_results WHERE scan_job_id = $1 ORDER BY recorded_at",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(ScanJobWithResults { job, results })
}

/// List jobs across the caller's visible projects, newest first. An
/// optional project filter narrows the scope.
pub async fn list(
    pool: &PgPool,
    caller: &Principal,
    project_id: Option<Uuid>,
    pagination: &Pagination,
) -> Result<PagedResult<ScanJob>, AppError> {
    let project_ids = match project_id {
        Some(id) => {
            access::require_visible(pool, caller, id).await?;
            vec![id]
        }
        None => access::visible_project_ids(pool, caller).await?,
    };

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM scan_jobs WHERE project_id = ANY($1)",
    )
    .bind(&project_ids)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, ScanJob>(
        r#"
        SELECT * FROM scan_jobs
        WHERE project_id = ANY($1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(&project_ids)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    Ok(PagedResult::new(items, total, pagination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ScanJobStatus::*;

    // -- Valid transitions --

    #[test]
    fn pending_to_queued() {
        assert!(is_valid_transition(Pending, Queued));
    }

    #[test]
    fn queued_to_running() {
        assert!(is_valid_transition(Queued, Running));
    }

    #[test]
    fn running_to_completed() {
        assert!(is_valid_transition(Running, Completed));
    }

    #[test]
    fn any_non_terminal_to_failed() {
        assert!(is_valid_transition(Pending, Failed));
        assert!(is_valid_transition(Queued, Failed));
        assert!(is_valid_transition(Running, Failed));
    }

    #[test]
    fn reserved_cancellation_edges() {
        assert!(is_valid_transition(Pending, Cancelled));
        assert!(is_valid_transition(Queued, Cancelled));
        assert!(is_valid_transition(Running, Cancelled));
        assert!(is_valid_transition(Running, Timeout));
    }

    // -- Invalid transitions --

    #[test]
    fn no_backward_moves() {
        assert!(!is_valid_transition(Queued, Pending));
        assert!(!is_valid_transition(Running, Queued));
        assert!(!is_valid_transition(Running, Pending));
        assert!(!is_valid_transition(Completed, Running));
        assert!(!is_valid_transition(Failed, Running));
    }

    #[test]
    fn no_skipping_states() {
        assert!(!is_valid_transition(Pending, Running));
        assert!(!is_valid_transition(Pending, Completed));
        assert!(!is_valid_transition(Queued, Completed));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for from in [Completed, Failed, Cancelled, Timeout] {
            for to in [Pending, Queued, Running, Completed, Failed, Cancelled, Timeout] {
                assert!(
                    !is_valid_transition(from, to),
                    "{from:?} -> {to:?} should be invalid"
                );
            }
        }
    }

    #[test]
    fn self_transitions_not_in_graph() {
        // Idempotent re-delivery is handled by the guarded UPDATEs, not by
        // the graph itself.
        for status in [Pending, Queued, Running, Completed, Failed] {
            assert!(!is_valid_transition(status, status));
        }
    }
}
