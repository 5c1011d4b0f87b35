//! Task dispatcher: the boundary to the asynchronous execution substrate.
//!
//! [`TaskDispatcher::submit`] hands a job id to the substrate and returns
//! the opaque task handle used to correlate worker callbacks. The shipped
//! implementation runs simulated scan workers on the tokio runtime; the
//! real scanners are external collaborators and are not modeled here.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::scan_job::ScanJobStatus;
use crate::services::{jobs, results};

/// How long a freshly spawned worker waits for the dispatcher's QUEUED
/// write to become visible before abandoning the message.
const QUEUED_POLL_ATTEMPTS: u32 = 200;
const QUEUED_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Submission failure. The job stays PENDING; the caller may retry.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Task submission failed: {0}")]
    SubmissionFailed(String),
}

/// Boundary to the task queue + worker pool. The dispatcher is the only
/// component that moves a job out of PENDING.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Submit a job for execution, returning a globally unique task handle.
    async fn submit(&self, job_id: Uuid) -> Result<String, DispatchError>;
}

/// Dispatcher settings, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Simulated per-job scan time.
    pub scan_duration: Duration,
}

/// In-process execution substrate: each submission spawns a tokio task that
/// plays the worker role and reports back through the result recorder.
#[derive(Clone)]
pub struct TokioDispatcher {
    pool: PgPool,
    config: DispatcherConfig,
}

impl TokioDispatcher {
    pub fn new(pool: PgPool, config: DispatcherConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl TaskDispatcher for TokioDispatcher {
    async fn submit(&self, job_id: Uuid) -> Result<String, DispatchError> {
        let handle = format!("task-{}", Uuid::new_v4());
        let pool = self.pool.clone();
        let worker_handle = handle.clone();
        let scan_duration = self.config.scan_duration;

        tokio::spawn(async move {
            run_worker(pool, job_id, worker_handle, scan_duration).await;
        });

        tracing::debug!(job_id = %job_id, handle = %handle, "Submitted job to worker pool");

        Ok(handle)
    }
}

/// Worker entry point. Unrecoverable errors are recorded as a FAILED result
/// rather than propagated — worker-side failure is a modeled outcome, not
/// an exception. A transition rejection is the one exception: it means this
/// message raced a newer write for the same job and must stay a no-op.
async fn run_worker(pool: PgPool, job_id: Uuid, task_handle: String, scan_duration: Duration) {
    if let Err(e) = execute_scan(&pool, job_id, &task_handle, scan_duration).await {
        if is_stale_message(&e) {
            tracing::debug!(job_id = %job_id, error = %e, "Ignoring stale worker message");
            return;
        }
        tracing::error!(job_id = %job_id, error = %e, "Worker error during scan execution");
        if let Err(record_err) =
            results::record_error(&pool, job_id, "worker", &e.to_string()).await
        {
            tracing::error!(job_id = %job_id, error = %record_err, "Failed to record worker error");
        }
    }
}

/// A rejected transition from `mark_running` or the result recorder means a
/// duplicate or out-of-date message, not a scan failure.
fn is_stale_message(e: &AppError) -> bool {
    matches!(e, AppError::InvalidTransition(_))
}

/// The worker task is spawned before the dispatcher's QUEUED write commits.
/// Wait until that write is visible; if the job is already past QUEUED or
/// never leaves PENDING (the dispatch write failed), this message has
/// nothing to do.
async fn await_queued(pool: &PgPool, job_id: Uuid) -> Result<bool, AppError> {
    for _ in 0..QUEUED_POLL_ATTEMPTS {
        let job = jobs::find_by_id(pool, job_id).await?;
        match job.status {
            ScanJobStatus::Queued | ScanJobStatus::Running => return Ok(true),
            ScanJobStatus::Pending => tokio::time::sleep(QUEUED_POLL_INTERVAL).await,
            _ => return Ok(false),
        }
    }
    Ok(false)
}

/// Simulated scan: mark RUNNING, wait, then record findings derived from
/// the job's snapshotted configuration data. A `"simulate": "failure"` key
/// in the tool settings makes the scan fail, for exercising the error path.
async fn execute_scan(
    pool: &PgPool,
    job_id: Uuid,
    task_handle: &str,
    scan_duration: Duration,
) -> Result<(), AppError> {
    if !await_queued(pool, job_id).await? {
        tracing::debug!(job_id = %job_id, "QUEUED write never became visible, leaving the job alone");
        return Ok(());
    }

    // The dispatch path and the worker may hold different identifiers for
    // the same task; the worker's write wins, idempotently.
    let job = jobs::mark_running(pool, job_id, task_handle).await?;

    tokio::time::sleep(scan_duration).await;

    let tool_name = job
        .tool_settings
        .as_ref()
        .and_then(|s| s.get("tool"))
        .and_then(|t| t.as_str())
        .unwrap_or("generic-scanner")
        .to_string();

    let simulate_failure = job
        .tool_settings
        .as_ref()
        .and_then(|s| s.get("simulate"))
        .and_then(|v| v.as_str())
        == Some("failure");

    if simulate_failure {
        results::record_error(pool, job_id, &tool_name, "Simulated scanner failure").await?;
        return Ok(());
    }

    let target_description = job
        .target_info
        .as_ref()
        .and_then(|t| t.get("description"))
        .and_then(|d| d.as_str())
        .unwrap_or("N/A")
        .to_string();

    let findings = serde_json::json!([
        {
            "severity": "HIGH",
            "description": format!("Simulated high severity issue for {target_description}"),
            "details": "Detail A"
        },
        {
            "severity": "MEDIUM",
            "description": format!("Simulated medium severity issue for {target_description}"),
            "details": "Detail B"
        }
    ]);
    let summary = serde_json::json!({ "HIGH": 1, "MEDIUM": 1, "LOW": 0 });

    results::record(pool, job_id, &tool_name, summary, findings).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_display() {
        let err = DispatchError::SubmissionFailed("broker unreachable".to_string());
        assert_eq!(
            err.to_string(),
            "Task submission failed: broker unreachable"
        );
    }

    #[test]
    fn rejected_transition_is_stale_not_a_failure() {
        assert!(is_stale_message(&AppError::InvalidTransition(
            "Cannot mark a Pending job as RUNNING".to_string()
        )));
        assert!(!is_stale_message(&AppError::Internal("boom".to_string())));
        assert!(!is_stale_message(&AppError::NotFound("gone".to_string())));
    }
}
