//! Scan job and scan result models.
//!
//! A job snapshots its configuration's target/tool data at creation and is
//! only mutated afterwards by the dispatcher and the result recorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle status of a scan job.
///
/// `Cancelled` and `Timeout` are reserved terminal states: they exist in the
/// schema for future cancellation/heartbeat support but no code path
/// currently produces them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "scan_job_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanJobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl ScanJobStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanJobStatus::Completed
                | ScanJobStatus::Failed
                | ScanJobStatus::Cancelled
                | ScanJobStatus::Timeout
        )
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScanJob {
    pub id: Uuid,
    pub project_id: Uuid,
    /// SET NULL on configuration deletion — the job outlives its configuration.
    pub scan_configuration_id: Option<Uuid>,
    pub initiator_id: Option<Uuid>,
    pub task_handle: Option<String>,
    pub status: ScanJobStatus,
    /// Snapshot of the configuration's target details at creation time.
    pub target_info: Option<serde_json::Value>,
    /// Snapshot of the configuration's tool settings at creation time.
    pub tool_settings: Option<serde_json::Value>,
    pub commit_hash: Option<String>,
    pub branch_name: Option<String>,
    pub repository_url: Option<String>,
    pub ci_build_id: Option<String>,
    pub triggered_by_ci: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Append-only result record attached to a job. A failed job always carries
/// at least one result with a non-empty `error_message`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScanResult {
    pub id: Uuid,
    pub scan_job_id: Uuid,
    pub tool_name: String,
    pub summary: Option<serde_json::Value>,
    pub findings: serde_json::Value,
    pub error_message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateScanJob {
    pub project_id: Uuid,
    pub scan_configuration_id: Uuid,
}

/// CI-triggered job request, authenticated via API key.
#[derive(Debug, Clone, Deserialize)]
pub struct CiTriggerRequest {
    pub project_id: Uuid,
    pub scan_configuration_id: Uuid,
    pub commit_hash: Option<String>,
    pub branch_name: Option<String>,
    pub repository_url: Option<String>,
    pub ci_build_id: Option<String>,
}

/// Job detail response: the job row plus its results.
#[derive(Debug, Serialize)]
pub struct ScanJobWithResults {
    #[serde(flatten)]
    pub job: ScanJob,
    pub results: Vec<ScanResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(ScanJobStatus::Completed.is_terminal());
        assert!(ScanJobStatus::Failed.is_terminal());
        assert!(ScanJobStatus::Cancelled.is_terminal());
        assert!(ScanJobStatus::Timeout.is_terminal());
        assert!(!ScanJobStatus::Pending.is_terminal());
        assert!(!ScanJobStatus::Queued.is_terminal());
        assert!(!ScanJobStatus::Running.is_terminal());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ScanJobStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        let parsed: ScanJobStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(parsed, ScanJobStatus::Completed);
    }
}
