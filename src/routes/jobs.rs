//! Scan job routes: creation (interactive and CI), dispatch retry, and
//! visibility-filtered reads.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::models::pagination::{PagedResult, Pagination};
use crate::models::scan_job::{
    CiTriggerRequest, CreateScanJob, ScanJob, ScanJobWithResults,
};
use crate::services::jobs as job_service;
use crate::AppState;

/// Creation response. On dispatch failure the job is returned in PENDING
/// state with the error alongside; the caller may retry via the dispatch
/// endpoint.
#[derive(Debug, Serialize)]
pub struct JobCreatedResponse {
    #[serde(flatten)]
    pub job: ScanJob,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_error: Option<String>,
}

async fn dispatch_created(state: &AppState, job: ScanJob) -> Result<JobCreatedResponse, AppError> {
    match job_service::dispatch(&state.db, state.dispatcher.as_ref(), job.id).await {
        Ok(queued) => Ok(JobCreatedResponse {
            job: queued,
            dispatch_error: None,
        }),
        // The job row is intact and PENDING; surface the error, not a 5xx
        Err(AppError::Dispatch(msg)) => Ok(JobCreatedResponse {
            job,
            dispatch_error: Some(msg),
        }),
        Err(e) => Err(e),
    }
}

/// POST /api/v1/scan-jobs — create and dispatch a job (developer+).
pub async fn create(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateScanJob>,
) -> Result<Json<ApiResponse<JobCreatedResponse>>, AppError> {
    let job = job_service::create(&state.db, &current_user.principal(), &body).await?;
    let response = dispatch_created(&state, job).await?;
    Ok(ApiResponse::success(response))
}

/// POST /api/v1/ci/scan-jobs — CI trigger, API-key authenticated. Stores
/// commit/branch/repository provenance on the job.
pub async fn create_from_ci(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CiTriggerRequest>,
) -> Result<Json<ApiResponse<JobCreatedResponse>>, AppError> {
    if !current_user.via_api_key {
        return Err(AppError::Forbidden(
            "CI scan triggers require API key authentication".to_string(),
        ));
    }

    let job = job_service::create_from_ci(&state.db, &current_user.principal(), &body).await?;
    let response = dispatch_created(&state, job).await?;
    Ok(ApiResponse::success(response))
}

/// POST /api/v1/scan-jobs/:id/dispatch — retry dispatch for a PENDING job.
pub async fn dispatch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScanJob>>, AppError> {
    // Same gate as creation: dispatching is contributing
    let job = job_service::get(&state.db, &current_user.principal(), id).await?.job;
    crate::services::access::require(
        &state.db,
        &current_user.principal(),
        crate::models::membership::Capability::Contribute,
        job.project_id,
    )
    .await?;

    let queued = job_service::dispatch(&state.db, state.dispatcher.as_ref(), id).await?;
    Ok(ApiResponse::success(queued))
}

/// GET /api/v1/scan-jobs/:id — job with its results.
pub async fn get_by_id(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScanJobWithResults>>, AppError> {
    let job = job_service::get(&state.db, &current_user.principal(), id).await?;
    Ok(ApiResponse::success(job))
}

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub project_id: Option<Uuid>,
}

/// GET /api/v1/scan-jobs — list jobs across visible projects.
pub async fn list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<ApiResponse<PagedResult<ScanJob>>>, AppError> {
    let result = job_service::list(
        &state.db,
        &current_user.principal(),
        query.project_id,
        &pagination,
    )
    .await?;
    Ok(ApiResponse::success(result))
}
