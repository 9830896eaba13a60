//! Job handlers: start a construction, read status, list, cancel.
//!
//! The start endpoint returns the job id immediately, before any step runs;
//! observers follow progress through the status read path or the WebSocket
//! feed. There is no synchronous error response once the background task has
//! started: failures are observed as `status = failed` on the record.

use std::collections::HashMap;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use toolsmith_core::pipeline::record::new_job;
use toolsmith_core::repository::JobRepository;
use toolsmith_types::agent::{AgentType, PipelineStep};
use toolsmith_types::job::{ConstructionJob, ToolRequest};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Fallback user when the caller does not identify itself.
const ANONYMOUS_USER: &str = "anonymous";

// ---------------------------------------------------------------------------
// Request/response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/tools/construct`.
#[derive(Debug, Deserialize)]
pub struct ConstructToolRequest {
    pub description: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub brainstorm: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Job-wide model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Per-agent model overrides.
    #[serde(default)]
    pub model_overrides: HashMap<AgentType, String>,
    /// Optional caller-supplied job id (idempotent restarts).
    #[serde(default)]
    pub job_id: Option<Uuid>,
}

/// Body of the start response, returned before any step runs.
#[derive(Debug, Serialize)]
pub struct ConstructToolResponse {
    pub success: bool,
    pub job_id: Uuid,
    pub message: String,
}

/// Query parameters for listing jobs.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_job_limit")]
    pub limit: u32,
}

fn default_job_limit() -> u32 {
    20
}

/// Query parameters for the status read path.
#[derive(Debug, Deserialize)]
pub struct GetJobQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/tools/construct - Start a construction job.
pub async fn construct_tool(
    State(state): State<AppState>,
    Json(body): Json<ConstructToolRequest>,
) -> Result<ApiResponse<ConstructToolResponse>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.description.trim().is_empty() {
        return Err(AppError::Validation(
            "description must not be empty".to_string(),
        ));
    }

    let user_id = body.user_id.unwrap_or_else(|| ANONYMOUS_USER.to_string());
    let default_model = body
        .model
        .unwrap_or_else(|| state.config.default_model.clone());

    let job = new_job(
        user_id,
        ToolRequest {
            description: body.description,
            target_audience: body.target_audience,
            industry: body.industry,
            features: body.features,
            brainstorm: body.brainstorm,
        },
        default_model,
        body.model_overrides,
        body.job_id,
    );

    let job_id = state
        .manager
        .start(job)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        ConstructToolResponse {
            success: true,
            job_id,
            message: "tool construction started".to_string(),
        },
        request_id,
        elapsed,
    )
    .with_link("self", &format!("/api/v1/jobs/{job_id}"))
    .with_link("events", &format!("/api/v1/jobs/{job_id}/events"));

    Ok(resp)
}

/// GET /api/v1/jobs/:id - Read the current job record.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<GetJobQuery>,
) -> Result<ApiResponse<ConstructionJob>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_id = query.user_id.unwrap_or_else(|| ANONYMOUS_USER.to_string());
    let job = state
        .repo
        .get(id, &user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(job, request_id, elapsed)
        .with_link("self", &format!("/api/v1/jobs/{id}"))
        .with_link("events", &format!("/api/v1/jobs/{id}/events"));

    Ok(resp)
}

/// GET /api/v1/jobs - List recent jobs for a user.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<ApiResponse<Vec<ConstructionJob>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let user_id = query.user_id.unwrap_or_else(|| ANONYMOUS_USER.to_string());
    let jobs = state.repo.list_for_user(&user_id, query.limit).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(jobs, request_id, elapsed).with_link("self", "/api/v1/jobs");

    Ok(resp)
}

/// POST /api/v1/jobs/:id/cancel - Request cooperative cancellation.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if !state.manager.cancel(id) {
        return Err(AppError::NotFound(
            "Job is not running (unknown or already finished)".to_string(),
        ));
    }

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({"job_id": id.to_string(), "cancelling": true}),
        request_id,
        elapsed,
    )
    .with_link("self", &format!("/api/v1/jobs/{id}"));

    Ok(resp)
}

/// GET /api/v1/steps - The static step lookup table (observability only).
pub async fn list_steps() -> ApiResponse<Vec<serde_json::Value>> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let steps: Vec<serde_json::Value> = PipelineStep::SEQUENCE
        .iter()
        .map(|step| {
            serde_json::json!({
                "step": step.as_str(),
                "agent": step.agent().as_str(),
                "display_name": step.display_name(),
            })
        })
        .collect();

    let elapsed = start.elapsed().as_millis() as u64;
    ApiResponse::success(steps, request_id, elapsed).with_link("self", "/api/v1/steps")
}
