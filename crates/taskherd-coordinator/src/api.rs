use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use taskherd_core::{DispatchError, WorkerId};

use crate::coordinator::Coordinator;

/// Submission front-end: translates HTTP requests into calls on the
/// coordinator core and renders the results.
pub fn create_api(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/api/v1/commands", post(submit_command))
        .route("/api/v1/jobs", post(submit_job))
        .route("/api/v1/jobs/:job_id", get(get_job))
        .route("/api/v1/workers", get(list_workers))
        .route("/health", get(health_check))
        .with_state(coordinator)
}

#[derive(Debug, Deserialize)]
struct SubmitCommandRequest {
    command: String,
}

#[derive(Debug, Serialize)]
struct SubmitCommandResponse {
    assigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    worker_id: Option<WorkerId>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SubmitJobRequest {
    job_name: String,
    command: String,
    num_tasks: u32,
}

#[derive(Debug, Serialize)]
struct SubmitJobResponse {
    job_id: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct JobResponse {
    job_id: String,
    total_tasks: u32,
    completed_tasks: u32,
    status: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    connected_workers: usize,
    ongoing_jobs: usize,
}

async fn submit_command(
    State(coordinator): State<Arc<Coordinator>>,
    Json(req): Json<SubmitCommandRequest>,
) -> Json<SubmitCommandResponse> {
    match coordinator.submit_command(&req.command) {
        Ok(assignment) => Json(SubmitCommandResponse {
            assigned: true,
            message: format!(
                "Command '{}' has been submitted to worker {}.",
                assignment.task_name, assignment.worker_id
            ),
            task_name: Some(assignment.task_name),
            worker_id: Some(assignment.worker_id),
        }),
        Err(DispatchError::NoEligibleWorker) => Json(SubmitCommandResponse {
            assigned: false,
            task_name: None,
            worker_id: None,
            message: "No available clients to assign the task to. Please try again later."
                .to_string(),
        }),
        Err(e) => Json(SubmitCommandResponse {
            assigned: false,
            task_name: None,
            worker_id: None,
            message: e.to_string(),
        }),
    }
}

async fn submit_job(
    State(coordinator): State<Arc<Coordinator>>,
    Json(req): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    let job_id = coordinator
        .submit_job(&req.job_name, &req.command, req.num_tasks)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitJobResponse {
            message: format!(
                "Distributed job '{}' with {} tasks has been started.",
                job_id, req.num_tasks
            ),
            job_id,
        }),
    ))
}

async fn get_job(
    State(coordinator): State<Arc<Coordinator>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = coordinator.job(&job_id).ok_or(ApiError::NotFound)?;

    Ok(Json(JobResponse {
        job_id: job.id,
        total_tasks: job.total_tasks,
        completed_tasks: job.completed_tasks,
        status: job.status.as_str().to_string(),
    }))
}

async fn list_workers(
    State(coordinator): State<Arc<Coordinator>>,
) -> Json<Vec<crate::registry::WorkerView>> {
    Json(coordinator.workers())
}

async fn health_check(State(coordinator): State<Arc<Coordinator>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        connected_workers: coordinator.connected_workers(),
        ongoing_jobs: coordinator.ongoing_jobs(),
    })
}

/// API error types
#[derive(Debug)]
enum ApiError {
    NotFound,
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
