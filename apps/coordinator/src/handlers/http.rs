//! Client-facing submission surface: submit a job, fetch it back, list
//! a user's jobs, check a balance, list the worker pool.

use crate::errors::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use gridx_domain_credits::max_reserve;
use gridx_domain_models::user::is_valid_user_id;
use gridx_domain_models::{Job, JobStatus, Worker};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const MIN_TIMEOUT_SECONDS: u32 = 1;
const MAX_TIMEOUT_SECONDS: u32 = 3600;

#[derive(Debug, Deserialize)]
pub struct SubmitJobLimits {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

fn default_timeout() -> u32 {
    60
}

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub user_id: String,
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub limits: Option<SubmitJobLimits>,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub reserved: f64,
}

/// `POST /api/v1/jobs`. Validates the request, reserves the maximum
/// possible credit cost, persists the job as `queued`, enqueues it, and
/// asks the dispatcher to run.
#[instrument(skip(state, request), fields(user_id = %request.user_id, language = %request.language))]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> Result<Json<SubmitJobResponse>, AppError> {
    if !is_valid_user_id(&request.user_id) {
        return Err(AppError::Validation("invalid user_id".into()));
    }
    if request.code.is_empty() {
        return Err(AppError::Validation("code must not be empty".into()));
    }
    if request.code.len() > state.settings.max_code_bytes {
        return Err(AppError::Validation("code exceeds the maximum submission size".into()));
    }
    if !state.settings.supported_languages.iter().any(|l| l == &request.language) {
        return Err(AppError::Validation(format!("unsupported language: {}", request.language)));
    }

    let timeout_seconds = request.limits.map(|l| l.timeout_seconds).unwrap_or_else(default_timeout);
    if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&timeout_seconds) {
        return Err(AppError::Validation(format!(
            "timeout_seconds must be between {MIN_TIMEOUT_SECONDS} and {MAX_TIMEOUT_SECONDS}"
        )));
    }

    state.credits.ensure_user(&request.user_id, state.settings.initial_credits).await?;

    let reserved = max_reserve(timeout_seconds, &state.settings.settlement);
    let reserved_ok = state.credits.deduct(&request.user_id, reserved).await?;
    if !reserved_ok {
        let available = state.credits.balance(&request.user_id).await?;
        warn!(user_id = %request.user_id, reserved, available, "submission rejected: insufficient credit");
        return Err(AppError::InsufficientCredit { required: reserved, available });
    }

    let job = Job {
        job_id: Uuid::new_v4().to_string(),
        user_id: request.user_id.clone(),
        source: request.code,
        language: request.language,
        status: JobStatus::Queued,
        assigned_worker_id: None,
        timeout_seconds,
        reserved,
        created_at: Utc::now(),
        assigned_at: None,
        completed_at: None,
        stdout: None,
        stderr: None,
        exit_code: None,
    };

    if let Err(e) = state.jobs.create(&job).await {
        // The reserve already succeeded; a failed job row must not leave
        // credit debited with nothing to show for it.
        state.credits.credit(&request.user_id, reserved).await.ok();
        return Err(e.into());
    }

    if state.enqueue_job(&job.job_id).await.is_err() {
        state.credits.credit(&request.user_id, reserved).await.ok();
        state.jobs.fail(&job.job_id, "queue at capacity").await.ok();
        return Err(AppError::Internal(anyhow::anyhow!("queue at capacity")));
    }

    info!(job_id = %job.job_id, reserved, "job queued");
    state.request_dispatch();

    Ok(Json(SubmitJobResponse {
        job_id: job.job_id,
        status: JobStatus::Queued,
        reserved,
    }))
}

#[instrument(skip(state))]
pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> Result<Json<Job>, AppError> {
    let job = state.jobs.find(&job_id).await?.ok_or(AppError::NotFound("job"))?;
    Ok(Json(job))
}

#[instrument(skip(state))]
pub async fn list_jobs_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Job>>, AppError> {
    if !is_valid_user_id(&user_id) {
        return Err(AppError::Validation("invalid user_id".into()));
    }
    Ok(Json(state.jobs.list_by_user(&user_id).await?))
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: f64,
}

#[instrument(skip(state))]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, AppError> {
    if !is_valid_user_id(&user_id) {
        return Err(AppError::Validation("invalid user_id".into()));
    }
    let balance = state.credits.balance(&user_id).await?;
    Ok(Json(BalanceResponse { user_id, balance }))
}

#[instrument(skip(state))]
pub async fn list_workers(State(state): State<AppState>) -> Result<Json<Vec<Worker>>, AppError> {
    Ok(Json(state.workers.list_all().await?))
}
