//! Administrative surface: a fleet overview and worker moderation
//! (disconnect, suspend, ban) used by operators, not by workers or
//! clients. None of this is authenticated at the coordinator layer; a
//! deployment is expected to put it behind a reverse proxy or gateway
//! that handles operator auth.

use crate::errors::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use gridx_domain_models::{Job, Restriction, User, Worker};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

/// Worker IDs are UUIDs; a malformed one can never resolve to a real
/// worker, so every admin endpoint rejects the shape before touching the
/// registry or the store.
fn validate_worker_id(worker_id: &str) -> Result<(), AppError> {
    Uuid::parse_str(worker_id)
        .map(|_| ())
        .map_err(|_| AppError::Validation("invalid worker_id".into()))
}

#[derive(Debug, Serialize)]
pub struct Overview {
    pub users: Vec<User>,
    pub workers: Vec<Worker>,
    pub active_jobs: Vec<Job>,
    pub recent_jobs: Vec<Job>,
    pub connected_worker_ids: Vec<String>,
}

#[instrument(skip(state))]
pub async fn overview(State(state): State<AppState>) -> Result<Json<Overview>, AppError> {
    let users = state.users.list_all().await?;
    let workers = state.workers.list_all().await?;
    let active_jobs = state.jobs.list_active().await?;
    let recent_jobs = state.jobs.list_recent(50).await?;
    let connected_worker_ids = state.live_worker_ids().await;

    Ok(Json(Overview {
        users,
        workers,
        active_jobs,
        recent_jobs,
        connected_worker_ids,
    }))
}

/// Tears down a worker's live session without changing its restriction.
/// The watchdog or a fresh hello will eventually pick the job back up.
#[instrument(skip(state))]
pub async fn disconnect_worker(State(state): State<AppState>, Path(worker_id): Path<String>) -> Result<(), AppError> {
    validate_worker_id(&worker_id)?;
    let _ = state.workers.find(&worker_id).await?.ok_or(AppError::NotFound("worker"))?;
    force_disconnect(&state, &worker_id).await;
    info!(worker_id, "admin disconnected worker");
    Ok(())
}

#[instrument(skip(state))]
pub async fn ban_worker(State(state): State<AppState>, Path(worker_id): Path<String>) -> Result<(), AppError> {
    restrict(&state, &worker_id, Restriction::Banned).await
}

#[instrument(skip(state))]
pub async fn suspend_worker(State(state): State<AppState>, Path(worker_id): Path<String>) -> Result<(), AppError> {
    restrict(&state, &worker_id, Restriction::Suspended).await
}

#[instrument(skip(state))]
pub async fn unsuspend_worker(State(state): State<AppState>, Path(worker_id): Path<String>) -> Result<(), AppError> {
    restrict(&state, &worker_id, Restriction::None).await
}

async fn restrict(state: &AppState, worker_id: &str, restriction: Restriction) -> Result<(), AppError> {
    validate_worker_id(worker_id)?;
    let _ = state.workers.find(worker_id).await?.ok_or(AppError::NotFound("worker"))?;
    state.workers.set_restriction(worker_id, restriction).await?;
    if restriction.is_restricted() {
        force_disconnect(state, worker_id).await;
    }
    info!(worker_id, ?restriction, "admin updated worker restriction");
    Ok(())
}

/// WS close code for a disconnect the admin surface initiated.
const CLOSE_ADMIN_DISCONNECT: u16 = 4400;
/// Standard "going away" close code, used for the advisory broadcast so
/// workers reconnect rather than treat it as a protocol fault.
const CLOSE_GOING_AWAY: u16 = 1001;

/// Requests that a worker's live session close with the admin-disconnect
/// code. The session loop's own teardown path unregisters it and marks it
/// offline durably; this function only asks it to close. A no-op if the
/// worker has no live session.
async fn force_disconnect(state: &AppState, worker_id: &str) {
    let _ = state
        .force_close_worker(worker_id, CLOSE_ADMIN_DISCONNECT, "disconnected by operator".to_string())
        .await;
}

#[derive(Debug, serde::Deserialize)]
pub struct BroadcastRequest {
    pub message: String,
}

/// Closes every connected worker's session with an advisory message,
/// for maintenance announcements ahead of a planned restart. Workers are
/// expected to reconnect on their own schedule afterward.
#[instrument(skip(state, request))]
pub async fn broadcast(State(state): State<AppState>, Json(request): Json<BroadcastRequest>) -> Json<serde_json::Value> {
    let worker_ids = state.live_worker_ids().await;
    let mut delivered = 0usize;
    for worker_id in &worker_ids {
        if state
            .force_close_worker(worker_id, CLOSE_GOING_AWAY, request.message.clone())
            .await
            .is_ok()
        {
            delivered += 1;
        }
    }
    info!(delivered, total = worker_ids.len(), "admin broadcast sent");
    Json(serde_json::json!({ "delivered": delivered, "total": worker_ids.len() }))
}
