//! Turns a worker's `job_result` into a final credit balance. Computes
//! the actual cost from observed duration, clamped to what was reserved,
//! refunds the surplus to the submitter, and rewards the worker's owner
//! a fraction of the cost.

use crate::state::AppState;
use chrono::Utc;
use gridx_domain_credits::{time_cost, worker_reward};
use gridx_domain_models::JobStatus;
use tracing::{info, instrument, warn};

/// Settles one job against its `job_result`. Idempotent: a job already in
/// a terminal status is left untouched, so a duplicate or racing
/// `job_result` frame (e.g. after a watchdog requeue beat the original
/// worker to the punch) never double-refunds or double-rewards.
#[instrument(skip(state, stdout, stderr))]
pub async fn settle(
    state: &AppState,
    job_id: &str,
    worker_id: &str,
    exit_code: i32,
    stdout: &str,
    stderr: &str,
    duration_seconds: Option<f64>,
) {
    let job = match state.jobs.find(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!(job_id, "job_result for unknown job, dropping");
            return;
        }
        Err(e) => {
            warn!(job_id, error = %e, "store fault loading job for settlement");
            return;
        }
    };

    if job.status.is_terminal() {
        info!(job_id, status = ?job.status, "job_result for already-settled job, ignoring");
        return;
    }

    let params = state.settings.settlement;
    // The worker's self-reported duration wins when present; otherwise the
    // job's own `assigned_at` gives the coordinator-observed elapsed time
    // per §4.7 step 1, rather than silently pricing the job at zero.
    let duration = duration_seconds.unwrap_or_else(|| {
        job.assigned_at
            .map(|assigned| Utc::now().signed_duration_since(assigned).num_milliseconds().max(0) as f64 / 1000.0)
            .unwrap_or(0.0)
    });
    let cost = time_cost(duration, job.reserved, &params);
    let refund = (job.reserved - cost).max(0.0);
    let reward = worker_reward(cost, &params);

    if let Err(e) = state.jobs.finish(job_id, exit_code, stdout, stderr).await {
        warn!(job_id, error = %e, "failed to persist job completion");
        return;
    }
    let final_status = if exit_code == 0 { JobStatus::Completed } else { JobStatus::Failed };

    if refund > 0.0 {
        if let Err(e) = state.credits.credit(&job.user_id, refund).await {
            warn!(job_id, user_id = %job.user_id, refund, error = %e, "failed to refund reservation surplus");
        }
    }

    if reward > 0.0 {
        match state.workers.find(worker_id).await {
            Ok(Some(worker)) => {
                if let Err(e) = state.credits.credit(&worker.owner_id, reward).await {
                    warn!(job_id, worker_id, owner_id = %worker.owner_id, reward, error = %e, "failed to credit worker reward");
                }
            }
            Ok(None) => warn!(job_id, worker_id, "worker vanished before reward could be credited"),
            Err(e) => warn!(job_id, worker_id, error = %e, "store fault looking up worker for reward"),
        }
    }

    info!(
        job_id,
        worker_id,
        exit_code,
        cost,
        refund,
        reward,
        status = ?final_status,
        "job settled"
    );
}
