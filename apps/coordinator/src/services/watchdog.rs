//! Periodic crash-recovery sweep. Requeues jobs stranded on a worker
//! that disconnected or stopped heartbeating, and
//! marks workers offline once their heartbeat goes stale long enough
//! that a disconnect is presumed even if the socket never reported one.

use crate::state::AppState;
use chrono::Utc;
use gridx_domain_models::WorkerStatus;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Spawns the long-running watchdog task, firing every
/// `watchdog_period_seconds`.
pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let period = Duration::from_secs(state.settings.watchdog_period_seconds);
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            sweep(&state).await;
        }
    });
}

/// One pass: requeue in-flight jobs whose worker is gone or stale, then
/// mark any worker whose heartbeat has gone stale past the offline
/// threshold as offline in the durable store.
#[instrument(skip(state))]
pub async fn sweep(state: &AppState) {
    requeue_stranded_jobs(state).await;
    mark_stale_workers_offline(state).await;
}

async fn requeue_stranded_jobs(state: &AppState) {
    let in_flight = match state.jobs.list_in_flight().await {
        Ok(jobs) => jobs,
        Err(e) => {
            warn!(error = %e, "store fault listing in-flight jobs, skipping sweep pass");
            return;
        }
    };

    let stale_after = Duration::from_secs(state.settings.heartbeat_stale_seconds.max(0) as u64);
    let now = Utc::now();

    for job in in_flight {
        let Some(worker_id) = job.assigned_worker_id.clone() else {
            // An in-flight job with no assigned worker is an inconsistent
            // state; requeue it so the dispatcher can pick it up.
            requeue(state, &job.job_id, None).await;
            continue;
        };

        let stranded = if !state.is_worker_connected(&worker_id).await {
            true
        } else {
            match state.worker_last_seen(&worker_id).await {
                Some(last_seen) => {
                    now.signed_duration_since(last_seen)
                        .to_std()
                        .map(|age| age > stale_after)
                        .unwrap_or(false)
                }
                None => true,
            }
        };

        if stranded {
            requeue(state, &job.job_id, Some(&worker_id)).await;
        }
    }
}

async fn requeue(state: &AppState, job_id: &str, worker_id: Option<&str>) {
    if let Err(e) = state.jobs.requeue(job_id).await {
        warn!(job_id, error = %e, "store fault requeuing stranded job");
        return;
    }
    if let Some(worker_id) = worker_id {
        state.mark_worker_idle_in_registry(worker_id).await;
        // If the worker is still connected (just heartbeat-stale) its
        // durable status would otherwise be left at `busy` forever, since
        // only the session teardown path marks it offline.
        if state.is_worker_connected(worker_id).await {
            state.workers.set_status(worker_id, WorkerStatus::Idle).await.ok();
        }
    }
    info!(job_id, worker_id = ?worker_id, "requeued stranded job");
    state.requeue_job_at_head(job_id).await;
    state.request_dispatch();
}

async fn mark_stale_workers_offline(state: &AppState) {
    let workers = match state.workers.list_all().await {
        Ok(workers) => workers,
        Err(e) => {
            warn!(error = %e, "store fault listing workers, skipping offline sweep");
            return;
        }
    };

    let offline_after = Duration::from_secs(state.settings.offline_threshold_seconds.max(0) as u64);
    let now = Utc::now();

    for worker in workers {
        if worker.status == WorkerStatus::Offline {
            continue;
        }
        let stale = now
            .signed_duration_since(worker.last_heartbeat)
            .to_std()
            .map(|age| age > offline_after)
            .unwrap_or(false);
        if stale && !state.is_worker_connected(&worker.worker_id).await {
            if let Err(e) = state.workers.set_status(&worker.worker_id, WorkerStatus::Offline).await {
                warn!(worker_id = %worker.worker_id, error = %e, "failed to mark stale worker offline");
                continue;
            }
            info!(worker_id = %worker.worker_id, "marked stale worker offline");
        }
    }
}
