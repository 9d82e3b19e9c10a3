//! Matches queued jobs to eligible idle workers, serialized by a global
//! dispatch mutex, re-triggered by submission/`hello_ack`/`job_result`
//! edges via a coalescing [`Notify`].

use crate::state::AppState;
use gridx_domain_models::{JobStatus, SessionMessage, WorkerStatus};
use tracing::{info, instrument, warn};

/// Spawns the long-running dispatcher task. It parks on `dispatch_notify`
/// between runs; every `request_dispatch()` call wakes it at least once.
pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        loop {
            state.dispatch_notify.notified().await;
            run_once(&state).await;
        }
    });
}

/// Drains the queue as far as it can go: assigns jobs to eligible idle
/// workers until the queue is empty or no eligible worker remains.
#[instrument(skip(state))]
pub async fn run_once(state: &AppState) {
    let _guard = state.dispatch_lock.lock().await;

    loop {
        let Some(job_id) = state.peek_queue_head().await else {
            break;
        };

        let job = match state.jobs.find(&job_id).await {
            Ok(Some(job)) if job.status == JobStatus::Queued => job,
            Ok(_) => {
                // Moved on (or vanished) since it was enqueued; discard
                // the stale head and keep draining.
                state.pop_queue_head().await;
                continue;
            }
            Err(e) => {
                warn!(job_id, error = %e, "store fault while peeking queue head, stopping dispatch pass");
                break;
            }
        };

        let Some(worker_id) = state.select_eligible_worker(&job.user_id).await else {
            // No eligible worker: leave the job at the head and stop.
            break;
        };

        state.mark_worker_busy_in_registry(&worker_id).await;
        if let Err(e) = state.workers.set_status(&worker_id, WorkerStatus::Busy).await {
            warn!(job_id, worker_id, error = %e, "store fault marking worker busy, stopping dispatch pass");
            state.mark_worker_idle_in_registry(&worker_id).await;
            break;
        }
        if let Err(e) = state.jobs.assign(&job_id, &worker_id).await {
            warn!(job_id, worker_id, error = %e, "store fault assigning job, reverting");
            state.mark_worker_idle_in_registry(&worker_id).await;
            state.workers.set_status(&worker_id, WorkerStatus::Idle).await.ok();
            break;
        }
        state.pop_queue_head().await;

        let assign = SessionMessage::AssignJob {
            job_id: job_id.clone(),
            language: job.language.clone(),
            source: job.source.clone(),
            timeout_seconds: job.timeout_seconds,
        };

        if state.send_to_worker(&worker_id, assign).await.is_err() {
            // Revert worker and job, re-enqueue at the head, then stop —
            // a dead session will likely fail again.
            warn!(job_id, worker_id, "send failure dispatching job, reverting and stopping pass");
            state.mark_worker_idle_in_registry(&worker_id).await;
            state.workers.set_status(&worker_id, WorkerStatus::Idle).await.ok();
            state.jobs.requeue(&job_id).await.ok();
            state.requeue_job_at_head(&job_id).await;
            break;
        }

        info!(job_id, worker_id, "job dispatched");
    }
}
