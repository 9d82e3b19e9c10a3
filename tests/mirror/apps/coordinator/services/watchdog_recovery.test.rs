#[path = "../support.rs"]
mod support;

use chrono::Utc;
use gridx_coordinator::services::watchdog;
use gridx_domain_models::{Job, JobStatus, WorkerStatus};

/// A job left `running` against a worker that was never registered in
/// the live session map (the coordinator process restarted, or the
/// worker's socket died without the teardown path running) is requeued
/// by the sweep, and a stale durable heartbeat is enough on its own to
/// flip the worker to offline.
#[tokio::test]
async fn sweep_requeues_orphaned_job_and_marks_stale_worker_offline() {
    let mut settings = support::test_settings();
    settings.offline_threshold_seconds = 0;
    let state = support::bare_state(settings).await;

    state
        .workers
        .upsert_connected("worker-ghost", "henry", "henry-token", 2, false, true, None)
        .await
        .expect("worker upserts");
    state
        .workers
        .set_status("worker-ghost", WorkerStatus::Busy)
        .await
        .expect("status update succeeds");

    let job = Job {
        job_id: "job-orphaned".to_string(),
        user_id: "henry".to_string(),
        source: "print(1)".to_string(),
        language: "python".to_string(),
        status: JobStatus::Running,
        assigned_worker_id: Some("worker-ghost".to_string()),
        timeout_seconds: 60,
        reserved: 6.0,
        created_at: Utc::now(),
        assigned_at: Some(Utc::now()),
        completed_at: None,
        stdout: None,
        stderr: None,
        exit_code: None,
    };
    state.jobs.create(&job).await.expect("job row creates");
    state.jobs.assign(&job.job_id, "worker-ghost").await.expect("job assigns");
    state.jobs.mark_running(&job.job_id).await.expect("job marks running");

    // Give the upserted heartbeat a moment to fall behind the zeroed
    // offline threshold, then sweep. No live session was ever registered
    // for "worker-ghost" in this process, so the job reads as stranded
    // regardless of the heartbeat staleness threshold.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    watchdog::sweep(&state).await;

    let reloaded = state
        .jobs
        .find(&job.job_id)
        .await
        .expect("job query succeeds")
        .expect("job still exists");
    assert_eq!(reloaded.status, JobStatus::Queued);
    assert!(reloaded.assigned_worker_id.is_none());

    let worker = state
        .workers
        .find("worker-ghost")
        .await
        .expect("worker query succeeds")
        .expect("worker row exists");
    assert_eq!(worker.status, WorkerStatus::Offline);
}
