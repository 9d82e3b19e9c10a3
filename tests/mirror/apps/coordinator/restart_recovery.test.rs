#[path = "support.rs"]
mod support;

use chrono::Utc;
use gridx_domain_models::{Job, JobStatus};

/// Simulates a coordinator restart: the in-memory FIFO is empty (a fresh
/// process never saw the original submission), but the store still
/// holds the job as `queued`. Rebuilding the queue from the store must
/// restore it so the dispatcher can pick it up without a second
/// submission.
#[tokio::test]
async fn restore_queue_from_store_repopulates_the_fifo_in_order() {
    let state = support::bare_state(support::test_settings()).await;

    for (job_id, user_id) in [("job-1", "alice"), ("job-2", "alice"), ("job-3", "alice")] {
        let job = Job {
            job_id: job_id.to_string(),
            user_id: user_id.to_string(),
            source: "print(1)".to_string(),
            language: "python".to_string(),
            status: JobStatus::Queued,
            assigned_worker_id: None,
            timeout_seconds: 60,
            reserved: 6.0,
            created_at: Utc::now(),
            assigned_at: None,
            completed_at: None,
            stdout: None,
            stderr: None,
            exit_code: None,
        };
        state.jobs.create(&job).await.expect("job row creates");
    }

    // A job already dispatched before the restart must not be
    // rediscovered through this path — only `queued` rows count.
    let assigned_job = Job {
        job_id: "job-already-assigned".to_string(),
        user_id: "alice".to_string(),
        source: "print(1)".to_string(),
        language: "python".to_string(),
        status: JobStatus::Queued,
        assigned_worker_id: None,
        timeout_seconds: 60,
        reserved: 6.0,
        created_at: Utc::now(),
        assigned_at: None,
        completed_at: None,
        stdout: None,
        stderr: None,
        exit_code: None,
    };
    state.jobs.create(&assigned_job).await.expect("job row creates");
    state.jobs.assign("job-already-assigned", "worker-1").await.expect("assign succeeds");

    assert!(state.peek_queue_head().await.is_none(), "the in-memory queue starts empty");

    let restored = state.restore_queue_from_store().await.expect("restore succeeds");
    assert_eq!(restored, 3);

    assert_eq!(state.pop_queue_head().await.as_deref(), Some("job-1"));
    assert_eq!(state.pop_queue_head().await.as_deref(), Some("job-2"));
    assert_eq!(state.pop_queue_head().await.as_deref(), Some("job-3"));
    assert!(state.pop_queue_head().await.is_none());
}
