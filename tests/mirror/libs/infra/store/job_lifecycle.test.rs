use chrono::Utc;
use gridx_domain_models::{Job, JobStatus};
use gridx_infra_store::{JobsRepository, StoreClient};

async fn repo() -> JobsRepository {
    let store = StoreClient::connect(":memory:", None).await.expect("in-memory store connects");
    JobsRepository::new(store)
}

fn sample_job(job_id: &str, user_id: &str) -> Job {
    Job {
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
    }
}

/// The full forward-only state machine: queued -> assigned -> running ->
/// completed, checked at each transition.
#[tokio::test]
async fn job_advances_through_its_full_lifecycle() {
    let jobs = repo().await;
    let job = sample_job("job-1", "alice");
    jobs.create(&job).await.unwrap();

    let fetched = jobs.find("job-1").await.unwrap().unwrap();
    assert_eq!(fetched.status, JobStatus::Queued);

    jobs.assign("job-1", "worker-1").await.unwrap();
    let fetched = jobs.find("job-1").await.unwrap().unwrap();
    assert_eq!(fetched.status, JobStatus::Assigned);
    assert_eq!(fetched.assigned_worker_id.as_deref(), Some("worker-1"));
    assert!(fetched.assigned_at.is_some());

    jobs.mark_running("job-1").await.unwrap();
    assert_eq!(jobs.find("job-1").await.unwrap().unwrap().status, JobStatus::Running);

    jobs.finish("job-1", 0, "ok\n", "").await.unwrap();
    let done = jobs.find("job-1").await.unwrap().unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.exit_code, Some(0));
    assert_eq!(done.stdout.as_deref(), Some("ok\n"));
    assert!(done.completed_at.is_some());
}

/// A non-zero exit code settles the job as `failed`, not `completed`,
/// while still recording the worker's captured output.
#[tokio::test]
async fn nonzero_exit_code_settles_as_failed() {
    let jobs = repo().await;
    let job = sample_job("job-2", "alice");
    jobs.create(&job).await.unwrap();
    jobs.assign("job-2", "worker-1").await.unwrap();
    jobs.mark_running("job-2").await.unwrap();

    jobs.finish("job-2", 1, "", "boom\n").await.unwrap();
    let failed = jobs.find("job-2").await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.exit_code, Some(1));
    assert_eq!(failed.stderr.as_deref(), Some("boom\n"));
}

/// Watchdog recovery: an assigned/running job can be requeued, which
/// clears its assigned worker and sends it back through `queued`.
#[tokio::test]
async fn requeue_clears_assignment_and_returns_to_queued() {
    let jobs = repo().await;
    let job = sample_job("job-3", "alice");
    jobs.create(&job).await.unwrap();
    jobs.assign("job-3", "worker-1").await.unwrap();
    jobs.mark_running("job-3").await.unwrap();

    jobs.requeue("job-3").await.unwrap();
    let requeued = jobs.find("job-3").await.unwrap().unwrap();
    assert_eq!(requeued.status, JobStatus::Queued);
    assert!(requeued.assigned_worker_id.is_none());
    assert!(requeued.assigned_at.is_none());
}

/// A queue-capacity rejection before the job ever dispatches is recorded
/// via `fail`, independent of any worker-reported exit code.
#[tokio::test]
async fn administrative_fail_records_a_reason_without_an_exit_code() {
    let jobs = repo().await;
    let job = sample_job("job-4", "alice");
    jobs.create(&job).await.unwrap();

    jobs.fail("job-4", "queue at capacity").await.unwrap();
    let failed = jobs.find("job-4").await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.exit_code.is_none());
    assert_eq!(failed.stderr.as_deref(), Some("queue at capacity"));
}

#[tokio::test]
async fn list_queued_ordered_restores_fifo_order() {
    let jobs = repo().await;
    jobs.create(&sample_job("job-a", "alice")).await.unwrap();
    jobs.create(&sample_job("job-b", "alice")).await.unwrap();
    jobs.create(&sample_job("job-c", "alice")).await.unwrap();
    jobs.assign("job-b", "worker-1").await.unwrap();

    let queued = jobs.list_queued_ordered().await.unwrap();
    let ids: Vec<_> = queued.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(ids, vec!["job-a", "job-c"]);
}

#[tokio::test]
async fn list_in_flight_for_worker_only_returns_that_workers_active_jobs() {
    let jobs = repo().await;
    jobs.create(&sample_job("job-x", "alice")).await.unwrap();
    jobs.create(&sample_job("job-y", "alice")).await.unwrap();
    jobs.assign("job-x", "worker-1").await.unwrap();
    jobs.assign("job-y", "worker-2").await.unwrap();

    let for_worker_1 = jobs.list_in_flight_for_worker("worker-1").await.unwrap();
    assert_eq!(for_worker_1.len(), 1);
    assert_eq!(for_worker_1[0].job_id, "job-x");
}
