#[path = "support.rs"]
mod support;

use gridx_coordinator::services::watchdog;
use gridx_domain_models::{Capabilities, SessionMessage};
use gridx_infra_worker_client::WorkerSessionClient;
use serde_json::json;

/// A worker that vanishes mid-job without ever sending `job_result`
/// leaves its job stranded in `running`; the watchdog sweep notices the
/// worker is no longer connected and requeues the job for redispatch.
#[tokio::test]
async fn stranded_job_is_requeued_after_worker_drops() {
    let harness = support::spawn().await;
    let client = reqwest::Client::new();

    let mut worker = WorkerSessionClient::connect(&harness.ws_url)
        .await
        .expect("worker connects");
    worker
        .send(&SessionMessage::Hello {
            worker_id: "worker-flaky".into(),
            owner_id: Some("dave".into()),
            auth_token: Some("dave-token".into()),
            capabilities: Capabilities {
                cpu_cores: 2,
                gpu: false,
                can_execute: true,
            },
        })
        .await
        .expect("hello sends");
    worker.recv().await.expect("hello_ack arrives");

    let submit: serde_json::Value = client
        .post(format!("{}/api/v1/jobs", harness.http_url))
        .json(&json!({ "user_id": "erin", "code": "loop()", "language": "python" }))
        .send()
        .await
        .expect("submit succeeds")
        .json()
        .await
        .expect("submit response decodes");
    let job_id = submit["job_id"].as_str().unwrap().to_string();

    let assigned = worker.recv().await.expect("assign_job arrives");
    assert!(matches!(assigned, SessionMessage::AssignJob { .. }));

    worker
        .send(&SessionMessage::JobStarted { job_id: job_id.clone() })
        .await
        .expect("job_started sends");

    // Simulate a crash: drop the connection without ever answering.
    worker.close().await.ok();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    watchdog::sweep(&harness.state).await;

    let job = harness.state.jobs.find(&job_id).await.expect("job query succeeds").expect("job exists");
    assert_eq!(job.status, gridx_domain_models::JobStatus::Queued);
    assert!(job.assigned_worker_id.is_none());
}
