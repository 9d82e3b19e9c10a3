#[path = "support.rs"]
mod support;

use gridx_domain_models::{Capabilities, SessionMessage};
use gridx_infra_worker_client::WorkerSessionClient;
use serde_json::json;

/// A `job_result` that omits `duration_seconds` must still be charged for
/// the time the job actually spent assigned, not treated as free — the
/// coordinator falls back to `now - assigned_at` rather than defaulting
/// the worker-reported duration to zero.
#[tokio::test]
async fn missing_duration_falls_back_to_observed_elapsed_time() {
    let harness = support::spawn().await;
    let client = reqwest::Client::new();

    let submit: serde_json::Value = client
        .post(format!("{}/api/v1/jobs", harness.http_url))
        .json(&json!({
            "user_id": "nora",
            "code": "print(1)",
            "language": "python",
            "limits": { "timeout_seconds": 60 }
        }))
        .send()
        .await
        .expect("submit succeeds")
        .json()
        .await
        .expect("submit response decodes");
    let job_id = submit["job_id"].as_str().unwrap().to_string();
    let reserved = submit["reserved"].as_f64().unwrap();

    let mut worker = WorkerSessionClient::connect(&harness.ws_url).await.expect("worker connects");
    worker
        .send(&SessionMessage::Hello {
            worker_id: "worker-oscar".into(),
            owner_id: Some("oscar".into()),
            auth_token: Some("oscar-token".into()),
            capabilities: Capabilities {
                cpu_cores: 2,
                gpu: false,
                can_execute: true,
            },
        })
        .await
        .expect("hello sends");
    worker.recv().await.expect("hello_ack arrives");

    match worker.recv().await.expect("assign_job arrives") {
        SessionMessage::AssignJob { job_id: assigned, .. } => assert_eq!(assigned, job_id),
        other => panic!("expected assign_job, got {other:?}"),
    }

    // Let measurable wall-clock time pass between assignment and result so
    // the elapsed-time fallback has something other than zero to compute.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;

    worker
        .send(&SessionMessage::JobResult {
            job_id: job_id.clone(),
            exit_code: 0,
            stdout: "1\n".into(),
            stderr: String::new(),
            duration_seconds: None,
        })
        .await
        .expect("job_result sends");

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let job = harness.state.jobs.find(&job_id).await.expect("job query succeeds").expect("job exists");
    assert_eq!(job.status, gridx_domain_models::JobStatus::Completed);

    // At rate 0.1/s and ~0.25s elapsed, cost is small but strictly
    // positive; a duration-defaults-to-zero bug would refund the full
    // reservation and pay the worker owner nothing.
    let nora_balance = harness.state.credits.balance("nora").await.expect("balance reads");
    assert!(nora_balance < 100.0 - f64::EPSILON, "expected a non-zero cost, balance was {nora_balance}");
    assert!(nora_balance > 100.0 - reserved, "expected a partial refund, balance was {nora_balance}");

    let oscar_balance = harness.state.credits.balance("oscar").await.expect("balance reads");
    assert!(oscar_balance > 100.0, "expected a non-zero worker reward, balance was {oscar_balance}");
}
