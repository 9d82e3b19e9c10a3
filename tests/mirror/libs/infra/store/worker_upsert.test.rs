use gridx_domain_models::{Restriction, WorkerStatus};
use gridx_infra_store::{StoreClient, WorkersRepository};

async fn repo() -> WorkersRepository {
    let store = StoreClient::connect(":memory:", None).await.expect("in-memory store connects");
    WorkersRepository::new(store)
}

/// First hello creates the row, idle, unrestricted, owned as claimed.
#[tokio::test]
async fn upsert_connected_creates_a_fresh_worker_row() {
    let workers = repo().await;
    workers
        .upsert_connected("worker-1", "alice", "token-1", 4, true, true, Some("10.0.0.1"))
        .await
        .unwrap();

    let worker = workers.find("worker-1").await.unwrap().unwrap();
    assert_eq!(worker.owner_id, "alice");
    assert_eq!(worker.auth_token, "token-1");
    assert_eq!(worker.cpu_cores, 4);
    assert!(worker.gpu);
    assert!(worker.can_execute);
    assert_eq!(worker.status, WorkerStatus::Idle);
    assert_eq!(worker.restriction, Restriction::None);
}

/// A record with `status = offline` is a durable stub: owner and
/// restriction survive across reconnects, and a fresh hello refreshes
/// the connection-time attributes while resetting status back to idle.
#[tokio::test]
async fn reconnect_refreshes_attributes_and_preserves_restriction() {
    let workers = repo().await;
    workers
        .upsert_connected("worker-1", "alice", "token-1", 2, false, true, None)
        .await
        .unwrap();
    workers.set_restriction("worker-1", Restriction::Suspended).await.unwrap();
    workers.set_status("worker-1", WorkerStatus::Offline).await.unwrap();

    // Reconnect with different advertised capabilities.
    workers
        .upsert_connected("worker-1", "alice", "token-2", 8, true, false, Some("10.0.0.2"))
        .await
        .unwrap();

    let worker = workers.find("worker-1").await.unwrap().unwrap();
    assert_eq!(worker.auth_token, "token-2");
    assert_eq!(worker.cpu_cores, 8);
    assert!(worker.gpu);
    assert!(!worker.can_execute);
    assert_eq!(worker.status, WorkerStatus::Idle);
    // The restriction set before the reconnect is untouched by upsert.
    assert_eq!(worker.restriction, Restriction::Suspended);
}

#[tokio::test]
async fn list_by_owner_only_returns_that_owners_workers() {
    let workers = repo().await;
    workers.upsert_connected("worker-1", "alice", "t1", 2, false, true, None).await.unwrap();
    workers.upsert_connected("worker-2", "bob", "t2", 2, false, true, None).await.unwrap();
    workers.upsert_connected("worker-3", "alice", "t3", 2, false, true, None).await.unwrap();

    let alices = workers.list_by_owner("alice").await.unwrap();
    let ids: Vec<_> = alices.iter().map(|w| w.worker_id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"worker-1"));
    assert!(ids.contains(&"worker-3"));
}

#[tokio::test]
async fn set_restriction_does_not_change_status() {
    let workers = repo().await;
    workers.upsert_connected("worker-1", "alice", "t1", 2, false, true, None).await.unwrap();
    workers.set_status("worker-1", WorkerStatus::Busy).await.unwrap();

    workers.set_restriction("worker-1", Restriction::Banned).await.unwrap();

    let worker = workers.find("worker-1").await.unwrap().unwrap();
    assert_eq!(worker.restriction, Restriction::Banned);
    assert_eq!(worker.status, WorkerStatus::Busy);
}
