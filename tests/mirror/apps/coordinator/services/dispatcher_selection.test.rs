#[path = "../support.rs"]
mod support;

use gridx_domain_models::Capabilities;
use tokio::sync::mpsc;

fn capabilities() -> Capabilities {
    Capabilities {
        cpu_cores: 2,
        gpu: false,
        can_execute: true,
    }
}

/// Exercises the three-bucket eligible-worker policy directly against
/// the in-memory registry, independent of the session transport.
#[tokio::test]
async fn selection_prefers_others_then_coordinator_then_self() {
    let state = support::bare_state(support::test_settings()).await;

    let (carol_tx, _carol_rx) = mpsc::unbounded_channel();
    let (carol_close_tx, _carol_close_rx) = mpsc::unbounded_channel();
    state
        .register_worker_session("worker-carol", "carol", capabilities(), carol_tx, carol_close_tx)
        .await;

    let (coord_tx, _coord_rx) = mpsc::unbounded_channel();
    let (coord_close_tx, _coord_close_rx) = mpsc::unbounded_channel();
    state
        .register_worker_session("worker-coordinator", "coordinator", capabilities(), coord_tx, coord_close_tx)
        .await;

    let (alice_tx, _alice_rx) = mpsc::unbounded_channel();
    let (alice_close_tx, _alice_close_rx) = mpsc::unbounded_channel();
    state
        .register_worker_session("worker-alice", "alice", capabilities(), alice_tx, alice_close_tx)
        .await;

    // All three eligible: the other owner wins.
    assert_eq!(state.select_eligible_worker("alice").await.as_deref(), Some("worker-carol"));

    state.unregister_worker_session("worker-carol").await;

    // With no other-owner worker left, the coordinator-owned one wins
    // over the submitter's own.
    assert_eq!(state.select_eligible_worker("alice").await.as_deref(), Some("worker-coordinator"));

    state.unregister_worker_session("worker-coordinator").await;

    // Only the submitter's own worker remains eligible.
    assert_eq!(state.select_eligible_worker("alice").await.as_deref(), Some("worker-alice"));

    // A busy worker is never eligible, regardless of bucket.
    state.mark_worker_busy_in_registry("worker-alice").await;
    assert_eq!(state.select_eligible_worker("alice").await, None);
    state.mark_worker_idle_in_registry("worker-alice").await;
    assert_eq!(state.select_eligible_worker("alice").await.as_deref(), Some("worker-alice"));
}
