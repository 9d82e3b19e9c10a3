//! Process-wide shared state: the store handles, the live worker
//! registry, the job queue, and the locks/signals that the dispatcher
//! and watchdog coordinate through.

use crate::config::Settings;
use chrono::{DateTime, Utc};
use gridx_domain_models::{Capabilities, SessionMessage, WorkerStatus};
use gridx_infra_store::{CreditsRepository, JobsRepository, StoreClient, UsersRepository, WorkersRepository};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tracing::{debug, instrument, warn};

/// Bounded number of most-recent `job_log` lines kept per worker for the
/// admin overview endpoint. The durable store never sees these lines.
const LOG_TAIL_CAPACITY: usize = 2000;

/// A live session's in-memory record. Destroyed the moment the session's
/// reader/writer task pair tears down; the durable `workers` row with
/// `status = offline` is what survives a disconnect.
pub struct WorkerSession {
    pub owner_id: String,
    pub capabilities: Capabilities,
    pub status: WorkerStatus,
    pub last_seen: DateTime<Utc>,
    pub sender: mpsc::UnboundedSender<SessionMessage>,
    pub close: mpsc::UnboundedSender<(u16, String)>,
    pub log_tail: VecDeque<String>,
}

impl WorkerSession {
    pub fn push_log_line(&mut self, line: String) {
        if self.log_tail.len() >= LOG_TAIL_CAPACITY {
            self.log_tail.pop_front();
        }
        self.log_tail.push_back(line);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: StoreClient,
    pub users: UsersRepository,
    pub workers: WorkersRepository,
    pub jobs: JobsRepository,
    pub credits: CreditsRepository,

    /// Single-writer registry of live worker sessions.
    pub registry: Arc<RwLock<HashMap<String, WorkerSession>>>,
    /// FIFO of queued-but-unassigned job IDs.
    pub queue: Arc<Mutex<VecDeque<String>>>,
    /// Serializes the dispatcher's decide-and-assign sequence. Acquired
    /// before the registry lock; never held across a network send.
    pub dispatch_lock: Arc<Mutex<()>>,
    /// Coalescing wakeup signal for the dispatcher loop.
    pub dispatch_notify: Arc<Notify>,

    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: StoreClient, settings: Settings) -> Self {
        Self {
            users: UsersRepository::new(store.clone()),
            workers: WorkersRepository::new(store.clone()),
            jobs: JobsRepository::new(store.clone()),
            credits: CreditsRepository::new(store.clone()),
            store,
            registry: Arc::new(RwLock::new(HashMap::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            dispatch_lock: Arc::new(Mutex::new(())),
            dispatch_notify: Arc::new(Notify::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn request_dispatch(&self) {
        self.dispatch_notify.notify_one();
    }

    /// Rebuilds the in-memory FIFO from every `queued` job row. Called
    /// once at bootstrap: the queue itself doesn't survive a restart, but
    /// `queued` status in the store does, and invariant 1 requires the
    /// queue to hold exactly the jobs the store says are queued.
    #[instrument(skip(self))]
    pub async fn restore_queue_from_store(&self) -> Result<usize, gridx_infra_store::StoreError> {
        let queued = self.jobs.list_queued_ordered().await?;
        let mut queue = self.queue.lock().await;
        for job in &queued {
            queue.push_back(job.job_id.clone());
        }
        Ok(queued.len())
    }

    #[instrument(skip(self))]
    pub async fn enqueue_job(&self, job_id: &str) -> Result<(), &'static str> {
        let mut queue = self.queue.lock().await;
        if queue.len() >= self.settings.queue_cap {
            return Err("queue at capacity");
        }
        queue.push_back(job_id.to_string());
        Ok(())
    }

    pub async fn requeue_job_at_head(&self, job_id: &str) {
        let mut queue = self.queue.lock().await;
        queue.push_front(job_id.to_string());
    }

    /// Returns the FIFO head without removing it.
    pub async fn peek_queue_head(&self) -> Option<String> {
        self.queue.lock().await.front().cloned()
    }

    /// Removes and returns the FIFO head, discarding a stale entry or
    /// popping the job the dispatcher just assigned.
    pub async fn pop_queue_head(&self) -> Option<String> {
        self.queue.lock().await.pop_front()
    }

    /// Implements the three-bucket select-eligible policy: prefer an owner
    /// other than the submitter and other than the coordinator's own
    /// owner id, then the coordinator owner, then the submitter itself.
    #[instrument(skip(self))]
    pub async fn select_eligible_worker(&self, submitter_user_id: &str) -> Option<String> {
        let registry = self.registry.read().await;

        let eligible = |session: &WorkerSession| {
            session.status == WorkerStatus::Idle && session.capabilities.can_execute
        };

        let mut bucket_others = None;
        let mut bucket_coordinator = None;
        let mut bucket_self = None;

        for (worker_id, session) in registry.iter() {
            if !eligible(session) {
                continue;
            }
            if session.owner_id == self.settings.coordinator_owner {
                bucket_coordinator.get_or_insert_with(|| worker_id.clone());
            } else if session.owner_id == submitter_user_id {
                bucket_self.get_or_insert_with(|| worker_id.clone());
            } else {
                bucket_others.get_or_insert_with(|| worker_id.clone());
            }
        }

        bucket_others.or(bucket_coordinator).or(bucket_self)
    }

    pub async fn mark_worker_busy_in_registry(&self, worker_id: &str) {
        if let Some(session) = self.registry.write().await.get_mut(worker_id) {
            session.status = WorkerStatus::Busy;
        }
    }

    pub async fn mark_worker_idle_in_registry(&self, worker_id: &str) {
        if let Some(session) = self.registry.write().await.get_mut(worker_id) {
            session.status = WorkerStatus::Idle;
        }
    }

    pub async fn touch_worker_last_seen(&self, worker_id: &str) {
        if let Some(session) = self.registry.write().await.get_mut(worker_id) {
            session.last_seen = Utc::now();
        }
    }

    #[instrument(skip(self, sender, close))]
    pub async fn register_worker_session(
        &self,
        worker_id: &str,
        owner_id: &str,
        capabilities: Capabilities,
        sender: mpsc::UnboundedSender<SessionMessage>,
        close: mpsc::UnboundedSender<(u16, String)>,
    ) {
        let mut registry = self.registry.write().await;
        if registry.contains_key(worker_id) {
            debug!(worker_id, "evicting prior session for reconnecting worker");
        }
        registry.insert(
            worker_id.to_string(),
            WorkerSession {
                owner_id: owner_id.to_string(),
                capabilities,
                status: WorkerStatus::Idle,
                last_seen: Utc::now(),
                sender,
                close,
                log_tail: VecDeque::new(),
            },
        );
    }

    pub async fn unregister_worker_session(&self, worker_id: &str) {
        self.registry.write().await.remove(worker_id);
    }

    /// Sends a frame on a worker's session sink. Returns `Err` if the
    /// worker is no longer registered or its channel's receiver has
    /// dropped (the session task already tore down) — the dispatch
    /// abort path in `dispatcher.rs` treats this as a send failure.
    pub async fn send_to_worker(&self, worker_id: &str, message: SessionMessage) -> Result<(), ()> {
        let sender = {
            let registry = self.registry.read().await;
            registry.get(worker_id).map(|s| s.sender.clone())
        };
        match sender {
            Some(sender) => sender.send(message).map_err(|_| ()),
            None => Err(()),
        }
    }

    /// Requests that a worker's live session close with the given WS close
    /// code and reason, used by the admin disconnect/ban/suspend/broadcast
    /// endpoints. A no-op (reported as `Err`) if the worker has no live
    /// session to close.
    pub async fn force_close_worker(&self, worker_id: &str, code: u16, reason: String) -> Result<(), ()> {
        let closer = {
            let registry = self.registry.read().await;
            registry.get(worker_id).map(|s| s.close.clone())
        };
        match closer {
            Some(closer) => closer.send((code, reason)).map_err(|_| ()),
            None => Err(()),
        }
    }

    /// True if the given worker currently has a live session.
    pub async fn is_worker_connected(&self, worker_id: &str) -> bool {
        self.registry.read().await.contains_key(worker_id)
    }

    /// Last-seen wall clock for a live session, if any.
    pub async fn worker_last_seen(&self, worker_id: &str) -> Option<DateTime<Utc>> {
        self.registry.read().await.get(worker_id).map(|s| s.last_seen)
    }

    /// Snapshot of every live worker id currently in the registry, used
    /// by the admin broadcast endpoint.
    pub async fn live_worker_ids(&self) -> Vec<String> {
        self.registry.read().await.keys().cloned().collect()
    }

    /// Marks the worker offline in the durable store on any session
    /// teardown path, graceful or not.
    #[instrument(skip(self))]
    pub async fn mark_worker_offline_durable(&self, worker_id: &str) {
        if let Err(e) = self.workers.set_status(worker_id, WorkerStatus::Offline).await {
            warn!(worker_id, error = %e, "failed to persist offline status on disconnect");
        }
    }

    /// Appends a `job_log` line to the worker's in-memory tail. The durable
    /// store never sees these lines.
    pub async fn push_worker_log_line(&self, worker_id: &str, job_id: &str, line: String) {
        if let Some(session) = self.registry.write().await.get_mut(worker_id) {
            session.push_log_line(format!("[{job_id}] {line}"));
        }
    }
}
