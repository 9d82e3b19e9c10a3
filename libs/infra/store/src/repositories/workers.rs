use crate::errors::StoreError;
use crate::StoreClient;
use chrono::Utc;
use gridx_domain_models::{Restriction, Worker, WorkerStatus};
use libsql::params;
use tracing::instrument;

#[derive(Clone)]
pub struct WorkersRepository {
    store: StoreClient,
}

impl WorkersRepository {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// Inserts a worker on first hello, or refreshes its connection-time
    /// attributes (owner, token, capabilities, ip) on reconnect. `status`
    /// is always set to `idle` here; the caller marks it `busy` once a
    /// job is dispatched to it.
    #[instrument(skip(self, auth_token))]
    pub async fn upsert_connected(
        &self,
        worker_id: &str,
        owner_id: &str,
        auth_token: &str,
        cpu_cores: u32,
        gpu: bool,
        can_execute: bool,
        ip: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO workers (worker_id, owner_id, auth_token, cpu_cores, gpu, can_execute, ip, status, restriction, last_heartbeat)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'idle', 'none', ?8)
             ON CONFLICT(worker_id) DO UPDATE SET
                owner_id = excluded.owner_id,
                auth_token = excluded.auth_token,
                cpu_cores = excluded.cpu_cores,
                gpu = excluded.gpu,
                can_execute = excluded.can_execute,
                ip = excluded.ip,
                status = 'idle',
                last_heartbeat = excluded.last_heartbeat",
            params![
                worker_id,
                owner_id,
                auth_token,
                cpu_cores,
                gpu as i64,
                can_execute as i64,
                ip,
                now
            ],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, worker_id: &str, status: WorkerStatus) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE workers SET status = ?1 WHERE worker_id = ?2",
            params![status_str(status), worker_id],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn touch_heartbeat(&self, worker_id: &str) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE workers SET last_heartbeat = ?1 WHERE worker_id = ?2",
            params![Utc::now().to_rfc3339(), worker_id],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find(&self, worker_id: &str) -> Result<Option<Worker>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT worker_id, owner_id, auth_token, cpu_cores, gpu, can_execute, ip, status, restriction, last_heartbeat
                 FROM workers WHERE worker_id = ?1",
                params![worker_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(map_worker(&row)?)),
            None => Ok(None),
        }
    }

    /// All durable worker records, used by the watchdog's offline sweep
    /// and the admin overview endpoint.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Worker>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT worker_id, owner_id, auth_token, cpu_cores, gpu, can_execute, ip, status, restriction, last_heartbeat
                 FROM workers",
                (),
            )
            .await?;
        let mut workers = Vec::new();
        while let Some(row) = rows.next().await? {
            workers.push(map_worker(&row)?);
        }
        Ok(workers)
    }

    /// Workers owned by a given user, used by the "my workers" slice of
    /// the admin overview.
    #[instrument(skip(self))]
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Worker>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT worker_id, owner_id, auth_token, cpu_cores, gpu, can_execute, ip, status, restriction, last_heartbeat
                 FROM workers WHERE owner_id = ?1",
                params![owner_id],
            )
            .await?;
        let mut workers = Vec::new();
        while let Some(row) = rows.next().await? {
            workers.push(map_worker(&row)?);
        }
        Ok(workers)
    }

    /// Sets a worker's administrative restriction (`none`, `suspended`,
    /// `banned`). Does not touch `status` — the caller disconnects the
    /// live session separately when restricting a connected worker.
    #[instrument(skip(self))]
    pub async fn set_restriction(&self, worker_id: &str, restriction: Restriction) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE workers SET restriction = ?1 WHERE worker_id = ?2",
            params![restriction_str(restriction), worker_id],
        )
        .await?;
        Ok(())
    }
}

fn status_str(status: WorkerStatus) -> &'static str {
    match status {
        WorkerStatus::Idle => "idle",
        WorkerStatus::Busy => "busy",
        WorkerStatus::Offline => "offline",
    }
}

fn parse_status(raw: &str) -> Result<WorkerStatus, StoreError> {
    match raw {
        "idle" => Ok(WorkerStatus::Idle),
        "busy" => Ok(WorkerStatus::Busy),
        "offline" => Ok(WorkerStatus::Offline),
        other => Err(StoreError::MappingError(format!("unknown worker status {other}"))),
    }
}

fn restriction_str(restriction: Restriction) -> &'static str {
    match restriction {
        Restriction::None => "none",
        Restriction::Suspended => "suspended",
        Restriction::Banned => "banned",
    }
}

fn parse_restriction(raw: &str) -> Result<Restriction, StoreError> {
    match raw {
        "none" => Ok(Restriction::None),
        "suspended" => Ok(Restriction::Suspended),
        "banned" => Ok(Restriction::Banned),
        other => Err(StoreError::MappingError(format!("unknown restriction {other}"))),
    }
}

fn map_worker(row: &libsql::Row) -> Result<Worker, StoreError> {
    let heartbeat_raw: String = row.get(9)?;
    let status_raw: String = row.get(7)?;
    let restriction_raw: String = row.get(8)?;
    Ok(Worker {
        worker_id: row.get(0)?,
        owner_id: row.get(1)?,
        auth_token: row.get(2)?,
        cpu_cores: row.get::<i64>(3)? as u32,
        gpu: row.get::<i64>(4)? != 0,
        can_execute: row.get::<i64>(5)? != 0,
        ip: row.get(6)?,
        status: parse_status(&status_raw)?,
        restriction: parse_restriction(&restriction_raw)?,
        last_heartbeat: heartbeat_raw
            .parse()
            .map_err(|e| StoreError::MappingError(format!("bad last_heartbeat: {e}")))?,
    })
}
