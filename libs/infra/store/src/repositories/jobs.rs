use crate::errors::StoreError;
use crate::StoreClient;
use chrono::Utc;
use gridx_domain_models::{Job, JobStatus};
use libsql::params;
use tracing::instrument;

#[derive(Clone)]
pub struct JobsRepository {
    store: StoreClient,
}

impl JobsRepository {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    #[instrument(skip(self, source))]
    pub async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO jobs (job_id, user_id, source, language, status, assigned_worker_id, timeout_seconds, reserved, created_at, assigned_at, completed_at, stdout, stderr, exit_code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL, NULL, NULL, NULL)",
            params![
                job.job_id.as_str(),
                job.user_id.as_str(),
                job.source.as_str(),
                job.language.as_str(),
                status_str(job.status),
                job.assigned_worker_id.as_deref(),
                job.timeout_seconds,
                job.reserved,
                job.created_at.to_rfc3339(),
            ],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn.query(&select_sql("WHERE job_id = ?1"), params![job_id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(map_job(&row)?)),
            None => Ok(None),
        }
    }

    /// Every job persisted as `queued`, oldest first. Used once at
    /// bootstrap to repopulate the in-memory FIFO after a restart — the
    /// queue itself is volatile, but `queued` status in the store is
    /// authoritative, so a fresh process must rebuild it before the
    /// dispatcher can make progress.
    #[instrument(skip(self))]
    pub async fn list_queued_ordered(&self) -> Result<Vec<Job>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(&select_sql("WHERE status = 'queued' ORDER BY created_at ASC"), ())
            .await?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(map_job(&row)?);
        }
        Ok(jobs)
    }

    #[instrument(skip(self))]
    pub async fn assign(&self, job_id: &str, worker_id: &str) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE jobs SET status = 'assigned', assigned_worker_id = ?1, assigned_at = ?2 WHERE job_id = ?3",
            params![worker_id, Utc::now().to_rfc3339(), job_id],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn mark_running(&self, job_id: &str) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE jobs SET status = 'running' WHERE job_id = ?1",
            params![job_id],
        )
        .await?;
        Ok(())
    }

    /// Re-queues a job that was assigned to a worker that vanished
    /// before starting it, or mid-run. Clears the assignment so the
    /// dispatcher can hand it to someone else.
    #[instrument(skip(self))]
    pub async fn requeue(&self, job_id: &str) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE jobs SET status = 'queued', assigned_worker_id = NULL, assigned_at = NULL WHERE job_id = ?1",
            params![job_id],
        )
        .await?;
        Ok(())
    }

    /// Settles a worker's `job_result`: `completed` on exit code 0, else
    /// `failed`, carrying the exit code and captured output either way.
    #[instrument(skip(self, stdout, stderr))]
    pub async fn finish(
        &self,
        job_id: &str,
        exit_code: i32,
        stdout: &str,
        stderr: &str,
    ) -> Result<(), StoreError> {
        let status = if exit_code == 0 { "completed" } else { "failed" };
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE jobs SET status = ?1, completed_at = ?2, exit_code = ?3, stdout = ?4, stderr = ?5 WHERE job_id = ?6",
            params![status, Utc::now().to_rfc3339(), exit_code, stdout, stderr, job_id],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, reason))]
    pub async fn fail(&self, job_id: &str, reason: &str) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE jobs SET status = 'failed', completed_at = ?1, stderr = ?2 WHERE job_id = ?3",
            params![Utc::now().to_rfc3339(), reason, job_id],
        )
        .await?;
        Ok(())
    }

    /// All jobs submitted by a user, most recent first.
    #[instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Job>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                &select_sql("WHERE user_id = ?1 ORDER BY created_at DESC"),
                params![user_id],
            )
            .await?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(map_job(&row)?);
        }
        Ok(jobs)
    }

    /// Jobs in `queued` or `assigned`/`running` state, for the admin
    /// overview's live-activity slice.
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<Job>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                &select_sql("WHERE status IN ('queued', 'assigned', 'running') ORDER BY created_at ASC"),
                (),
            )
            .await?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(map_job(&row)?);
        }
        Ok(jobs)
    }

    /// Most recently completed/failed jobs, bounded by `limit`, for the
    /// admin overview's recent-completion window.
    #[instrument(skip(self))]
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Job>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                &select_sql("WHERE status IN ('completed', 'failed') ORDER BY completed_at DESC LIMIT ?1"),
                params![limit],
            )
            .await?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(map_job(&row)?);
        }
        Ok(jobs)
    }

    /// Jobs currently assigned to or running on `worker_id`, used by the
    /// watchdog when it decides a worker has gone dark.
    #[instrument(skip(self))]
    pub async fn list_in_flight_for_worker(&self, worker_id: &str) -> Result<Vec<Job>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                &select_sql("WHERE assigned_worker_id = ?1 AND status IN ('assigned', 'running')"),
                params![worker_id],
            )
            .await?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(map_job(&row)?);
        }
        Ok(jobs)
    }

    /// Every job in `assigned` or `running` state, regardless of worker.
    /// The watchdog's sweep scans this set each pass rather than walking
    /// the worker table, since a job outlives the worker row either way.
    #[instrument(skip(self))]
    pub async fn list_in_flight(&self) -> Result<Vec<Job>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(&select_sql("WHERE status IN ('assigned', 'running')"), ())
            .await?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(map_job(&row)?);
        }
        Ok(jobs)
    }
}

fn select_sql(tail: &str) -> String {
    format!(
        "SELECT job_id, user_id, source, language, status, assigned_worker_id, timeout_seconds, reserved, created_at, assigned_at, completed_at, stdout, stderr, exit_code
         FROM jobs {tail}"
    )
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Assigned => "assigned",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}

fn parse_status(raw: &str) -> Result<JobStatus, StoreError> {
    match raw {
        "queued" => Ok(JobStatus::Queued),
        "assigned" => Ok(JobStatus::Assigned),
        "running" => Ok(JobStatus::Running),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        other => Err(StoreError::MappingError(format!("unknown job status {other}"))),
    }
}

fn map_job(row: &libsql::Row) -> Result<Job, StoreError> {
    let status_raw: String = row.get(4)?;
    let created_raw: String = row.get(8)?;
    let assigned_raw: Option<String> = row.get(9)?;
    let completed_raw: Option<String> = row.get(10)?;
    Ok(Job {
        job_id: row.get(0)?,
        user_id: row.get(1)?,
        source: row.get(2)?,
        language: row.get(3)?,
        status: parse_status(&status_raw)?,
        assigned_worker_id: row.get(5)?,
        timeout_seconds: row.get::<i64>(6)? as u32,
        reserved: row.get(7)?,
        created_at: created_raw
            .parse()
            .map_err(|e| StoreError::MappingError(format!("bad created_at: {e}")))?,
        assigned_at: assigned_raw
            .map(|s| s.parse())
            .transpose()
            .map_err(|e| StoreError::MappingError(format!("bad assigned_at: {e}")))?,
        completed_at: completed_raw
            .map(|s| s.parse())
            .transpose()
            .map_err(|e| StoreError::MappingError(format!("bad completed_at: {e}")))?,
        stdout: row.get(11)?,
        stderr: row.get(12)?,
        exit_code: row.get::<Option<i64>>(13)?.map(|v| v as i32),
    })
}
