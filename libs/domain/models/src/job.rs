use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Assigned,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub user_id: String,
    pub source: String,
    pub language: String,
    pub status: JobStatus,
    pub assigned_worker_id: Option<String>,
    pub timeout_seconds: u32,
    pub reserved: f64,
    pub created_at: DateTime<Utc>,
    /// Set when the dispatcher assigns this job to a worker; the
    /// settlement fallback measures elapsed time from here when a
    /// `job_result` omits its own `duration_seconds`.
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
}
