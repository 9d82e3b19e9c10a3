use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Restriction {
    None,
    Suspended,
    Banned,
}

impl Restriction {
    pub fn is_restricted(self) -> bool {
        !matches!(self, Restriction::None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub worker_id: String,
    pub owner_id: String,
    pub auth_token: String,
    pub cpu_cores: u32,
    pub gpu: bool,
    pub can_execute: bool,
    pub ip: Option<String>,
    pub status: WorkerStatus,
    pub restriction: Restriction,
    pub last_heartbeat: DateTime<Utc>,
}
