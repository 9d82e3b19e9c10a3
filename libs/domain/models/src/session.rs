use serde::{Deserialize, Serialize};

/// Advertised worker capability record. Unknown fields are ignored by serde's
/// default behavior; `can_execute` defaults to `true` when absent.
fn default_can_execute() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub cpu_cores: u32,
    #[serde(default)]
    pub gpu: bool,
    #[serde(default = "default_can_execute")]
    pub can_execute: bool,
}

/// The closed set of frames exchanged on a worker session.
///
/// Unknown discriminants fail to deserialize rather than being silently
/// accepted — callers see a protocol fault and drop the frame per the
/// error taxonomy's "unparseable frame" case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMessage {
    Hello {
        worker_id: String,
        owner_id: Option<String>,
        auth_token: Option<String>,
        capabilities: Capabilities,
    },
    HelloAck {
        worker_id: String,
    },
    AuthError {
        reason: String,
    },
    Hb,
    AssignJob {
        job_id: String,
        language: String,
        source: String,
        timeout_seconds: u32,
    },
    JobStarted {
        job_id: String,
    },
    JobLog {
        job_id: String,
        line: String,
    },
    JobResult {
        job_id: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
        #[serde(default)]
        duration_seconds: Option<f64>,
    },
}
