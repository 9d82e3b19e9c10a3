//! WebSocket worker-session test harness.
//!
//! Drives a coordinator's session endpoint as a real worker would —
//! send `hello`, read `hello_ack`, answer `assign_job` with
//! `job_started`/`job_result` — without pulling in a full worker
//! runtime. Exists for integration tests exercising the session
//! protocol end to end.

pub mod client;
pub mod errors;

pub use client::WorkerSessionClient;
pub use errors::ClientError;
