//! Shared domain entities and wire-message types.
//!
//! Nothing in this crate touches a store or a socket; it exists so the
//! coordinator binary and the worker-side test client agree on field
//! names and serialization without depending on each other.

pub mod job;
pub mod session;
pub mod user;
pub mod worker;

pub use job::{Job, JobStatus};
pub use session::{Capabilities, SessionMessage};
pub use user::User;
pub use worker::{Restriction, Worker, WorkerStatus};
