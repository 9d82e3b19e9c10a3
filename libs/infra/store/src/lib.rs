//! libSQL-backed durable store.
//!
//! `StoreClient` owns the database handle; everything else is a thin
//! repository wrapping it with entity-shaped queries. No caller outside
//! this crate touches a `libsql::Connection` directly.

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::StoreClient;
pub use errors::StoreError;
pub use repositories::{CreditsRepository, JobsRepository, UsersRepository, WorkersRepository};
