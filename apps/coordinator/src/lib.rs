//! Control-plane library for the Grid-X coordinator.
//!
//! The binary in `main.rs` is a thin shell: it wires a [`state::AppState`]
//! from configuration and a durable store, then hands the shared state to
//! [`routes::build_router`] and the background services in [`services`].
//! Everything that matters — the session protocol, the dispatcher, the
//! watchdog, the HTTP surface — lives here so it can be driven directly
//! from integration tests without going through `main`.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;

pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::routes::build_router;
    pub use crate::state::AppState;
}
