use crate::handlers::{admin, http, session};
use crate::state::AppState;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Maximum size of a single HTTP submission body. The session transport
/// enforces its own 10 MiB frame limit independently in `session.rs`.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Assembles the coordinator's full HTTP + WebSocket surface: the
/// client-facing submission API, the admin API, and the worker session
/// endpoint.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    let client_api = Router::new()
        .route("/jobs", post(http::submit_job))
        .route("/jobs/:job_id", get(http::get_job))
        .route("/users/:user_id/jobs", get(http::list_jobs_for_user))
        .route("/users/:user_id/balance", get(http::get_balance))
        .route("/workers", get(http::list_workers));

    let admin_api = Router::new()
        .route("/overview", get(admin::overview))
        .route("/workers/:worker_id/disconnect", post(admin::disconnect_worker))
        .route("/workers/:worker_id/ban", post(admin::ban_worker))
        .route("/workers/:worker_id/suspend", post(admin::suspend_worker))
        .route("/workers/:worker_id/unsuspend", post(admin::unsuspend_worker))
        .route("/broadcast", post(admin::broadcast));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ws/worker", get(session::upgrade))
        .nest("/api/v1", client_api)
        .nest("/api/v1/admin", admin_api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
