use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gridx_infra_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Application-facing error taxonomy. Every HTTP handler returns this (or
/// a `Result<_, AppError>`) instead of leaking a store or protocol error
/// across the wire.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("insufficient credit: required {required}, available {available}")]
    InsufficientCredit { required: f64, available: f64 },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InsufficientCredit { .. } => (StatusCode::PAYMENT_REQUIRED, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Store(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
