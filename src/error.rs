use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::draft::DraftError;
use crate::store::StoreError;

/// Request-level failures.
///
/// Key absence is never one of these: the store layer normalizes missing
/// sub-records to defaults, so "not found" here always means a directory
/// lookup came up empty, not a missing key.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("no token provided")]
    NoToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid account or password")]
    BadCredentials,
    #[error("insufficient privileges")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Storage(err) => {
                tracing::error!("storage failure: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "result": false, "error": "Internal Server Error" })),
                )
                    .into_response()
            }
            AppError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "result": false, "error": "Internal Server Error" })),
                )
                    .into_response()
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{what} not found") })),
            )
                .into_response(),
            AppError::NoToken => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "no token provided" })),
            )
                .into_response(),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid or expired token" })),
            )
                .into_response(),
            AppError::BadCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "invalid account or password" })),
            )
                .into_response(),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "insufficient privileges" })),
            )
                .into_response(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
