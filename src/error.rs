//! Error taxonomy for the HTTP surface.
//!
//! Every handler returns `ApiError` on failure. Business failures carry a
//! human-readable message; internal failures are logged and surfaced as a
//! generic 500 without detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::checkout::CheckoutError;
use crate::domain::value_objects::SkuError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("missing or invalid user identity")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return Self::NotFound("resource not found".to_string());
        }
        if let Some(db) = err.as_database_error() {
            match db.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    return Self::InvalidState("a record with the same unique value already exists".to_string());
                }
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    return Self::InvalidState("operation conflicts with existing related records".to_string());
                }
                sqlx::error::ErrorKind::CheckViolation => {
                    return Self::InvalidState("operation violates a data constraint".to_string());
                }
                _ => {}
            }
        }
        Self::Internal(err.into())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        Self::InvalidState(err.to_string())
    }
}

impl From<SkuError> for ApiError {
    fn from(err: SkuError) -> Self {
        Self::InvalidState(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::InvalidState(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidState(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "error while processing the request".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
