use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that can be returned from handlers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Resource errors
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    // Validation errors (malformed input)
    #[error("Validation error: {0}")]
    Validation(String),

    // Engine errors
    #[error("Unresolved variable: {0}")]
    UnresolvedVariable(String),

    #[error("Circular template reference: {0}")]
    CircularReference(String),

    #[error("Malformed extraction: {0}")]
    MalformedExtraction(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Network-level failure while executing a step. Consumed by the retry
    /// policy; a run records it as step data rather than surfacing it.
    #[error("Transport error: {0}")]
    Transport(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(String),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            // 404 Not Found
            AppError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "Not found", Some(resource.clone()))
            }

            // 409 Conflict
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg.clone())),
            AppError::Constraint(msg) => (
                StatusCode::CONFLICT,
                "Constraint violation",
                Some(msg.clone()),
            ),

            // 400 Bad Request
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "Validation error",
                Some(msg.clone()),
            ),

            // 422 Unprocessable Entity
            AppError::UnresolvedVariable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Unresolved variable",
                Some(msg.clone()),
            ),
            AppError::CircularReference(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Circular template reference",
                Some(msg.clone()),
            ),
            AppError::MalformedExtraction(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Malformed extraction",
                Some(msg.clone()),
            ),

            // 502 Bad Gateway
            AppError::Transport(msg) => {
                (StatusCode::BAD_GATEWAY, "Transport error", Some(msg.clone()))
            }

            // 500 Internal Server Error
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

// Convenient conversions from common error types

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::RecordNotFound(_) => AppError::NotFound("Resource".to_string()),
            sea_orm::DbErr::RecordNotInserted => {
                AppError::Conflict("Record already exists".to_string())
            }
            sea_orm::DbErr::RecordNotUpdated => AppError::NotFound("Resource".to_string()),
            _ => AppError::Database(err.to_string()),
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
