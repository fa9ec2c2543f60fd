//! Error types for the Amana server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Equipment cannot be lent right now (already on loan or in maintenance)
    #[error("Equipment unavailable: {0}")]
    EquipmentUnavailable(String),

    /// Loan state machine rejected the transition (already returned/cancelled)
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Delete not allowed: {0}")]
    DeleteNotAllowed(String),

    /// Loan and equipment state disagree. Never auto-corrected: an
    /// auto-fix would mask the data-integrity bug that caused it.
    #[error("Consistency violation: {0}")]
    Consistency(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind, used in the response body and in
    /// per-item bulk results.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Authentication(_) => "authentication",
            AppError::Authorization(_) => "authorization",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::EquipmentUnavailable(_) => "equipment_unavailable",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::DeleteNotAllowed(_) => "delete_not_allowed",
            AppError::Consistency(_) => "consistency",
            AppError::Database(_) => "database",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::EquipmentUnavailable(_)
            | AppError::InvalidTransition(_)
            | AppError::DeleteNotAllowed(_) => StatusCode::CONFLICT,
            AppError::Consistency(msg) => {
                tracing::error!("Consistency violation: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            // Do not leak driver details to clients
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: self.kind().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
