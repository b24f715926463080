use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BilldeskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BilldeskError {
    /// True when the database rejected a write because of a UNIQUE, FOREIGN KEY,
    /// NOT NULL or CHECK constraint.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            BilldeskError::Database(sqlx::Error::Database(db_err)) => {
                !matches!(db_err.kind(), ErrorKind::Other)
            }
            _ => false,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            BilldeskError::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.kind(), ErrorKind::UniqueViolation)
            }
            _ => false,
        }
    }
}

pub type BilldeskResult<T> = Result<T, BilldeskError>;

impl IntoResponse for BilldeskError {
    fn into_response(self) -> Response {
        if self.is_constraint_violation() {
            let details = self.to_string();
            tracing::warn!("Constraint violation: {}", details);
            let body = Json(json!({
                "error": "Database constraint violation",
                "details": details,
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let (status, error_message) = match self {
            BilldeskError::Database(sqlx::Error::RowNotFound) => {
                (StatusCode::NOT_FOUND, "Record not found".to_string())
            }
            BilldeskError::Database(ref e) => {
                tracing::error!("Database Error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            BilldeskError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            BilldeskError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            BilldeskError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            BilldeskError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            BilldeskError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            BilldeskError::Internal(msg) => {
                tracing::error!("Internal Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            _ => {
                tracing::error!("Unhandled Error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
