use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::web::models::ErrorResponse;

/// Error type shared by services and handlers
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected by a validation rule; the message is shown to the user as is
    #[error("{0}")]
    ValidationError(String),
    /// Requested record does not exist or is not visible to the caller
    #[error("{0}")]
    NotFound(String),
    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),
    /// Uniqueness or state conflict
    #[error("{0}")]
    Conflict(String),
    /// Caller exceeded a rate limit
    #[error("{0}")]
    TooManyRequests(String),
    /// Filesystem failure while storing uploads
    #[error("storage error: {0}")]
    Storage(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Storage(_) | ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorResponse { error: message })
    }
}

/// True when the error is a UNIQUE constraint failure
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// True when the error is a FOREIGN KEY constraint failure
pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Map constraint failures on a write into user-facing conflicts
pub fn map_constraint(err: rusqlite::Error, unique_message: &str) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::conflict(unique_message)
    } else if is_foreign_key_violation(&err) {
        ServiceError::conflict("record is still referenced by other data")
    } else {
        ServiceError::Database(err)
    }
}
