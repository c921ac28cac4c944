//! Error types for the discovery service.
//!
//! All errors implement `ResponseError` for Actix-web integration, converting
//! format, authentication and ownership failures into distinct HTTP statuses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::auth::AuthError;

/// Service error type with structured error responses.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    // Format errors
    #[error("payload must be a valid json")]
    InvalidPayload,

    #[error("{0}")]
    InvalidInput(String),

    // Authentication errors
    #[error(transparent)]
    Unauthenticated(#[from] AuthError),

    // Authorization errors
    #[error("provider_id does not match current identity")]
    IdentityMismatch,

    #[error("session identity does not match current one")]
    OwnershipMismatch,

    #[error("identity already exists")]
    AlreadyClaimed,

    // Domain validation errors
    #[error("{field} should not be negative")]
    InvalidCounter { field: &'static str },

    #[error("node key not found")]
    UnknownNode,

    // Routing errors
    #[error("unknown API method")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl DiscoveryError {
    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidPayload => Some("INVALID_PAYLOAD"),
            Self::InvalidInput(_) => Some("INVALID_INPUT"),
            Self::Unauthenticated(_) => Some("UNAUTHENTICATED"),
            Self::IdentityMismatch => Some("IDENTITY_MISMATCH"),
            Self::OwnershipMismatch => Some("OWNERSHIP_MISMATCH"),
            Self::AlreadyClaimed => Some("ALREADY_CLAIMED"),
            Self::InvalidCounter { .. } => Some("INVALID_COUNTER"),
            Self::UnknownNode => Some("UNKNOWN_NODE"),
            Self::NotFound => Some("NOT_FOUND"),
            Self::MethodNotAllowed => Some("METHOD_NOT_ALLOWED"),
            Self::Storage(_) => Some("STORAGE_ERROR"),
            Self::Internal(_) => None,
        }
    }
}

impl ResponseError for DiscoveryError {
    fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request - caller input is invalid
            Self::InvalidPayload
            | Self::InvalidInput(_)
            | Self::InvalidCounter { .. }
            | Self::UnknownNode => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,

            // 403 Forbidden - identity boundary violations
            Self::IdentityMismatch | Self::OwnershipMismatch | Self::AlreadyClaimed => {
                StatusCode::FORBIDDEN
            }

            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,

            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = ?self, "Request failed with internal error");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.error_code().map(String::from),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

// Conversion from common error types

impl From<std::io::Error> for DiscoveryError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("record encoding: {err}"))
    }
}

impl From<redb::Error> for DiscoveryError {
    fn from(err: redb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::DatabaseError> for DiscoveryError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::TableError> for DiscoveryError {
    fn from(err: redb::TableError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::TransactionError> for DiscoveryError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::CommitError> for DiscoveryError {
    fn from(err: redb::CommitError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<redb::StorageError> for DiscoveryError {
    fn from(err: redb::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<actix_web::error::BlockingError> for DiscoveryError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
