//! Unified error handling for the admin API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::credentials::CredentialError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Content store call failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Operation not allowed in the session's current state.
    #[error("{0}")]
    InvalidState(String),

    /// No credential has been supplied yet.
    #[error("No credential set; PUT /api/credential first")]
    NoCredential,

    /// Credential backend failed.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Store(err) => Self::Store(err),
            err @ SessionError::InvalidState { .. } => Self::InvalidState(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    /// Stable machine-readable kind, used as `error` in the response body.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Store(StoreError::Unauthorized(_)) | Self::NoCredential => "unauthorized",
            Self::Store(StoreError::NotFound(_)) | Self::NotFound(_) => "not_found",
            Self::Store(StoreError::CorruptDocument(_)) => "corrupt_document",
            Self::Store(StoreError::Schema(_)) => "schema",
            Self::Store(StoreError::Conflict(_)) => "conflict",
            Self::Store(StoreError::Transport(_)) => "transport",
            Self::InvalidState(_) => "invalid_state",
            Self::BadRequest(_) => "bad_request",
            Self::Credential(_) | Self::Internal(_) => "internal",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Unauthorized(_)) | Self::NoCredential => StatusCode::UNAUTHORIZED,
            Self::Store(StoreError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Conflict(_)) | Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::Store(
                StoreError::CorruptDocument(_) | StoreError::Schema(_) | StoreError::Transport(_),
            ) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Credential(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server-side and upstream failures with Sentry
        if matches!(
            self,
            Self::Store(
                StoreError::Transport(_) | StoreError::CorruptDocument(_) | StoreError::Schema(_)
            ) | Self::Credential(_)
                | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Credential(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Store(StoreError::Transport(_)) => "Content store unreachable".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}
