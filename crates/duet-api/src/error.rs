//! Duet API: error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use duet_content::ContentError;
use duet_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

use crate::gateway::protocol::ServerMessage;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The question bank could not be loaded.
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// The session coordinator task has stopped and no longer accepts events.
#[derive(Debug, Error)]
#[error("session coordinator is no longer running")]
pub struct CoordinatorGone;

/// JSON body returned for HTTP error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Wrapper around `DomainError`. Over the socket it becomes a
/// `sessionError` frame for the offending connection; over HTTP it becomes
/// an error response.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl From<ApiError> for ServerMessage {
    fn from(err: ApiError) -> Self {
        ServerMessage::SessionError {
            code: err.0.code().to_owned(),
            message: err.0.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::SessionFull(_) => StatusCode::CONFLICT,
            DomainError::NotAParticipant { .. } => StatusCode::FORBIDDEN,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
