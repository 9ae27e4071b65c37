//! Domain error types.

use thiserror::Error;

use crate::ids::{ConnectionId, SessionId};

/// Top-level domain error type.
///
/// Every variant is reported to the single connection that issued the
/// failing command. None of them leave a session partially mutated.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The referenced session has no live record.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// A join was attempted on a session that already has two participants.
    #[error("session {0} already has two participants")]
    SessionFull(SessionId),

    /// The connection is not registered as a participant of the session.
    #[error("connection {connection_id} is not a participant of session {session_id}")]
    NotAParticipant {
        /// The session that was addressed.
        session_id: SessionId,
        /// The offending connection.
        connection_id: ConnectionId,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure error (for example id allocation exhaustion).
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Machine-readable error code sent to clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionFull(_) => "session_full",
            Self::NotAParticipant { .. } => "not_a_participant",
            Self::Validation(_) => "validation_error",
            Self::Infrastructure(_) => "infrastructure_error",
        }
    }
}
