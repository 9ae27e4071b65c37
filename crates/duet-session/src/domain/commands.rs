//! Commands for the session context.

use duet_core::command::Command;
use duet_core::ids::{ConnectionId, SessionId};
use uuid::Uuid;

/// Command to open a new session with the issuer as its first participant.
#[derive(Debug, Clone)]
pub struct CreateSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The requesting connection.
    pub connection_id: ConnectionId,
    /// Display name of the requester.
    pub display_name: String,
}

impl Command for CreateSession {
    fn command_type(&self) -> &'static str {
        "session.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> ConnectionId {
        self.connection_id
    }
}

/// Command to take the second seat of an existing session.
#[derive(Debug, Clone)]
pub struct JoinSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The requesting connection.
    pub connection_id: ConnectionId,
    /// The session to join.
    pub session_id: SessionId,
    /// Display name of the requester.
    pub display_name: String,
}

impl Command for JoinSession {
    fn command_type(&self) -> &'static str {
        "session.join"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> ConnectionId {
        self.connection_id
    }
}

/// Command to record an answer for the current question.
#[derive(Debug, Clone)]
pub struct SubmitAnswer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The answering connection.
    pub connection_id: ConnectionId,
    /// The session being answered in.
    pub session_id: SessionId,
    /// The answer text.
    pub answer: String,
}

impl Command for SubmitAnswer {
    fn command_type(&self) -> &'static str {
        "session.submit_answer"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> ConnectionId {
        self.connection_id
    }
}

/// Command to move the session to its next question.
#[derive(Debug, Clone)]
pub struct AdvanceQuestion {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The requesting connection.
    pub connection_id: ConnectionId,
    /// The session to advance.
    pub session_id: SessionId,
}

impl Command for AdvanceQuestion {
    fn command_type(&self) -> &'static str {
        "session.advance_question"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> ConnectionId {
        self.connection_id
    }
}

/// Command raised by the transport when a connection goes away.
#[derive(Debug, Clone)]
pub struct Disconnect {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The connection that went away.
    pub connection_id: ConnectionId,
}

impl Command for Disconnect {
    fn command_type(&self) -> &'static str {
        "session.disconnect"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn issued_by(&self) -> ConnectionId {
        self.connection_id
    }
}
