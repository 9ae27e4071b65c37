//! Domain events for the session context.
//!
//! Each event records which connections must hear about it. Recipients are
//! resolved from the roster at the moment the event is recorded, so a
//! broadcast always reaches every registered participant, sender included.

use duet_core::event::{DomainEvent, EventMetadata};
use duet_core::ids::{ConnectionId, SessionId};
use duet_core::question::Question;
use serde::{Deserialize, Serialize};

/// One seat of the roster as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    /// The participant's connection handle.
    pub connection_id: ConnectionId,
    /// Informational display name.
    pub display_name: String,
}

/// A submitted answer paired with its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerView {
    /// The connection that submitted the answer.
    pub connection_id: ConnectionId,
    /// The answer text.
    pub answer: String,
    /// Display name of the author when the answer set was emitted.
    pub display_name: String,
}

/// Answers collected for one question before the cursor moved on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRound {
    /// Cursor value of the question.
    pub question_index: usize,
    /// Answers recorded at the time of the advance, in roster order.
    pub answers: Vec<AnswerView>,
}

/// Why a session record was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The last participant disconnected.
    LastParticipantLeft,
    /// No activity within the configured idle timeout.
    IdleTimeout,
}

impl CloseReason {
    /// Wire representation of the reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LastParticipantLeft => "last_participant_left",
            Self::IdleTimeout => "idle_timeout",
        }
    }
}

/// Emitted to the creator once a session exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    /// The creating connection.
    pub creator: ConnectionId,
    /// The creator's display name.
    pub display_name: String,
}

/// Emitted whenever the participant set changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterChanged {
    /// Participants in join order.
    pub participants: Vec<ParticipantView>,
}

/// Delivers the question sequence and the current cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPresented {
    /// The full, fixed question sequence.
    pub questions: Vec<Question>,
    /// Index of the active question.
    pub cursor: usize,
}

/// Emitted once every registered participant has answered the current
/// question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllAnswered {
    /// Index of the answered question.
    pub cursor: usize,
    /// The collected answers, in roster order.
    pub answers: Vec<AnswerView>,
}

/// Emitted when the cursor moves past the last question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsExhausted {
    /// Length of the question sequence.
    pub total_questions: usize,
    /// Answer sets of every completed round.
    pub history: Vec<CompletedRound>,
}

/// Emitted when the session record is destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClosed {
    /// Why the session went away.
    pub reason: CloseReason,
}

/// Event type identifier for [`SessionCreated`].
pub const SESSION_CREATED_EVENT_TYPE: &str = "session.created";

/// Event type identifier for [`RosterChanged`].
pub const ROSTER_CHANGED_EVENT_TYPE: &str = "session.roster_changed";

/// Event type identifier for [`QuestionPresented`].
pub const QUESTION_PRESENTED_EVENT_TYPE: &str = "session.question_presented";

/// Event type identifier for [`AllAnswered`].
pub const ALL_ANSWERED_EVENT_TYPE: &str = "session.all_answered";

/// Event type identifier for [`QuestionsExhausted`].
pub const QUESTIONS_EXHAUSTED_EVENT_TYPE: &str = "session.questions_exhausted";

/// Event type identifier for [`SessionClosed`].
pub const SESSION_CLOSED_EVENT_TYPE: &str = "session.closed";

/// Event payload variants for the session context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEventKind {
    /// A session was created.
    SessionCreated(SessionCreated),
    /// The roster changed.
    RosterChanged(RosterChanged),
    /// A question state must be shown.
    QuestionPresented(QuestionPresented),
    /// All participants answered.
    AllAnswered(AllAnswered),
    /// No question is left.
    QuestionsExhausted(QuestionsExhausted),
    /// The session was destroyed.
    SessionClosed(SessionClosed),
}

impl SessionEventKind {
    /// Event type name of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionCreated(_) => SESSION_CREATED_EVENT_TYPE,
            Self::RosterChanged(_) => ROSTER_CHANGED_EVENT_TYPE,
            Self::QuestionPresented(_) => QUESTION_PRESENTED_EVENT_TYPE,
            Self::AllAnswered(_) => ALL_ANSWERED_EVENT_TYPE,
            Self::QuestionsExhausted(_) => QUESTIONS_EXHAUSTED_EVENT_TYPE,
            Self::SessionClosed(_) => SESSION_CLOSED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the session context.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Connections the event is addressed to.
    pub recipients: Vec<ConnectionId>,
    /// Event-specific payload.
    pub kind: SessionEventKind,
}

impl SessionEvent {
    /// The session the event belongs to.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.metadata.session_id
    }
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn recipients(&self) -> &[ConnectionId] {
        &self.recipients
    }
}
