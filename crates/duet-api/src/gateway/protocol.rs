//! JSON wire protocol spoken over the WebSocket.
//!
//! Frames are tagged by a `type` field and use camelCase names, matching
//! what the browser client already sends and listens for.

use duet_core::ids::{ConnectionId, SessionId};
use duet_core::question::Question;
use duet_session::domain::events::{AnswerView, CompletedRound, ParticipantView, SessionEvent, SessionEventKind};
use serde::{Deserialize, Serialize};

/// Requests a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Open a new session.
    CreateSession {
        /// Display name of the requester.
        player_name: String,
    },
    /// Join an existing session.
    JoinSession {
        /// Session to join.
        session_id: SessionId,
        /// Display name of the requester.
        player_name: String,
    },
    /// Answer the current question.
    SubmitAnswer {
        /// Session being answered in.
        session_id: SessionId,
        /// The answer text.
        answer: String,
    },
    /// Move the session to its next question.
    #[serde(alias = "advanceQuestion")]
    NextQuestion {
        /// Session to advance.
        session_id: SessionId,
    },
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    /// Connection handle of the participant.
    pub connection_id: ConnectionId,
    /// Display name.
    pub player_name: String,
}

/// One answer of an answer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    /// Author connection.
    pub connection_id: ConnectionId,
    /// The answer text.
    pub answer: String,
    /// Author display name.
    pub player_name: String,
}

/// Answers of a question already advanced past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEntry {
    /// Index of the question.
    pub question_index: usize,
    /// Answers given.
    pub answers: Vec<AnswerEntry>,
}

/// Frames the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// The requester's new session token.
    SessionCreated {
        /// The new session.
        session_id: SessionId,
    },
    /// Current roster.
    PlayerJoined {
        /// The session.
        session_id: SessionId,
        /// Participants in join order.
        players: Vec<PlayerEntry>,
    },
    /// Question sequence and cursor.
    LoadQuestion {
        /// The session.
        session_id: SessionId,
        /// Full question sequence.
        questions: Vec<Question>,
        /// Active question index.
        current_question: usize,
        /// Sequence length.
        total_questions: usize,
    },
    /// Every participant answered the current question.
    AllAnswered {
        /// The session.
        session_id: SessionId,
        /// Answered question index.
        current_question: usize,
        /// The answer set.
        answers: Vec<AnswerEntry>,
    },
    /// No question left; clients show results.
    QuestionsExhausted {
        /// The session.
        session_id: SessionId,
        /// Sequence length.
        total_questions: usize,
        /// Answers per completed question.
        history: Vec<RoundEntry>,
    },
    /// The session no longer exists.
    SessionClosed {
        /// The session.
        session_id: SessionId,
        /// Machine-readable reason.
        reason: String,
    },
    /// A request failed. Only ever sent to the requester.
    SessionError {
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl ServerMessage {
    /// Error frame for an unparseable client frame.
    #[must_use]
    pub fn parse_error(err: &serde_json::Error) -> Self {
        Self::SessionError {
            code: "parse_error".to_owned(),
            message: err.to_string(),
        }
    }
}

impl From<&ParticipantView> for PlayerEntry {
    fn from(view: &ParticipantView) -> Self {
        Self {
            connection_id: view.connection_id,
            player_name: view.display_name.clone(),
        }
    }
}

impl From<&AnswerView> for AnswerEntry {
    fn from(view: &AnswerView) -> Self {
        Self {
            connection_id: view.connection_id,
            answer: view.answer.clone(),
            player_name: view.display_name.clone(),
        }
    }
}

impl From<&CompletedRound> for RoundEntry {
    fn from(round: &CompletedRound) -> Self {
        Self {
            question_index: round.question_index,
            answers: round.answers.iter().map(AnswerEntry::from).collect(),
        }
    }
}

/// Translates a domain event into the frame its recipients receive.
#[must_use]
pub fn server_message_for(event: &SessionEvent) -> ServerMessage {
    let session_id = event.session_id().clone();
    match &event.kind {
        SessionEventKind::SessionCreated(_) => ServerMessage::SessionCreated { session_id },
        SessionEventKind::RosterChanged(roster) => ServerMessage::PlayerJoined {
            session_id,
            players: roster.participants.iter().map(PlayerEntry::from).collect(),
        },
        SessionEventKind::QuestionPresented(presented) => ServerMessage::LoadQuestion {
            session_id,
            total_questions: presented.questions.len(),
            questions: presented.questions.clone(),
            current_question: presented.cursor,
        },
        SessionEventKind::AllAnswered(all) => ServerMessage::AllAnswered {
            session_id,
            current_question: all.cursor,
            answers: all.answers.iter().map(AnswerEntry::from).collect(),
        },
        SessionEventKind::QuestionsExhausted(done) => ServerMessage::QuestionsExhausted {
            session_id,
            total_questions: done.total_questions,
            history: done.history.iter().map(RoundEntry::from).collect(),
        },
        SessionEventKind::SessionClosed(closed) => ServerMessage::SessionClosed {
            session_id,
            reason: closed.reason.as_str().to_owned(),
        },
    }
}
