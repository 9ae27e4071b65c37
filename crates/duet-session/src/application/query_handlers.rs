//! Read-only views over live sessions.

use duet_core::error::DomainError;
use duet_core::ids::{ConnectionId, SessionId};
use serde::Serialize;

use crate::application::store::SessionStore;
use crate::domain::aggregates::RoundPhase;
use crate::domain::events::ParticipantView;

/// Snapshot of a session's coordination state.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// The session identifier.
    pub session_id: SessionId,
    /// Seated participants in join order.
    pub participants: Vec<ParticipantView>,
    /// Index of the active question.
    pub cursor: usize,
    /// Length of the question sequence.
    pub total_questions: usize,
    /// Current per-question phase.
    pub phase: &'static str,
    /// Connections that already answered the current question.
    pub answered: Vec<ConnectionId>,
}

/// Builds a [`SessionView`] for `session_id`.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if no live session matches.
pub fn get_session_view(
    store: &SessionStore,
    session_id: &SessionId,
) -> Result<SessionView, DomainError> {
    let session = store
        .get(session_id)
        .ok_or_else(|| DomainError::SessionNotFound(session_id.clone()))?;

    let participants = session
        .participants()
        .iter()
        .map(|p| ParticipantView {
            connection_id: p.connection_id,
            display_name: p.display_name.clone(),
        })
        .collect();
    let answered = session
        .participants()
        .iter()
        .map(|p| p.connection_id)
        .filter(|c| session.answer_of(*c).is_some())
        .collect();
    let phase = match session.phase() {
        RoundPhase::AwaitingAnswers => "awaiting_answers",
        RoundPhase::AllAnswered => "all_answered",
        RoundPhase::Exhausted => "exhausted",
    };

    Ok(SessionView {
        session_id: session_id.clone(),
        participants,
        cursor: session.cursor(),
        total_questions: session.questions().len(),
        phase,
        answered,
    })
}
