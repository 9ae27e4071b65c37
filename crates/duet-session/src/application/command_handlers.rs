//! Command handlers for the session context.
//!
//! Each handler validates against the store, runs the command on the
//! aggregate and drains the events it produced. Validation always happens
//! before any mutation, so a failed command leaves the store untouched.

use chrono::TimeDelta;
use duet_core::aggregate::AggregateRoot;
use duet_core::clock::Clock;
use duet_core::command::Command;
use duet_core::error::DomainError;
use duet_core::ids::SessionId;
use duet_core::question::QuestionProvider;
use duet_core::rng::DeterministicRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::store::SessionStore;
use crate::config::SessionConfig;
use crate::domain::aggregates::{Session, SubmissionOutcome, normalize_display_name};
use crate::domain::commands::{AdvanceQuestion, CreateSession, Disconnect, JoinSession, SubmitAnswer};
use crate::domain::events::{CloseReason, SessionEvent};

/// Attempts made to find an unused session token before giving up.
pub const MAX_ID_ATTEMPTS: usize = 16;

const SESSION_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct SessionCommandResult {
    /// The session affected or created by the command.
    pub session_id: SessionId,
    /// Events produced, each carrying its recipients.
    pub events: Vec<SessionEvent>,
}

/// Draws a token of `length` characters from `[a-z0-9]`.
#[allow(clippy::cast_possible_truncation)]
pub fn generate_session_id(rng: &mut dyn DeterministicRng, length: usize) -> SessionId {
    let last = (SESSION_ID_ALPHABET.len() - 1) as u32;
    let token: String = (0..length)
        .map(|_| char::from(SESSION_ID_ALPHABET[rng.next_u32_range(0, last) as usize]))
        .collect();
    SessionId::new(token)
}

/// Finds a token no live session uses, regenerating on collision.
fn allocate_session_id(
    store: &SessionStore,
    rng: &mut dyn DeterministicRng,
    length: usize,
) -> Result<SessionId, DomainError> {
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let candidate = generate_session_id(rng, length);
        if !store.contains(&candidate) {
            return Ok(candidate);
        }
        warn!(attempt, "session id collision, regenerating");
    }
    Err(DomainError::Infrastructure(format!(
        "no free session id after {MAX_ID_ATTEMPTS} attempts"
    )))
}

/// Handles `CreateSession`: allocates a token, draws the question sequence
/// and seats the requester.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a blank display name and
/// `DomainError::Infrastructure` if no free token could be found.
#[instrument(skip_all, fields(command = command.command_type(), connection_id = %command.issued_by()))]
pub fn handle_create_session(
    command: &CreateSession,
    config: &SessionConfig,
    store: &mut SessionStore,
    provider: &dyn QuestionProvider,
    rng: &mut dyn DeterministicRng,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    let display_name = normalize_display_name(&command.display_name)?;
    let session_id = allocate_session_id(store, rng, config.session_id_length)?;
    let questions = provider.select_questions(config.questions_per_session, rng);

    let mut session = Session::start(
        session_id.clone(),
        command.connection_id,
        display_name,
        questions,
        command.correlation_id,
        clock,
    );
    let events = session.take_uncommitted_events();
    let question_count = session.questions().len();
    store.insert(session)?;

    info!(
        correlation_id = %command.correlation_id,
        session_id = %session_id,
        question_count,
        "session created"
    );

    Ok(SessionCommandResult { session_id, events })
}

/// Handles `JoinSession`.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound`, `DomainError::SessionFull` or
/// `DomainError::Validation`.
#[instrument(skip_all, fields(command = command.command_type(), connection_id = %command.issued_by(), session_id = %command.session_id))]
pub fn handle_join_session(
    command: &JoinSession,
    store: &mut SessionStore,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    let session = store.get_mut(&command.session_id)?;
    let outcome = session.join(
        command.connection_id,
        &command.display_name,
        command.correlation_id,
        clock,
    )?;
    let events = session.take_uncommitted_events();
    let participants = session.participants().len();
    store.register(command.connection_id, &command.session_id);

    info!(
        correlation_id = %command.correlation_id,
        ?outcome,
        participants,
        "participant joined"
    );

    Ok(SessionCommandResult {
        session_id: command.session_id.clone(),
        events,
    })
}

/// Handles `SubmitAnswer`. The "all answered" check runs synchronously as
/// part of the submission.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound`, `DomainError::NotAParticipant`
/// or `DomainError::Validation`.
#[instrument(skip_all, fields(command = command.command_type(), connection_id = %command.issued_by(), session_id = %command.session_id))]
pub fn handle_submit_answer(
    command: &SubmitAnswer,
    store: &mut SessionStore,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    let session = store.get_mut(&command.session_id)?;
    let outcome = session.submit_answer(
        command.connection_id,
        &command.answer,
        command.correlation_id,
        clock,
    )?;
    let cursor = session.cursor();
    let events = session.take_uncommitted_events();

    if outcome == SubmissionOutcome::Completed {
        info!(correlation_id = %command.correlation_id, cursor, "all participants answered");
    } else {
        debug!(correlation_id = %command.correlation_id, cursor, ?outcome, "answer recorded");
    }

    Ok(SessionCommandResult {
        session_id: command.session_id.clone(),
        events,
    })
}

/// Handles `AdvanceQuestion`.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the session does not exist.
#[instrument(skip_all, fields(command = command.command_type(), connection_id = %command.issued_by(), session_id = %command.session_id))]
pub fn handle_advance_question(
    command: &AdvanceQuestion,
    store: &mut SessionStore,
    clock: &dyn Clock,
) -> Result<SessionCommandResult, DomainError> {
    let session = store.get_mut(&command.session_id)?;
    let outcome = session.advance(command.correlation_id, clock);
    let events = session.take_uncommitted_events();

    info!(correlation_id = %command.correlation_id, ?outcome, "question advanced");

    Ok(SessionCommandResult {
        session_id: command.session_id.clone(),
        events,
    })
}

/// Handles `Disconnect`: frees the connection's seat in every session it
/// occupies and destroys sessions left empty. Unknown connections are a
/// no-op, so calling this twice is the same as calling it once.
#[instrument(skip_all, fields(command = command.command_type(), connection_id = %command.issued_by()))]
pub fn handle_disconnect(
    command: &Disconnect,
    store: &mut SessionStore,
    clock: &dyn Clock,
) -> Vec<SessionCommandResult> {
    let mut results = Vec::new();

    for session_id in store.take_memberships(command.connection_id) {
        let Ok(session) = store.get_mut(&session_id) else {
            continue;
        };
        if !session.remove_participant(command.connection_id, command.correlation_id, clock) {
            continue;
        }
        let events = session.take_uncommitted_events();
        let remaining = session.participants().len();

        if remaining == 0 {
            store.remove(&session_id);
            info!(correlation_id = %command.correlation_id, session_id = %session_id, "session destroyed");
        } else {
            info!(correlation_id = %command.correlation_id, session_id = %session_id, remaining, "participant left");
        }

        results.push(SessionCommandResult { session_id, events });
    }

    results
}

/// Closes every session idle for at least `idle_timeout`, telling its
/// participants why.
#[instrument(skip_all)]
pub fn handle_reap_idle_sessions(
    correlation_id: Uuid,
    idle_timeout: TimeDelta,
    store: &mut SessionStore,
    clock: &dyn Clock,
) -> Vec<SessionCommandResult> {
    let idle: Vec<SessionId> = store
        .sessions()
        .filter(|session| session.is_idle(clock, idle_timeout))
        .map(|session| session.id().clone())
        .collect();

    let mut results = Vec::with_capacity(idle.len());
    for session_id in idle {
        let Some(mut session) = store.remove(&session_id) else {
            continue;
        };
        session.close(CloseReason::IdleTimeout, correlation_id, clock);
        info!(%correlation_id, session_id = %session_id, "idle session reaped");
        results.push(SessionCommandResult {
            session_id,
            events: session.take_uncommitted_events(),
        });
    }
    results
}
