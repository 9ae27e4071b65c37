//! Aggregate root for a live session and its per-question state machine.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use duet_core::aggregate::AggregateRoot;
use duet_core::clock::Clock;
use duet_core::error::DomainError;
use duet_core::event::EventMetadata;
use duet_core::ids::{ConnectionId, SessionId};
use duet_core::question::Question;
use uuid::Uuid;

use super::events::{
    AllAnswered, AnswerView, CloseReason, CompletedRound, ParticipantView, QuestionPresented,
    QuestionsExhausted, RosterChanged, SessionClosed, SessionCreated, SessionEvent,
    SessionEventKind,
};

/// A session never seats more than this many participants.
pub const MAX_PARTICIPANTS: usize = 2;

/// Answers longer than this are truncated.
pub const MAX_ANSWER_CHARS: usize = 500;

/// Display names longer than this are truncated.
pub const MAX_DISPLAY_NAME_CHARS: usize = 40;

/// Per-question state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// At least one registered participant has not answered yet.
    AwaitingAnswers,
    /// Every registered participant answered; waiting for an advance.
    AllAnswered,
    /// The cursor is past the last question.
    Exhausted,
}

/// One occupied seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Identity of the participant.
    pub connection_id: ConnectionId,
    /// Informational name; may collide with the other participant's.
    pub display_name: String,
}

/// Result of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new seat was taken.
    Joined,
    /// The connection already held a seat; its name was refreshed.
    Rejoined,
}

/// Result of an accepted answer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Recorded; other participants still have to answer.
    Pending,
    /// Recorded and it completed the set; "all answered" was emitted.
    Completed,
    /// Recorded over an already completed set; nothing was emitted.
    AlreadyCompleted,
}

/// Result of an advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The cursor moved to another question.
    Next {
        /// The new cursor.
        cursor: usize,
    },
    /// The cursor moved past the last question.
    Exhausted,
    /// The session was already exhausted; nothing changed.
    AlreadyExhausted,
}

/// Trims and bounds a display name.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the name is blank.
pub fn normalize_display_name(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(
            "display name must not be empty".to_owned(),
        ));
    }
    Ok(trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect())
}

/// Trims and bounds an answer.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the answer is blank.
pub fn normalize_answer(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation("answer must not be empty".to_owned()));
    }
    Ok(trimmed.chars().take(MAX_ANSWER_CHARS).collect())
}

/// The aggregate root for a live session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    /// Number of events drained so far.
    version: i64,
    /// Occupied seats in join order. Freed on leave, never tombstoned.
    participants: Vec<Participant>,
    /// Fixed at creation.
    questions: Vec<Question>,
    cursor: usize,
    /// Answers for the current question only.
    answers: HashMap<ConnectionId, String>,
    phase: RoundPhase,
    history: Vec<CompletedRound>,
    last_activity: DateTime<Utc>,
    uncommitted_events: Vec<SessionEvent>,
}

impl Session {
    /// Opens a session seating `creator` at cursor 0.
    ///
    /// `display_name` must already be normalized. Records the creation and
    /// the first question state, both addressed to the creator only.
    #[must_use]
    pub fn start(
        id: SessionId,
        creator: ConnectionId,
        display_name: String,
        questions: Vec<Question>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        let now = clock.now();
        let phase = if questions.is_empty() {
            RoundPhase::Exhausted
        } else {
            RoundPhase::AwaitingAnswers
        };
        let mut session = Self {
            id,
            version: 0,
            participants: vec![Participant {
                connection_id: creator,
                display_name: display_name.clone(),
            }],
            questions,
            cursor: 0,
            answers: HashMap::new(),
            phase,
            history: Vec::new(),
            last_activity: now,
            uncommitted_events: Vec::new(),
        };

        session.record(
            correlation_id,
            now,
            vec![creator],
            SessionEventKind::SessionCreated(SessionCreated {
                creator,
                display_name,
            }),
        );
        session.record_current_state(correlation_id, now, vec![creator]);
        session
    }

    /// Seats `connection`, or refreshes its name if it already holds a seat.
    ///
    /// The roster goes to every participant; the current question state
    /// (not a restart) goes to the joiner. A rejoin that changes nothing
    /// is answered to the rejoiner alone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionFull` when both seats are taken by
    /// others and `DomainError::Validation` for a blank name.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        display_name: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<JoinOutcome, DomainError> {
        let seat = self
            .participants
            .iter()
            .position(|p| p.connection_id == connection);
        if seat.is_none() && self.participants.len() >= MAX_PARTICIPANTS {
            return Err(DomainError::SessionFull(self.id.clone()));
        }
        let display_name = normalize_display_name(display_name)?;

        let (outcome, roster_recipients) = match seat {
            Some(index) => {
                let existing = &mut self.participants[index];
                let unchanged = existing.display_name == display_name;
                existing.display_name = display_name;
                let recipients = if unchanged {
                    vec![connection]
                } else {
                    self.roster_connections()
                };
                (JoinOutcome::Rejoined, recipients)
            }
            None => {
                self.participants.push(Participant {
                    connection_id: connection,
                    display_name,
                });
                // The newcomer has not answered, so a completed set is no
                // longer complete.
                if self.phase == RoundPhase::AllAnswered {
                    self.phase = RoundPhase::AwaitingAnswers;
                }
                (JoinOutcome::Joined, self.roster_connections())
            }
        };

        let now = clock.now();
        self.last_activity = now;
        self.record_roster(correlation_id, now, roster_recipients);
        self.record_current_state(correlation_id, now, vec![connection]);
        Ok(outcome)
    }

    /// Records an answer for the current question, last write wins, then
    /// checks whether every registered participant has answered.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotAParticipant` for unknown connections and
    /// `DomainError::Validation` for blank answers or an exhausted session.
    pub fn submit_answer(
        &mut self,
        connection: ConnectionId,
        answer: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<SubmissionOutcome, DomainError> {
        if !self.is_participant(connection) {
            return Err(DomainError::NotAParticipant {
                session_id: self.id.clone(),
                connection_id: connection,
            });
        }
        if self.phase == RoundPhase::Exhausted {
            return Err(DomainError::Validation(
                "session has no current question".to_owned(),
            ));
        }
        let answer = normalize_answer(answer)?;

        let now = clock.now();
        self.answers.insert(connection, answer);
        self.last_activity = now;

        match self.phase {
            RoundPhase::AllAnswered => Ok(SubmissionOutcome::AlreadyCompleted),
            RoundPhase::AwaitingAnswers if self.all_answered() => {
                self.phase = RoundPhase::AllAnswered;
                let event = AllAnswered {
                    cursor: self.cursor,
                    answers: self.answer_views(),
                };
                let recipients = self.roster_connections();
                self.record(
                    correlation_id,
                    now,
                    recipients,
                    SessionEventKind::AllAnswered(event),
                );
                Ok(SubmissionOutcome::Completed)
            }
            _ => Ok(SubmissionOutcome::Pending),
        }
    }

    /// Archives and clears the current answers, then moves the cursor.
    pub fn advance(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> AdvanceOutcome {
        if self.phase == RoundPhase::Exhausted {
            return AdvanceOutcome::AlreadyExhausted;
        }

        let now = clock.now();
        self.history.push(CompletedRound {
            question_index: self.cursor,
            answers: self.answer_views(),
        });
        self.answers.clear();
        self.cursor += 1;
        self.last_activity = now;

        let recipients = self.roster_connections();
        if self.cursor < self.questions.len() {
            self.phase = RoundPhase::AwaitingAnswers;
            self.record_current_state(correlation_id, now, recipients);
            AdvanceOutcome::Next {
                cursor: self.cursor,
            }
        } else {
            self.phase = RoundPhase::Exhausted;
            self.record_current_state(correlation_id, now, recipients);
            AdvanceOutcome::Exhausted
        }
    }

    /// Frees the seat and pending answer of `connection`.
    ///
    /// Returns `false` if the connection held no seat. When the last seat is
    /// freed a `SessionClosed` event with no recipients is recorded and the
    /// caller must drop the record.
    pub fn remove_participant(
        &mut self,
        connection: ConnectionId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> bool {
        let Some(position) = self
            .participants
            .iter()
            .position(|p| p.connection_id == connection)
        else {
            return false;
        };

        self.participants.remove(position);
        self.answers.remove(&connection);

        let now = clock.now();
        self.last_activity = now;
        if self.participants.is_empty() {
            self.record(
                correlation_id,
                now,
                Vec::new(),
                SessionEventKind::SessionClosed(SessionClosed {
                    reason: CloseReason::LastParticipantLeft,
                }),
            );
        } else {
            let recipients = self.roster_connections();
            self.record_roster(correlation_id, now, recipients);
        }
        true
    }

    /// Tells every participant the session is going away.
    pub fn close(&mut self, reason: CloseReason, correlation_id: Uuid, clock: &dyn Clock) {
        let recipients = self.roster_connections();
        self.record(
            correlation_id,
            clock.now(),
            recipients,
            SessionEventKind::SessionClosed(SessionClosed { reason }),
        );
    }

    /// Whether nothing happened for at least `timeout`.
    #[must_use]
    pub fn is_idle(&self, clock: &dyn Clock, timeout: TimeDelta) -> bool {
        clock.elapsed_since(self.last_activity) >= timeout
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Occupied seats in join order.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Whether `connection` holds a seat.
    #[must_use]
    pub fn is_participant(&self, connection: ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| p.connection_id == connection)
    }

    /// The fixed question sequence.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Index of the active question; equals the sequence length once
    /// exhausted.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current per-question phase.
    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// The stored answer of `connection` for the current question.
    #[must_use]
    pub fn answer_of(&self, connection: ConnectionId) -> Option<&str> {
        self.answers.get(&connection).map(String::as_str)
    }

    /// Number of answers recorded for the current question.
    #[must_use]
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    /// Answer sets of the rounds already advanced past.
    #[must_use]
    pub fn history(&self) -> &[CompletedRound] {
        &self.history
    }

    /// Time of the last mutating operation.
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    fn all_answered(&self) -> bool {
        !self.participants.is_empty()
            && self
                .participants
                .iter()
                .all(|p| self.answers.contains_key(&p.connection_id))
    }

    fn answer_views(&self) -> Vec<AnswerView> {
        self.participants
            .iter()
            .filter_map(|p| {
                self.answers.get(&p.connection_id).map(|answer| AnswerView {
                    connection_id: p.connection_id,
                    answer: answer.clone(),
                    display_name: p.display_name.clone(),
                })
            })
            .collect()
    }

    fn roster_connections(&self) -> Vec<ConnectionId> {
        self.participants.iter().map(|p| p.connection_id).collect()
    }

    fn record_roster(
        &mut self,
        correlation_id: Uuid,
        now: DateTime<Utc>,
        recipients: Vec<ConnectionId>,
    ) {
        let participants = self
            .participants
            .iter()
            .map(|p| ParticipantView {
                connection_id: p.connection_id,
                display_name: p.display_name.clone(),
            })
            .collect();
        self.record(
            correlation_id,
            now,
            recipients,
            SessionEventKind::RosterChanged(RosterChanged { participants }),
        );
    }

    fn record_current_state(
        &mut self,
        correlation_id: Uuid,
        now: DateTime<Utc>,
        recipients: Vec<ConnectionId>,
    ) {
        let kind = if self.phase == RoundPhase::Exhausted {
            SessionEventKind::QuestionsExhausted(QuestionsExhausted {
                total_questions: self.questions.len(),
                history: self.history.clone(),
            })
        } else {
            SessionEventKind::QuestionPresented(QuestionPresented {
                questions: self.questions.clone(),
                cursor: self.cursor,
            })
        };
        self.record(correlation_id, now, recipients, kind);
    }

    /// Returns the next sequence number for a new event.
    #[allow(clippy::cast_possible_wrap)]
    fn next_sequence_number(&self) -> i64 {
        self.version + self.uncommitted_events.len() as i64 + 1
    }

    fn record(
        &mut self,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
        recipients: Vec<ConnectionId>,
        kind: SessionEventKind,
    ) {
        let event = SessionEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                session_id: self.id.clone(),
                sequence_number: self.next_sequence_number(),
                correlation_id,
                occurred_at,
            },
            recipients,
            kind,
        };
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for Session {
    type Id = SessionId;
    type Event = SessionEvent;

    fn aggregate_id(&self) -> &SessionId {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[SessionEvent] {
        &self.uncommitted_events
    }

    #[allow(clippy::cast_possible_wrap)]
    fn take_uncommitted_events(&mut self) -> Vec<SessionEvent> {
        let events = std::mem::take(&mut self.uncommitted_events);
        self.version += events.len() as i64;
        events
    }
}
