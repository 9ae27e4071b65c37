//! Service facade owning the session store and its collaborators.
//!
//! The gateway holds exactly one `SessionService` and calls it from a single
//! task, so every operation runs to completion before the next one starts.

use std::sync::Arc;

use duet_core::clock::Clock;
use duet_core::error::DomainError;
use duet_core::ids::{ConnectionId, SessionId};
use duet_core::question::QuestionProvider;
use duet_core::rng::DeterministicRng;
use uuid::Uuid;

use crate::application::command_handlers::{self, SessionCommandResult};
use crate::application::query_handlers::{self, SessionView};
use crate::application::store::SessionStore;
use crate::config::SessionConfig;
use crate::domain::commands::{AdvanceQuestion, CreateSession, Disconnect, JoinSession, SubmitAnswer};

/// Owns the live sessions and turns connection-level requests into commands.
pub struct SessionService {
    store: SessionStore,
    config: SessionConfig,
    provider: Arc<dyn QuestionProvider>,
    rng: Box<dyn DeterministicRng>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("config", &self.config)
            .field("live_sessions", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl SessionService {
    /// Creates a service with an empty store.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn QuestionProvider>,
        rng: Box<dyn DeterministicRng>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store: SessionStore::new(),
            config,
            provider,
            rng,
            clock,
        }
    }

    /// Opens a session for `connection`.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_create_session`].
    pub fn create_session(
        &mut self,
        connection: ConnectionId,
        display_name: &str,
    ) -> Result<SessionCommandResult, DomainError> {
        let command = CreateSession {
            correlation_id: Uuid::new_v4(),
            connection_id: connection,
            display_name: display_name.to_owned(),
        };
        command_handlers::handle_create_session(
            &command,
            &self.config,
            &mut self.store,
            self.provider.as_ref(),
            self.rng.as_mut(),
            self.clock.as_ref(),
        )
    }

    /// Seats `connection` in `session_id`.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_join_session`].
    pub fn join_session(
        &mut self,
        connection: ConnectionId,
        session_id: SessionId,
        display_name: &str,
    ) -> Result<SessionCommandResult, DomainError> {
        let command = JoinSession {
            correlation_id: Uuid::new_v4(),
            connection_id: connection,
            session_id,
            display_name: display_name.to_owned(),
        };
        command_handlers::handle_join_session(&command, &mut self.store, self.clock.as_ref())
    }

    /// Records an answer from `connection`.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_submit_answer`].
    pub fn submit_answer(
        &mut self,
        connection: ConnectionId,
        session_id: SessionId,
        answer: &str,
    ) -> Result<SessionCommandResult, DomainError> {
        let command = SubmitAnswer {
            correlation_id: Uuid::new_v4(),
            connection_id: connection,
            session_id,
            answer: answer.to_owned(),
        };
        command_handlers::handle_submit_answer(&command, &mut self.store, self.clock.as_ref())
    }

    /// Moves `session_id` to its next question.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_advance_question`].
    pub fn advance_question(
        &mut self,
        connection: ConnectionId,
        session_id: SessionId,
    ) -> Result<SessionCommandResult, DomainError> {
        let command = AdvanceQuestion {
            correlation_id: Uuid::new_v4(),
            connection_id: connection,
            session_id,
        };
        command_handlers::handle_advance_question(&command, &mut self.store, self.clock.as_ref())
    }

    /// Releases everything `connection` held. Never fails.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<SessionCommandResult> {
        let command = Disconnect {
            correlation_id: Uuid::new_v4(),
            connection_id: connection,
        };
        command_handlers::handle_disconnect(&command, &mut self.store, self.clock.as_ref())
    }

    /// Closes sessions idle past the configured timeout. No-op when reaping
    /// is disabled.
    pub fn reap_idle_sessions(&mut self) -> Vec<SessionCommandResult> {
        let Some(timeout) = self.config.idle_timeout else {
            return Vec::new();
        };
        command_handlers::handle_reap_idle_sessions(
            Uuid::new_v4(),
            timeout,
            &mut self.store,
            self.clock.as_ref(),
        )
    }

    /// Read-only snapshot of one session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if no live session matches.
    pub fn view(&self, session_id: &SessionId) -> Result<SessionView, DomainError> {
        query_handlers::get_session_view(&self.store, session_id)
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
