//! In-memory session table.
//!
//! Owned by whoever drives the sessions (the gateway coordinator in
//! production, the test itself in tests). Besides the records it keeps a
//! reverse index from connection to the sessions it is seated in, so a
//! disconnect touches only the sessions that contain the connection.

use std::collections::{BTreeSet, HashMap};

use duet_core::error::DomainError;
use duet_core::ids::{ConnectionId, SessionId};

use crate::domain::aggregates::Session;

/// Mapping from session identifier to live session record.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
    memberships: HashMap<ConnectionId, BTreeSet<SessionId>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live session uses `id`.
    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Looks up a session.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Looks up a session for mutation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` if no live session matches.
    pub fn get_mut(&mut self, id: &SessionId) -> Result<&mut Session, DomainError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| DomainError::SessionNotFound(id.clone()))
    }

    /// Adds a freshly started session and indexes its participants.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the identifier is taken; an
    /// existing record is never overwritten.
    pub fn insert(&mut self, session: Session) -> Result<(), DomainError> {
        let id = session.id().clone();
        if self.sessions.contains_key(&id) {
            return Err(DomainError::Infrastructure(format!(
                "session id {id} is already in use"
            )));
        }
        for participant in session.participants() {
            self.register(participant.connection_id, &id);
        }
        self.sessions.insert(id, session);
        Ok(())
    }

    /// Removes a session and every membership pointing at it.
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        for participant in session.participants() {
            self.unregister(participant.connection_id, id);
        }
        Some(session)
    }

    /// Records that `connection` is seated in `id`.
    pub fn register(&mut self, connection: ConnectionId, id: &SessionId) {
        self.memberships
            .entry(connection)
            .or_default()
            .insert(id.clone());
    }

    /// Forgets that `connection` is seated in `id`.
    pub fn unregister(&mut self, connection: ConnectionId, id: &SessionId) {
        if let Some(ids) = self.memberships.get_mut(&connection) {
            ids.remove(id);
            if ids.is_empty() {
                self.memberships.remove(&connection);
            }
        }
    }

    /// Removes and returns every session id `connection` is seated in.
    pub fn take_memberships(&mut self, connection: ConnectionId) -> BTreeSet<SessionId> {
        self.memberships.remove(&connection).unwrap_or_default()
    }

    /// Session ids `connection` is seated in.
    #[must_use]
    pub fn sessions_of(&self, connection: ConnectionId) -> Vec<SessionId> {
        self.memberships
            .get(&connection)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Iterates over every live session.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use duet_test_support::{FixedClock, numbered_questions};
    use uuid::Uuid;

    use super::*;

    fn session(id: &str, creator: ConnectionId) -> Session {
        Session::start(
            SessionId::from(id),
            creator,
            "Ana".to_owned(),
            numbered_questions(2),
            Uuid::new_v4(),
            &FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()),
        )
    }

    #[test]
    fn test_insert_indexes_creator_membership() {
        // Arrange
        let mut store = SessionStore::new();
        let creator = ConnectionId::new();

        // Act
        store.insert(session("s1", creator)).unwrap();

        // Assert
        assert_eq!(store.len(), 1);
        assert_eq!(store.sessions_of(creator), vec![SessionId::from("s1")]);
    }

    #[test]
    fn test_insert_refuses_to_overwrite_live_session() {
        // Arrange
        let mut store = SessionStore::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();
        store.insert(session("s1", first)).unwrap();

        // Act
        let result = store.insert(session("s1", second));

        // Assert
        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        let kept = store.get(&SessionId::from("s1")).unwrap();
        assert!(kept.is_participant(first));
        assert!(store.sessions_of(second).is_empty());
    }

    #[test]
    fn test_get_mut_reports_missing_session() {
        let mut store = SessionStore::new();

        let result = store.get_mut(&SessionId::from("nope"));

        match result.unwrap_err() {
            DomainError::SessionNotFound(id) => assert_eq!(id, SessionId::from("nope")),
            other => panic!("expected SessionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_remove_drops_memberships() {
        let mut store = SessionStore::new();
        let creator = ConnectionId::new();
        store.insert(session("s1", creator)).unwrap();

        let removed = store.remove(&SessionId::from("s1"));

        assert!(removed.is_some());
        assert!(store.is_empty());
        assert!(store.sessions_of(creator).is_empty());
    }

    #[test]
    fn test_connection_can_sit_in_several_sessions() {
        let mut store = SessionStore::new();
        let creator = ConnectionId::new();
        store.insert(session("s1", creator)).unwrap();
        store.insert(session("s2", creator)).unwrap();

        let taken = store.take_memberships(creator);

        assert_eq!(taken.len(), 2);
        assert!(store.take_memberships(creator).is_empty());
    }
}
