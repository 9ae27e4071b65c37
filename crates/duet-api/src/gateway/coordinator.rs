//! The session coordinator task.
//!
//! A single task owns the `SessionService` and the outbox of every open
//! connection. Socket tasks talk to it through a bounded channel, so all
//! session operations are applied one at a time in arrival order and the
//! frames an operation produces are queued before the next one starts.
//!
//! Outboxes are bounded. A connection whose outbox is full is dropped and
//! released from its sessions, so a peer that stops reading can neither
//! stall the coordinator nor grow its queue without limit.

use std::collections::HashMap;

use duet_core::error::DomainError;
use duet_core::event::DomainEvent;
use duet_core::ids::{ConnectionId, SessionId};
use duet_session::SessionService;
use duet_session::application::command_handlers::SessionCommandResult;
use duet_session::application::query_handlers::SessionView;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{ApiError, CoordinatorGone};
use crate::gateway::protocol::{ClientMessage, ServerMessage, server_message_for};

/// Frames queued for one connection before it is considered stalled.
pub const OUTBOX_CAPACITY: usize = 256;

/// Per-connection queue of outgoing frames.
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Creates an outbox and the receiver its writer drains.
#[must_use]
pub fn outbox() -> (Outbox, mpsc::Receiver<ServerMessage>) {
    mpsc::channel(OUTBOX_CAPACITY)
}

/// Everything the coordinator reacts to.
#[derive(Debug)]
pub enum GatewayEvent {
    /// A socket opened; frames for it go to `outbox`.
    Connected {
        /// The new connection.
        connection_id: ConnectionId,
        /// Where its frames are queued.
        outbox: Outbox,
    },
    /// A parsed client frame.
    Inbound {
        /// The sender.
        connection_id: ConnectionId,
        /// The request.
        message: ClientMessage,
    },
    /// A socket closed.
    Disconnected {
        /// The closed connection.
        connection_id: ConnectionId,
    },
    /// Periodic idle sweep.
    ReapIdle,
    /// Read-only snapshot of one session.
    ViewSession {
        /// The session to describe.
        session_id: SessionId,
        /// Where the snapshot goes.
        reply: oneshot::Sender<Result<SessionView, DomainError>>,
    },
}

/// Cloneable sender side of the coordinator.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    tx: mpsc::Sender<GatewayEvent>,
}

impl GatewayHandle {
    async fn send(&self, event: GatewayEvent) -> Result<(), CoordinatorGone> {
        self.tx.send(event).await.map_err(|_| CoordinatorGone)
    }

    /// Registers a connection and its outbox.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorGone` if the coordinator has stopped.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        outbox: Outbox,
    ) -> Result<(), CoordinatorGone> {
        self.send(GatewayEvent::Connected {
            connection_id,
            outbox,
        })
        .await
    }

    /// Forwards a client request.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorGone` if the coordinator has stopped.
    pub async fn dispatch(
        &self,
        connection_id: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), CoordinatorGone> {
        self.send(GatewayEvent::Inbound {
            connection_id,
            message,
        })
        .await
    }

    /// Reports a closed connection.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorGone` if the coordinator has stopped.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<(), CoordinatorGone> {
        self.send(GatewayEvent::Disconnected { connection_id }).await
    }

    /// Requests an idle sweep.
    ///
    /// # Errors
    ///
    /// Returns `CoordinatorGone` if the coordinator has stopped.
    pub async fn reap_idle(&self) -> Result<(), CoordinatorGone> {
        self.send(GatewayEvent::ReapIdle).await
    }

    /// Fetches a snapshot of `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` for unknown sessions and
    /// `DomainError::Infrastructure` if the coordinator has stopped.
    pub async fn view_session(&self, session_id: SessionId) -> Result<SessionView, DomainError> {
        let (reply, response) = oneshot::channel();
        self.send(GatewayEvent::ViewSession { session_id, reply })
            .await
            .map_err(|gone| DomainError::Infrastructure(gone.to_string()))?;
        response
            .await
            .map_err(|_| DomainError::Infrastructure(CoordinatorGone.to_string()))?
    }
}

/// Owns the live sessions and the connection outboxes.
#[derive(Debug)]
pub struct Coordinator {
    service: SessionService,
    outboxes: HashMap<ConnectionId, Outbox>,
    inbound: mpsc::Receiver<GatewayEvent>,
}

impl Coordinator {
    /// Creates a coordinator and the handle feeding it. `capacity` bounds
    /// the number of queued events before senders wait.
    #[must_use]
    pub fn new(service: SessionService, capacity: usize) -> (Self, GatewayHandle) {
        let (tx, inbound) = mpsc::channel(capacity.max(1));
        let coordinator = Self {
            service,
            outboxes: HashMap::new(),
            inbound,
        };
        (coordinator, GatewayHandle { tx })
    }

    /// Creates a coordinator and runs it on its own task.
    #[must_use]
    pub fn spawn(service: SessionService, capacity: usize) -> (GatewayHandle, JoinHandle<()>) {
        let (coordinator, handle) = Self::new(service, capacity);
        (handle, tokio::spawn(coordinator.run()))
    }

    /// Processes events until every handle is dropped.
    pub async fn run(mut self) {
        info!("session coordinator started");
        while let Some(event) = self.inbound.recv().await {
            self.handle(event);
        }
        info!(
            live_sessions = self.service.store().len(),
            "session coordinator stopped"
        );
    }

    /// Applies one event and queues every resulting frame.
    pub fn handle(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::Connected {
                connection_id,
                outbox,
            } => {
                debug!(%connection_id, "connection registered");
                self.outboxes.insert(connection_id, outbox);
            }
            GatewayEvent::Inbound {
                connection_id,
                message,
            } => match self.apply(connection_id, message) {
                Ok(result) => self.deliver(&result),
                Err(err) => {
                    debug!(%connection_id, code = err.code(), "request rejected");
                    if !self.send_to(connection_id, ApiError(err).into()) {
                        self.evict(vec![connection_id]);
                    }
                }
            },
            GatewayEvent::Disconnected { connection_id } => {
                debug!(%connection_id, "connection closed");
                self.outboxes.remove(&connection_id);
                for result in self.service.disconnect(connection_id) {
                    self.deliver(&result);
                }
            }
            GatewayEvent::ReapIdle => {
                for result in self.service.reap_idle_sessions() {
                    self.deliver(&result);
                }
            }
            GatewayEvent::ViewSession { session_id, reply } => {
                // The requester may have gone away already.
                let _ = reply.send(self.service.view(&session_id));
            }
        }
    }

    /// Number of connections with a registered outbox.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.outboxes.len()
    }

    /// The owned session service.
    #[must_use]
    pub fn service(&self) -> &SessionService {
        &self.service
    }

    #[instrument(skip_all, fields(%connection_id))]
    fn apply(
        &mut self,
        connection_id: ConnectionId,
        message: ClientMessage,
    ) -> Result<SessionCommandResult, DomainError> {
        match message {
            ClientMessage::CreateSession { player_name } => {
                self.service.create_session(connection_id, &player_name)
            }
            ClientMessage::JoinSession {
                session_id,
                player_name,
            } => self
                .service
                .join_session(connection_id, session_id, &player_name),
            ClientMessage::SubmitAnswer { session_id, answer } => {
                self.service.submit_answer(connection_id, session_id, &answer)
            }
            ClientMessage::NextQuestion { session_id } => {
                self.service.advance_question(connection_id, session_id)
            }
        }
    }

    fn deliver(&mut self, result: &SessionCommandResult) {
        let stalled = self.fan_out(result);
        self.evict(stalled);
    }

    /// Queues every event of `result` for its recipients and returns the
    /// connections whose outbox was full.
    fn fan_out(&self, result: &SessionCommandResult) -> Vec<ConnectionId> {
        let mut stalled = Vec::new();
        for event in &result.events {
            debug!(
                session_id = %result.session_id,
                event_type = event.event_type(),
                sequence = event.metadata().sequence_number,
                recipients = event.recipients().len(),
                "delivering event"
            );
            let message = server_message_for(event);
            for recipient in event.recipients() {
                if !self.send_to(*recipient, message.clone()) {
                    stalled.push(*recipient);
                }
            }
        }
        stalled
    }

    /// Drops stalled connections and releases their seats. Roster updates
    /// caused by a release can stall further connections; those are
    /// dropped in turn.
    fn evict(&mut self, mut stalled: Vec<ConnectionId>) {
        while let Some(connection_id) = stalled.pop() {
            if self.outboxes.remove(&connection_id).is_none() {
                continue;
            }
            warn!(
                %connection_id,
                capacity = OUTBOX_CAPACITY,
                "outbox full, dropping connection"
            );
            for result in self.service.disconnect(connection_id) {
                stalled.extend(self.fan_out(&result));
            }
        }
    }

    /// Queues `message` for `connection_id`. Returns `false` only when the
    /// outbox is full.
    fn send_to(&self, connection_id: ConnectionId, message: ServerMessage) -> bool {
        let Some(outbox) = self.outboxes.get(&connection_id) else {
            debug!(%connection_id, "no outbox for connection, frame dropped");
            return true;
        };
        match outbox.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Closed(_)) => {
                warn!(%connection_id, "outbox closed, frame dropped");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use duet_core::rng::SystemRng;
    use duet_session::SessionConfig;
    use duet_test_support::{FixedClock, StaticQuestionProvider};

    use super::*;

    fn coordinator() -> Coordinator {
        let service = SessionService::new(
            SessionConfig::default(),
            Arc::new(StaticQuestionProvider::numbered(3)),
            Box::new(SystemRng::seeded(7)),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
        );
        Coordinator::new(service, 8).0
    }

    fn connect(coordinator: &mut Coordinator) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let connection_id = ConnectionId::new();
        let (outbox, rx) = outbox();
        coordinator.handle(GatewayEvent::Connected {
            connection_id,
            outbox,
        });
        (connection_id, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn send(coordinator: &mut Coordinator, connection_id: ConnectionId, message: ClientMessage) {
        coordinator.handle(GatewayEvent::Inbound {
            connection_id,
            message,
        });
    }

    fn create(coordinator: &mut Coordinator, connection_id: ConnectionId) -> SessionId {
        send(
            coordinator,
            connection_id,
            ClientMessage::CreateSession {
                player_name: "Ana".to_owned(),
            },
        );
        coordinator
            .service()
            .store()
            .sessions_of(connection_id)
            .pop()
            .unwrap()
    }

    #[test]
    fn test_create_session_replies_to_creator_only() {
        // Arrange
        let mut coordinator = coordinator();
        let (ana, mut ana_rx) = connect(&mut coordinator);
        let (_bystander, mut bystander_rx) = connect(&mut coordinator);

        // Act
        let session_id = create(&mut coordinator, ana);

        // Assert
        let frames = drain(&mut ana_rx);
        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0],
            ServerMessage::SessionCreated {
                session_id: session_id.clone()
            }
        );
        assert!(matches!(
            frames[1],
            ServerMessage::LoadQuestion { current_question: 0, total_questions: 3, .. }
        ));
        assert!(drain(&mut bystander_rx).is_empty());
    }

    #[test]
    fn test_error_goes_only_to_requester() {
        // Arrange
        let mut coordinator = coordinator();
        let (ana, mut ana_rx) = connect(&mut coordinator);
        let (bruno, mut bruno_rx) = connect(&mut coordinator);
        let session_id = create(&mut coordinator, ana);
        drain(&mut ana_rx);

        // Act
        send(
            &mut coordinator,
            bruno,
            ClientMessage::SubmitAnswer {
                session_id,
                answer: "sneaky".to_owned(),
            },
        );

        // Assert
        let frames = drain(&mut bruno_rx);
        assert!(matches!(
            frames.as_slice(),
            [ServerMessage::SessionError { code, .. }] if code == "not_a_participant"
        ));
        assert!(drain(&mut ana_rx).is_empty());
    }

    #[test]
    fn test_disconnect_drops_outbox_and_notifies_remaining_participant() {
        // Arrange
        let mut coordinator = coordinator();
        let (ana, mut ana_rx) = connect(&mut coordinator);
        let (bruno, _bruno_rx) = connect(&mut coordinator);
        let session_id = create(&mut coordinator, ana);
        send(
            &mut coordinator,
            bruno,
            ClientMessage::JoinSession {
                session_id: session_id.clone(),
                player_name: "Bruno".to_owned(),
            },
        );
        drain(&mut ana_rx);

        // Act
        coordinator.handle(GatewayEvent::Disconnected { connection_id: bruno });

        // Assert
        assert_eq!(coordinator.connection_count(), 1);
        match drain(&mut ana_rx).as_slice() {
            [ServerMessage::PlayerJoined { players, .. }] => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].connection_id, ana);
            }
            other => panic!("expected one PlayerJoined, got {other:?}"),
        }
    }

    #[test]
    fn test_closed_outbox_does_not_block_other_recipients() {
        // Arrange
        let mut coordinator = coordinator();
        let (ana, mut ana_rx) = connect(&mut coordinator);
        let (bruno, bruno_rx) = connect(&mut coordinator);
        let session_id = create(&mut coordinator, ana);
        send(
            &mut coordinator,
            bruno,
            ClientMessage::JoinSession {
                session_id: session_id.clone(),
                player_name: "Bruno".to_owned(),
            },
        );
        drain(&mut ana_rx);
        drop(bruno_rx);

        // Act
        send(
            &mut coordinator,
            ana,
            ClientMessage::NextQuestion { session_id },
        );

        // Assert
        assert!(matches!(
            drain(&mut ana_rx).as_slice(),
            [ServerMessage::LoadQuestion { current_question: 1, .. }]
        ));
    }

    fn join(
        coordinator: &mut Coordinator,
        connection_id: ConnectionId,
        session_id: &SessionId,
        name: &str,
    ) {
        send(
            coordinator,
            connection_id,
            ClientMessage::JoinSession {
                session_id: session_id.clone(),
                player_name: name.to_owned(),
            },
        );
    }

    #[test]
    fn test_identical_rejoins_do_not_queue_frames_for_peer() {
        // Arrange
        let mut coordinator = coordinator();
        let (ana, mut ana_rx) = connect(&mut coordinator);
        let (bruno, mut bruno_rx) = connect(&mut coordinator);
        let session_id = create(&mut coordinator, ana);
        join(&mut coordinator, bruno, &session_id, "Bruno");
        drain(&mut ana_rx);

        // Act
        for _ in 0..10_000 {
            join(&mut coordinator, bruno, &session_id, "Bruno");
            drain(&mut bruno_rx);
        }

        // Assert
        assert!(drain(&mut ana_rx).is_empty());
        assert_eq!(coordinator.connection_count(), 2);
    }

    #[test]
    fn test_stalled_peer_is_dropped_once_its_outbox_fills() {
        // Arrange
        let mut coordinator = coordinator();
        let (ana, ana_rx) = connect(&mut coordinator);
        let (bruno, mut bruno_rx) = connect(&mut coordinator);
        let session_id = create(&mut coordinator, ana);
        join(&mut coordinator, bruno, &session_id, "Bruno");

        // Act: Ana never reads while Bruno keeps renaming himself.
        for round in 0..OUTBOX_CAPACITY * 2 {
            join(&mut coordinator, bruno, &session_id, &format!("Bruno {round}"));
            drain(&mut bruno_rx);
        }

        // Assert
        assert!(ana_rx.len() <= OUTBOX_CAPACITY);
        assert_eq!(coordinator.connection_count(), 1);
        assert!(coordinator.service().store().sessions_of(ana).is_empty());
        let view = coordinator.service().view(&session_id).unwrap();
        assert_eq!(view.participants.len(), 1);
        assert_eq!(view.participants[0].connection_id, bruno);
    }

    #[test]
    fn test_eviction_notifies_remaining_participant() {
        // Arrange
        let mut coordinator = coordinator();
        let (ana, _ana_rx) = connect(&mut coordinator);
        let (bruno, mut bruno_rx) = connect(&mut coordinator);
        let session_id = create(&mut coordinator, ana);
        join(&mut coordinator, bruno, &session_id, "Bruno");
        let mut last_roster = None;

        // Act
        for round in 0..OUTBOX_CAPACITY * 2 {
            join(&mut coordinator, bruno, &session_id, &format!("Bruno {round}"));
            for frame in drain(&mut bruno_rx) {
                if let ServerMessage::PlayerJoined { players, .. } = frame {
                    last_roster = Some(players);
                }
            }
        }

        // Assert
        let players = last_roster.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].connection_id, bruno);
    }

    #[tokio::test]
    async fn test_view_session_answers_through_handle() {
        // Arrange
        let service = SessionService::new(
            SessionConfig::default(),
            Arc::new(StaticQuestionProvider::numbered(3)),
            Box::new(SystemRng::seeded(7)),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
        );
        let (handle, _task) = Coordinator::spawn(service, 8);

        // Act
        let result = handle.view_session(SessionId::from("missing")).await;

        // Assert
        assert!(matches!(result, Err(DomainError::SessionNotFound(_))));
    }
}
