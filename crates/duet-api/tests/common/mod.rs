//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use duet_api::gateway::protocol::{ClientMessage, ServerMessage};
use duet_api::gateway::{Coordinator, GatewayHandle, outbox};
use duet_api::routes;
use duet_api::state::AppState;
use duet_core::ids::{ConnectionId, SessionId};
use duet_core::rng::SystemRng;
use duet_session::{SessionConfig, SessionService};
use duet_test_support::{FixedClock, StaticQuestionProvider};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Questions per session in integration tests.
pub const QUESTIONS: usize = 3;

/// Spawn a coordinator with deterministic collaborators.
pub fn spawn_gateway() -> GatewayHandle {
    let service = SessionService::new(
        SessionConfig {
            questions_per_session: QUESTIONS,
            ..SessionConfig::default()
        },
        Arc::new(StaticQuestionProvider::numbered(QUESTIONS)),
        Box::new(SystemRng::seeded(42)),
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())),
    );
    Coordinator::spawn(service, 64).0
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> Router {
    build_test_app_with_gateway().0
}

/// Build the app router together with the gateway it drives.
pub fn build_test_app_with_gateway() -> (Router, GatewayHandle) {
    let gateway = spawn_gateway();
    (routes::app_router(AppState::new(gateway.clone())), gateway)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or_default();

    (status, json)
}

/// A connection registered with the gateway, with its inbound frame queue.
pub struct TestClient {
    pub id: ConnectionId,
    gateway: GatewayHandle,
    frames: mpsc::Receiver<ServerMessage>,
}

impl TestClient {
    /// Register a fresh connection.
    pub async fn connect(gateway: &GatewayHandle) -> Self {
        let id = ConnectionId::new();
        let (outbox, frames) = outbox();
        gateway.connect(id, outbox).await.unwrap();
        Self {
            id,
            gateway: gateway.clone(),
            frames,
        }
    }

    /// Send a client frame.
    pub async fn send(&self, message: ClientMessage) {
        self.gateway.dispatch(self.id, message).await.unwrap();
    }

    /// Close the connection.
    pub async fn close(self) {
        self.gateway.disconnect(self.id).await.unwrap();
    }

    /// Wait for the next frame.
    pub async fn recv(&mut self) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(2), self.frames.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("outbox closed")
    }

    /// Assert nothing else arrives within a short grace period.
    pub async fn assert_silent(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(50), self.frames.recv()).await;
        assert!(next.is_err(), "unexpected frame: {next:?}");
    }

    /// Create a session and consume the creator's two reply frames.
    pub async fn create(&mut self, name: &str) -> SessionId {
        self.send(ClientMessage::CreateSession {
            player_name: name.to_owned(),
        })
        .await;
        let ServerMessage::SessionCreated { session_id } = self.recv().await else {
            panic!("expected sessionCreated");
        };
        let _question = self.recv().await;
        session_id
    }
}
