//! End-to-end tests over a real WebSocket client.

mod common;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Boot the app on an ephemeral port and return the WS URL.
async fn boot_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = common::build_test_app();
    drop(tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    }));
    format!("ws://{addr}/ws")
}

async fn connect(url: &str) -> WsStream {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn send_json(ws: &mut WsStream, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

/// Read the next text message as JSON.
async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Create a session and return its id, consuming the creator's replies.
async fn create_session(ws: &mut WsStream, name: &str) -> String {
    send_json(ws, json!({"type": "createSession", "playerName": name})).await;
    let created = read_json(ws).await;
    assert_eq!(created["type"], "sessionCreated");
    let question = read_json(ws).await;
    assert_eq!(question["type"], "loadQuestion");
    created["sessionId"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_first_frame_after_handshake_is_answered() {
    // Arrange
    let url = boot_server().await;
    let mut ws = connect(&url).await;

    // Act
    send_json(&mut ws, json!({"type": "createSession", "playerName": "Ana"})).await;

    // Assert
    let created = read_json(&mut ws).await;
    assert_eq!(created["type"], "sessionCreated");
    assert!(created["sessionId"].is_string());
    let question = read_json(&mut ws).await;
    assert_eq!(question["type"], "loadQuestion");
    assert_eq!(question["currentQuestion"], 0);
    assert_eq!(question["totalQuestions"], common::QUESTIONS);
}

#[tokio::test]
async fn test_malformed_frame_gets_parse_error() {
    // Arrange
    let url = boot_server().await;
    let mut ws = connect(&url).await;

    // Act
    ws.send(Message::text("{not json")).await.unwrap();

    // Assert
    let frame = read_json(&mut ws).await;
    assert_eq!(frame["type"], "sessionError");
    assert_eq!(frame["code"], "parse_error");
}

#[tokio::test]
async fn test_socket_stays_usable_after_parse_error() {
    // Arrange
    let url = boot_server().await;
    let mut ws = connect(&url).await;
    send_json(&mut ws, json!({"type": "dance"})).await;
    assert_eq!(read_json(&mut ws).await["code"], "parse_error");

    // Act
    let session_id = create_session(&mut ws, "Ana").await;

    // Assert
    assert!(!session_id.is_empty());
}

#[tokio::test]
async fn test_round_frames_reach_both_sockets_in_order() {
    // Arrange
    let url = boot_server().await;
    let mut ana = connect(&url).await;
    let mut bruno = connect(&url).await;
    let session_id = create_session(&mut ana, "Ana").await;

    // Act: join
    send_json(
        &mut bruno,
        json!({"type": "joinSession", "sessionId": session_id, "playerName": "Bruno"}),
    )
    .await;

    // Assert: roster on both, then the question for the joiner
    for ws in [&mut ana, &mut bruno] {
        let roster = read_json(ws).await;
        assert_eq!(roster["type"], "playerJoined");
        assert_eq!(roster["players"].as_array().unwrap().len(), 2);
    }
    assert_eq!(read_json(&mut bruno).await["type"], "loadQuestion");

    // Act: both answer
    send_json(
        &mut ana,
        json!({"type": "submitAnswer", "sessionId": session_id, "answer": "oi"}),
    )
    .await;
    send_json(
        &mut bruno,
        json!({"type": "submitAnswer", "sessionId": session_id, "answer": "olá"}),
    )
    .await;

    // Assert
    for ws in [&mut ana, &mut bruno] {
        let answered = read_json(ws).await;
        assert_eq!(answered["type"], "allAnswered");
        assert_eq!(answered["currentQuestion"], 0);
        assert_eq!(answered["answers"].as_array().unwrap().len(), 2);
    }

    // Act: advance
    send_json(&mut ana, json!({"type": "nextQuestion", "sessionId": session_id})).await;

    // Assert
    for ws in [&mut ana, &mut bruno] {
        let question = read_json(ws).await;
        assert_eq!(question["type"], "loadQuestion");
        assert_eq!(question["currentQuestion"], 1);
    }
}

#[tokio::test]
async fn test_dropped_socket_updates_peer_roster() {
    // Arrange
    let url = boot_server().await;
    let mut ana = connect(&url).await;
    let mut bruno = connect(&url).await;
    let session_id = create_session(&mut ana, "Ana").await;
    send_json(
        &mut bruno,
        json!({"type": "joinSession", "sessionId": session_id, "playerName": "Bruno"}),
    )
    .await;
    assert_eq!(read_json(&mut ana).await["type"], "playerJoined");

    // Act
    drop(bruno);

    // Assert
    let roster = read_json(&mut ana).await;
    assert_eq!(roster["type"], "playerJoined");
    let players = roster["players"].as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["playerName"], "Ana");
}

#[tokio::test]
async fn test_closed_socket_updates_peer_roster() {
    // Arrange
    let url = boot_server().await;
    let mut ana = connect(&url).await;
    let mut bruno = connect(&url).await;
    let session_id = create_session(&mut ana, "Ana").await;
    send_json(
        &mut bruno,
        json!({"type": "joinSession", "sessionId": session_id, "playerName": "Bruno"}),
    )
    .await;
    assert_eq!(read_json(&mut ana).await["type"], "playerJoined");

    // Act
    bruno.close(None).await.unwrap();

    // Assert
    let roster = read_json(&mut ana).await;
    assert_eq!(roster["type"], "playerJoined");
    assert_eq!(roster["players"].as_array().unwrap().len(), 1);
}
