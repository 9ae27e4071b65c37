//! Integration tests for the session inspection endpoint.

mod common;

use axum::http::StatusCode;
use common::{QUESTIONS, TestClient};

#[tokio::test]
async fn test_session_get_nonexistent_returns_404() {
    let app = common::build_test_app();

    let (status, json) = common::get_json(app, "/api/v1/sessions/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session_not_found");
    assert!(json["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_session_get_returns_live_roster_and_cursor() {
    // Arrange
    let (app, gateway) = common::build_test_app_with_gateway();
    let mut ana = TestClient::connect(&gateway).await;
    let session_id = ana.create("Ana").await;

    // Act
    let (status, json) =
        common::get_json(app, &format!("/api/v1/sessions/{session_id}")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session_id"], session_id.as_str());
    assert_eq!(json["participants"].as_array().unwrap().len(), 1);
    assert_eq!(json["participants"][0]["display_name"], "Ana");
    assert_eq!(json["cursor"], 0);
    assert_eq!(json["total_questions"], QUESTIONS);
    assert_eq!(json["phase"], "awaiting_answers");
}
