//! Read-only session inspection.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use duet_core::ids::SessionId;
use duet_session::application::query_handlers::SessionView;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /{session_id}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state
        .gateway
        .view_session(SessionId::new(session_id))
        .await?;
    Ok(Json(view))
}

/// Returns the router for session inspection.
pub fn router() -> Router<AppState> {
    Router::new().route("/{session_id}", get(get_session))
}
