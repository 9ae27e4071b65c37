//! HTTP and WebSocket routes.

pub mod health;
pub mod sessions;
pub mod ws;

use axum::Router;

use crate::state::AppState;

/// Assembles every route. Layers are added by the caller.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(ws::router())
        .nest("/api/v1/sessions", sessions::router())
        .with_state(state)
}
