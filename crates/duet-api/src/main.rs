//! Duet API server entry point.

use std::sync::Arc;

use axum::http::HeaderValue;
use duet_api::config::ServerConfig;
use duet_api::error::AppError;
use duet_api::gateway::Coordinator;
use duet_api::gateway::reaper::spawn_reaper;
use duet_api::routes;
use duet_api::state::AppState;
use duet_content::QuestionBank;
use duet_core::clock::SystemClock;
use duet_core::rng::SystemRng;
use duet_session::SessionService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Queued gateway events before socket tasks wait on the coordinator.
const GATEWAY_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Duet API server");

    let config = ServerConfig::from_env()?;

    let bank = match &config.question_bank_path {
        Some(path) => QuestionBank::from_path(path)?,
        None => QuestionBank::built_in()?,
    };
    tracing::info!(questions = bank.len(), "question bank loaded");

    let service = SessionService::new(
        config.session,
        Arc::new(bank),
        Box::new(SystemRng::from_os()),
        Arc::new(SystemClock),
    );
    let (gateway, _coordinator) = Coordinator::spawn(service, GATEWAY_CAPACITY);

    if config.session.idle_timeout.is_some() {
        let _reaper = spawn_reaper(gateway.clone(), config.reaper_interval);
    } else {
        tracing::info!("idle session reaping disabled");
    }

    let cors = match &config.cors_allowed_origin {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .map_err(|e| AppError::Config(format!("CORS_ALLOWED_ORIGIN is invalid: {e}")))?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    let app = routes::app_router(AppState::new(gateway))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
