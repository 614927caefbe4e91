use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions/start", post(handlers::start_session))
        .route("/sessions/:session_id/stop", post(handlers::stop_session))
        // Audio ingest
        .route("/sessions/:session_id/chunks", post(handlers::ingest_chunk))
        // Session queries
        .route("/sessions/:session_id/status", get(handlers::get_status))
        .route(
            "/sessions/:session_id/transcript",
            get(handlers::get_transcript),
        )
        .route("/sessions/:session_id/prompts", get(handlers::get_prompts))
        .route("/sessions/:session_id/summary", get(handlers::get_summary))
        // Request logging middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
