use super::state::AppState;
use crate::audio::AudioChunk;
use crate::error::SessionError;
use crate::session::SessionController;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,
    pub coach_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub stats: crate::session::SessionStats,
    pub summary: crate::summary::SessionSummary,
}

#[derive(Debug, Deserialize)]
pub struct ChunkRequest {
    /// Monotonic per-session sequence number assigned by the client;
    /// resending a sequence is safe and deduplicated
    pub sequence: u64,
    /// Base64-encoded audio payload
    pub payload: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub sequence: u64,
    pub accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::CaptureUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::ChunkRejected { .. } | SessionError::InvalidState { .. } => {
            StatusCode::CONFLICT
        }
        SessionError::OrderViolation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn find_session(state: &AppState, session_id: &str) -> Option<Arc<SessionController>> {
    state.sessions.read().await.get(session_id).map(Arc::clone)
}

fn not_found(session_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {} not found", session_id),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/start
/// Acquire capture and start a new live session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

    info!("Starting session: {}", session_id);

    let session = Arc::new(
        SessionController::new(
            session_id.clone(),
            state.session_config.clone(),
            state.deps.clone(),
        )
        .with_participants(req.coach_id, req.client_id),
    );

    // Reserve the id under the write lock before starting, so concurrent
    // starts with the same id cannot both bring up a pipeline.
    {
        let mut sessions = state.sessions.write().await;
        if sessions.contains_key(&session_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Session {} already exists", session_id),
                }),
            )
                .into_response();
        }
        sessions.insert(session_id.clone(), Arc::clone(&session));
    }

    if let Err(e) = session.start().await {
        error!("Failed to start session: {}", e);
        state.sessions.write().await.remove(&session_id);
        return (
            error_status(&e),
            Json(ErrorResponse {
                error: format!("Failed to start session: {}", e),
            }),
        )
            .into_response();
    }

    info!("Session started: {}", session_id);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id,
            status: "recording".to_string(),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/stop
/// Stop intake, drain the pipeline, and return the post-session summary
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping session: {}", session_id);

    let Some(session) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match session.stop().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(StopSessionResponse {
                session_id: session_id.clone(),
                status: "closed".to_string(),
                stats: session.stats().await,
                summary,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop session: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: format!("Failed to stop session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /sessions/:session_id/chunks
/// Push one audio chunk into the pipeline
pub async fn ingest_chunk(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<ChunkRequest>,
) -> impl IntoResponse {
    let Some(session) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    let payload = match base64::engine::general_purpose::STANDARD.decode(&req.payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid chunk payload: {}", e),
                }),
            )
                .into_response();
        }
    };

    let chunk = AudioChunk {
        session_id: session_id.clone(),
        sequence: req.sequence,
        captured_at: Utc::now(),
        payload,
    };

    match session.ingest(chunk).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ChunkResponse {
                sequence: req.sequence,
                accepted: true,
            }),
        )
            .into_response(),
        Err(e) => (
            error_status(&e),
            Json(ErrorResponse {
                error: format!("Chunk rejected: {}", e),
            }),
        )
            .into_response(),
    }
}

/// GET /sessions/:session_id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/transcript
/// Ordered transcript accumulated so far
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => (StatusCode::OK, Json(session.transcript().await)).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/prompts
/// Prompts in rendering order, priority-first
pub async fn get_prompts(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => (StatusCode::OK, Json(session.prompts().await)).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/summary
/// Post-session summary; 404 until the session has closed
pub async fn get_summary(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = find_session(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match session.summary().await {
        Some(summary) => (StatusCode::OK, Json(summary)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} has no summary yet", session_id),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
