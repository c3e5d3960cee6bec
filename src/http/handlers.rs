use super::socket;
use super::state::AppState;
use crate::protocol::{ProtocolError, SessionContext};
use crate::storage::folder_key;
use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpgradeParams {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /?sessionId=<id>
/// Validate the session, then upgrade to the recording WebSocket
pub async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<UpgradeParams>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let session_id = match params.session_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                ProtocolError::MissingSession.to_string(),
            )
                .into_response()
        }
    };

    let record = match state.lookup.lookup(&session_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            warn!("Rejected upgrade for unknown session {}", session_id);
            return (
                StatusCode::BAD_REQUEST,
                ProtocolError::InvalidSession.to_string(),
            )
                .into_response();
        }
        Err(e) => {
            error!("Session lookup for {} failed: {:#}", session_id, e);
            return (
                StatusCode::BAD_REQUEST,
                ProtocolError::LookupFailure.to_string(),
            )
                .into_response();
        }
    };

    let ws = match ws {
        Some(ws) => ws,
        None => {
            return (StatusCode::UPGRADE_REQUIRED, "WebSocket upgrade required").into_response()
        }
    };

    info!(
        "Upgrading session {} ({} questions)",
        session_id,
        record.questions.len()
    );

    let context = SessionContext::new(session_id, record.questions);
    let sockets = state.sockets.clone();
    ws.on_upgrade(move |socket| sockets.track_future(socket::run(socket, context, state)))
}

/// GET /sessions/:session_id/status
/// Buffer state of a live session
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.pipeline.registry().status(&session_id).await {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} is not recording", session_id),
            }),
        )
            .into_response(),
    }
}

/// GET /sessions/:session_id/parts
/// Stored objects for a session, listed by prefix
pub async fn get_session_parts(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store().list(&folder_key(&session_id)).await {
        Ok(objects) => (StatusCode::OK, Json(objects)).into_response(),
        Err(e) => {
            error!("Failed to list parts for session {}: {}", session_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to list parts: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
