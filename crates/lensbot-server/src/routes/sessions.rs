//! Session management endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use lensbot_session::{ConversationState, Session, Turn};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Summary info for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub state: ConversationState,
    pub turn_count: usize,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Last activity time (RFC 3339).
    pub last_active: String,
}

/// Full session details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub id: String,
    pub state: ConversationState,
    /// Turns in chronological order.
    pub turns: Vec<Turn>,
    pub created_at: String,
    pub last_active: String,
}

/// Response for list sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    /// Sessions, most recently used first.
    pub sessions: Vec<SessionSummary>,
    pub total: usize,
    /// Maximum number of live sessions.
    pub capacity: usize,
    /// Idle expiry in seconds, if any.
    pub ttl_secs: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /sessions - List live sessions.
pub async fn list_sessions_handler(State(state): State<AppState>) -> Json<ListSessionsResponse> {
    let mut summaries = Vec::new();
    for id in state.sessions.list().await {
        // peek: listing must not refresh idle timers
        if let Some(handle) = state.sessions.peek(&id).await {
            summaries.push(session_to_summary(&*handle.lock().await));
        }
    }

    let stats = state.sessions.stats().await;
    let total = summaries.len();

    Json(ListSessionsResponse {
        sessions: summaries,
        total,
        capacity: stats.capacity,
        ttl_secs: stats.ttl_secs,
    })
}

/// GET /sessions/{id} - Get session details.
pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetail>, ServerError> {
    let handle = state.sessions.require(&session_id).await?;
    let session = handle.lock().await;
    Ok(Json(session_to_detail(&session)))
}

/// DELETE /sessions/{id} - Delete a session.
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    match state.sessions.remove(&session_id).await {
        Some(_) => {
            tracing::info!(session_id = %session_id, "Session deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ServerError::NotFound(format!(
            "Session {} not found",
            session_id
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn session_to_summary(session: &Session) -> SessionSummary {
    SessionSummary {
        id: session.id.clone(),
        state: session.state(),
        turn_count: session.turn_count(),
        created_at: session.created_at.to_rfc3339(),
        last_active: session.last_active.to_rfc3339(),
    }
}

fn session_to_detail(session: &Session) -> SessionDetail {
    SessionDetail {
        id: session.id.clone(),
        state: session.state(),
        turns: session.history().to_vec(),
        created_at: session.created_at.to_rfc3339(),
        last_active: session.last_active.to_rfc3339(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
