//! Chat endpoint.
//!
//! Always answers 200 with a textual reply, degraded or not. Malformed bodies
//! are rejected by the `Json` extractor before reaching the handler.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Caller-chosen conversation identifier.
    pub session_id: String,

    /// The user's message. May be empty to request the greeting.
    pub message: String,
}

/// Response body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /chat
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let reply = state.chat(&request.session_id, &request.message).await;

    tracing::info!(
        session_id = %request.session_id,
        source = ?reply.source,
        "Chat reply sent"
    );

    Json(ChatResponse {
        response: reply.text,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
