//! API routes.

pub mod chat;
pub mod health;
pub mod sessions;

pub use chat::{ChatRequest, ChatResponse, chat_handler};
pub use health::{HealthResponse, health_routes};
pub use sessions::{
    ListSessionsResponse, SessionDetail, SessionSummary, delete_session_handler,
    get_session_handler, list_sessions_handler,
};
