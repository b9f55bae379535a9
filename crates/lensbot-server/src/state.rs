//! Application state shared across handlers.

use std::sync::Arc;

use lensbot_agent::{Assistant, Reply};
use lensbot_session::{SessionStore, StoreConfig};
use tracing::debug;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The conversation orchestrator.
    pub assistant: Arc<Assistant>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Conversation state keyed by caller-supplied identifier.
    pub sessions: SessionStore,
}

impl AppState {
    /// Create application state with a default session store.
    pub fn new(assistant: Assistant, config: ServerConfig) -> Self {
        Self::with_sessions(assistant, config, SessionStore::new(StoreConfig::default()))
    }

    /// Create application state around an existing session store.
    pub fn with_sessions(assistant: Assistant, config: ServerConfig, sessions: SessionStore) -> Self {
        Self {
            assistant: Arc::new(assistant),
            config: Arc::new(config),
            sessions,
        }
    }

    /// Run one conversational turn for `session_id`.
    ///
    /// The session lock is held until the reply is ready, so turns for the
    /// same identifier never interleave. The idle timer restarts when the
    /// turn finishes, not when it starts.
    pub async fn chat(&self, session_id: &str, message: &str) -> Reply {
        let handle = self.sessions.get_or_create(session_id).await;
        let mut session = handle.lock().await;
        let reply = self.assistant.respond(&mut session, message).await;
        session.touch();
        self.sessions.touch(session_id).await;

        debug!(
            session_id = %session_id,
            source = ?reply.source,
            turns = session.turn_count(),
            "Turn complete"
        );
        reply
    }
}
