//! Error types for session store operations.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists under this identifier.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The session existed but sat idle past its TTL.
    #[error("Session expired: {0}")]
    Expired(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, SessionError>;
