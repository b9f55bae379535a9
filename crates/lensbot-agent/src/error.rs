//! Error types for the agent crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// LLM backend or embedding error.
    #[error("LLM error: {0}")]
    Llm(#[from] lensbot_llm::LlmError),

    /// Knowledge base could not be loaded.
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures while loading or indexing the knowledge files. All are fatal at
/// startup.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// The file could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a JSON array of the expected records.
    #[error("failed to parse '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Precomputing item embeddings failed.
    #[error("failed to embed {collection}: {source}")]
    Embed {
        collection: &'static str,
        source: lensbot_llm::LlmError,
    },

    /// The embedder returned a different number of vectors than items.
    #[error("embedding {collection}: expected {expected} vectors, got {actual}")]
    VectorCount {
        collection: &'static str,
        expected: usize,
        actual: usize,
    },
}
