//! Conversation logic for the lensbot assistant.
//!
//! - [`knowledge`]: FAQ and myth collections and their embeddings
//! - [`matcher`]: exact and semantic lookup
//! - [`client`]: completion and embedding calls with retry
//! - [`orchestrator`]: the per-message decision flow

pub mod client;
pub mod error;
pub mod knowledge;
pub mod matcher;
pub mod orchestrator;

pub use client::{CompletionClient, CompletionSettings};
pub use error::{AgentError, KnowledgeError, Result};
pub use knowledge::{EmbeddedKnowledge, FaqItem, KnowledgeBase, KnowledgeEntry, MythItem, load_items};
pub use matcher::{DEFAULT_THRESHOLD, EmbeddingMatcher, ScoredMatch, find_exact};
pub use orchestrator::{Assistant, ConversationPolicy, KnowledgeIndex, Reply, ReplySource};
