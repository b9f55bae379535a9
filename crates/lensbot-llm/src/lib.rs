//! LLM client abstraction for lensbot.
//!
//! This crate provides the transport half of the completion client: a
//! provider-agnostic [`LlmBackend`] trait for chat completions, an
//! [`Embedder`] trait for text embeddings, OpenAI-compatible
//! implementations of both, and the shared [`with_retry`] helper.
//!
//! ```text
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │  LlmBackend trait        │   │  Embedder trait          │
//! │  - complete() -> Response│   │  - embed() -> Vec<f32>   │
//! └──────────────────────────┘   └──────────────────────────┘
//!        │            │                 │           │
//!        ▼            ▼                 ▼           ▼
//!   ┌────────┐  ┌──────────┐      ┌────────┐  ┌────────────┐
//!   │ OpenAI │  │   Mock   │      │ OpenAI │  │Mock/Static │
//!   └────────┘  └──────────┘      └────────┘  └────────────┘
//! ```

pub mod backend;
pub mod embeddings;
pub mod error;
pub mod openai;
pub mod types;

pub use backend::{LlmBackend, MockBackend, MockResponse, RetryPolicy, SharedBackend, with_retry};
pub use error::{LlmError, RateLimitInfo, ResponseValidationError, Result};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};

pub use embeddings::{
    DEFAULT_EMBEDDING_MODEL, Embedder, EmbedderSpec, MockEmbedder, OpenAiEmbedder,
    OpenAiEmbedderConfig, SharedEmbedder, StaticEmbedder, build_embedder, cosine_similarity,
};

pub use openai::{
    DEFAULT_CHAT_MODEL, DEFAULT_OPENAI_BASE, OpenAiBackend, OpenAiConfig, create_shared_backend,
};
