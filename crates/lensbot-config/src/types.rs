//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [llm]            # chat-completion provider
//! [embedding]      # embedding provider (embedding strategy only)
//! [retry]          # shared retry policy for remote calls
//! [matching]       # exact or embedding lookup
//! [knowledge]      # FAQ and myth files
//! [conversation]   # prompts and history policy
//! [session]        # session store bounds
//! [server]         # HTTP listener
//! [logging]        # log file location
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Environment variable holding the API key unless configured otherwise.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Default similarity threshold for the embedding strategy.
pub const DEFAULT_THRESHOLD: f32 = 0.9;
/// Number of most recent turns sent to the model.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant specialized in contact lens guidance.";
pub const DEFAULT_GREETING: &str = "Hi, I'm your Lens4U assistant. Do you have any questions or need help choosing a contact lens?";
pub const DEFAULT_APOLOGY: &str = "Sorry, I'm experiencing an issue. Please try again.";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. Use the `*_config()` accessors to
/// read a section with defaults applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensbotConfig {
    pub llm: Option<LlmConfig>,
    pub embedding: Option<EmbeddingConfig>,
    pub retry: Option<RetryConfig>,
    pub matching: Option<MatchingConfig>,
    pub knowledge: Option<KnowledgeConfig>,
    pub conversation: Option<ConversationConfig>,
    pub session: Option<SessionConfig>,
    pub server: Option<ServerConfig>,
    pub logging: Option<LoggingConfig>,
}

impl LensbotConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Merging is per section: a section present in `other` replaces ours
    /// wholesale.
    pub fn merge(&mut self, other: LensbotConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }
        if other.embedding.is_some() {
            self.embedding = other.embedding;
        }
        if other.retry.is_some() {
            self.retry = other.retry;
        }
        if other.matching.is_some() {
            self.matching = other.matching;
        }
        if other.knowledge.is_some() {
            self.knowledge = other.knowledge;
        }
        if other.conversation.is_some() {
            self.conversation = other.conversation;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    pub fn llm_config(&self) -> LlmConfig {
        self.llm.clone().unwrap_or_default()
    }

    pub fn embedding_config(&self) -> EmbeddingConfig {
        self.embedding.clone().unwrap_or_default()
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn matching_config(&self) -> MatchingConfig {
        self.matching.clone().unwrap_or_default()
    }

    pub fn knowledge_config(&self) -> KnowledgeConfig {
        self.knowledge.clone().unwrap_or_default()
    }

    pub fn conversation_config(&self) -> ConversationConfig {
        self.conversation.clone().unwrap_or_default()
    }

    pub fn session_config(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    pub fn server_config(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    pub fn logging_config(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check value ranges that the TOML schema alone cannot express.
    pub fn validate(&self) -> Result<()> {
        let threshold = self.matching_config().threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid {
                field: "matching.threshold",
                reason: format!("{} is outside [-1, 1]", threshold),
            });
        }

        if self.conversation_config().history_window == 0 {
            return Err(ConfigError::Invalid {
                field: "conversation.history_window",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.session_config().max_sessions == 0 {
            return Err(ConfigError::Invalid {
                field: "session.max_sessions",
                reason: "must be at least 1".to_string(),
            });
        }

        let temperature = self.llm_config().temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                field: "llm.temperature",
                reason: format!("{} is outside [0, 2]", temperature),
            });
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Chat-completion provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier.
    pub model: String,
    /// OpenAI-compatible API base URL.
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Token budget per completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_tokens: 150,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// Empty values count as unset.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Embedding provider settings, used by the embedding strategy.
///
/// ```toml
/// [embedding]
/// provider = "openai"   # "openai" or "mock"
/// model = "text-embedding-3-small"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    /// Base URL override. Falls back to `llm.base_url`.
    pub base_url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: None,
        }
    }
}

/// Embedding backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Mock,
}

impl EmbeddingProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Retry policy applied to every remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Initial delay between attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_ms: 0,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Matching Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// How incoming messages are matched against the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub strategy: MatchStrategy,
    /// Cosine score a semantic match must strictly exceed.
    pub threshold: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Exact,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Knowledge lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Case-insensitive whole-string equality only.
    #[default]
    Exact,
    /// Exact equality first, then cosine similarity over embeddings.
    Embedding,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Embedding => "embedding",
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "embedding" => Ok(Self::Embedding),
            other => Err(ConfigError::Invalid {
                field: "matching.strategy",
                reason: format!("unknown strategy '{}' (valid: exact, embedding)", other),
            }),
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Locations of the FAQ and myth documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub faqs: PathBuf,
    pub myths: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            faqs: PathBuf::from("faqs.json"),
            myths: PathBuf::from("myths.json"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed texts and history policy for the conversation orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub system_prompt: String,
    /// Sent for an empty message.
    pub greeting: String,
    /// Sent when the completion call fails on every attempt.
    pub apology: String,
    /// Most recent turns forwarded to the model.
    pub history_window: usize,
    /// Record FAQ/myth exchanges as conversation turns.
    pub remember_canned_answers: bool,
    /// Record the apology as an assistant turn.
    pub record_fallback: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            apology: DEFAULT_APOLOGY.to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
            remember_canned_answers: false,
            record_fallback: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session store bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum sessions held before the least recently used is evicted.
    pub max_sessions: usize,
    /// Idle time before a session expires. 0 disables expiry.
    pub ttl_secs: u64,
    /// How often the background sweep removes expired sessions.
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            ttl_secs: 0,
            cleanup_interval_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Enable request logging.
    pub request_logging: bool,
    /// Directory served under `/static`, if it exists.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            bind: "127.0.0.1".to_string(),
            request_logging: true,
            static_dir: Some(PathBuf::from("static")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily rolling JSON log files.
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
