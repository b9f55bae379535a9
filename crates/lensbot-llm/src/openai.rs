//! OpenAI-compatible chat-completions backend.
//!
//! `OpenAiBackend` talks to OpenAI's API or any service exposing the same
//! `/chat/completions` contract.

use async_trait::async_trait;
use reqwest::{Client, Response, header};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::LlmBackend;
use crate::error::{LlmError, RateLimitInfo, ResponseValidationError, Result};
use crate::types::{CompletionRequest, CompletionResponse, StopReason, Usage};

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication. Requests are sent unauthenticated when unset.
    pub api_key: Option<String>,

    /// Base URL for the API.
    pub base_url: String,

    /// Model to use (overrides the request model when set).
    pub model: Option<String>,

    /// Request timeout.
    pub timeout: Duration,

    /// Name for this backend instance.
    pub name: String,
}

impl OpenAiConfig {
    /// Create a new config for OpenAI.
    pub fn openai(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            model: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            name: "openai".to_string(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the backend name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────────────────

/// OpenAI-compatible API backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Add authentication headers to a request.
    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header(header::CONTENT_TYPE, "application/json");

        if let Some(ref api_key) = self.config.api_key {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", api_key))
        } else {
            builder
        }
    }

    /// Convert our CompletionRequest to OpenAI-compatible format.
    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAiChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.extend(request.messages.iter().map(|m| OpenAiMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }));

        let model = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| request.model.clone());

        OpenAiChatRequest {
            model,
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: request.temperature,
        }
    }

    /// Handle a completed HTTP exchange.
    async fn handle_response(response: Response) -> Result<CompletionResponse> {
        if !response.status().is_success() {
            return Err(handle_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: OpenAiChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Serialization(e.to_string()))?;

        Ok(parsed.try_into()?)
    }
}

/// Map a non-success HTTP response to an error.
///
/// Shared with the embeddings client, which speaks the same error format.
pub(crate) async fn handle_error_response(response: Response) -> LlmError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<OpenAiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

    match status.as_u16() {
        401 | 403 => LlmError::Auth(message),
        429 => LlmError::RateLimit(RateLimitInfo::parse_openai(
            &message,
            retry_after.as_deref(),
        )),
        500..=599 => LlmError::Backend(format!("Server error: {}", message)),
        _ => LlmError::Backend(message),
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let openai_request = self.to_openai_request(&request);

        tracing::debug!(
            backend = %self.config.name,
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .add_headers(self.client.post(self.completions_url()))
            .json(&openai_request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

/// Create a shared OpenAI-compatible backend.
pub fn create_shared_backend(config: OpenAiConfig) -> Result<Arc<dyn LlmBackend>> {
    Ok(Arc::new(OpenAiBackend::new(config)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI API Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, serde::Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    id: String,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    model: String,
    usage: Option<OpenAiUsage>,
}

impl TryFrom<OpenAiChatResponse> for CompletionResponse {
    type Error = ResponseValidationError;

    fn try_from(resp: OpenAiChatResponse) -> std::result::Result<Self, Self::Error> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or(ResponseValidationError::NoChoices)?;

        let usage = resp
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: resp.id,
            model: resp.model,
            content: choice.message.content,
            stop_reason: Some(StopReason::from_finish_reason(
                choice.finish_reason.as_deref(),
            )),
            usage,
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct OpenAiErrorResponse {
    pub(crate) error: OpenAiError,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct OpenAiError {
    pub(crate) message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
