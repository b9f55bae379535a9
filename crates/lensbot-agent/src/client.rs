//! Completion client: the remote model as the conversation sees it.
//!
//! Wraps a chat backend and an optional embedder behind one [`RetryPolicy`],
//! so every remote dependency fails the same way.

use lensbot_llm::{
    CompletionRequest, LlmError, Message, Result, RetryPolicy, SharedBackend, SharedEmbedder,
    with_retry,
};
use lensbot_session::{Role, Turn};

/// Parameters sent with every completion request.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: lensbot_llm::DEFAULT_CHAT_MODEL.to_string(),
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

/// Chat completion and embedding with retry.
#[derive(Clone)]
pub struct CompletionClient {
    backend: SharedBackend,
    embedder: Option<SharedEmbedder>,
    settings: CompletionSettings,
    retry: RetryPolicy,
}

impl CompletionClient {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            embedder: None,
            settings: CompletionSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_embedder(mut self, embedder: SharedEmbedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_settings(mut self, settings: CompletionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    /// Build the provider request for a system prompt and history window.
    pub fn build_request(&self, system_prompt: &str, history: &[Turn]) -> CompletionRequest {
        let messages = history
            .iter()
            .map(|turn| match turn.role {
                Role::User => Message::user(turn.content.clone()),
                Role::Assistant => Message::assistant(turn.content.clone()),
            })
            .collect();

        CompletionRequest::new(&self.settings.model, messages, self.settings.max_tokens)
            .with_system(system_prompt)
            .with_temperature(self.settings.temperature)
    }

    /// Generate a reply to `history`. Returns the trimmed text.
    ///
    /// Any failure, including a response without content, is retried per
    /// the policy; the last error is returned.
    pub async fn complete(&self, system_prompt: &str, history: &[Turn]) -> Result<String> {
        let request = self.build_request(system_prompt, history);

        with_retry(&self.retry, "complete", || async {
            let response = self.backend.complete(request.clone()).await?;
            tracing::debug!(
                id = %response.id,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Completion received"
            );
            Ok(response.into_text()?)
        })
        .await
    }

    fn embedder(&self) -> Result<&SharedEmbedder> {
        self.embedder
            .as_ref()
            .ok_or_else(|| LlmError::Config("no embedder configured".to_string()))
    }

    /// Embed one text, with retry.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = self.embedder()?;
        with_retry(&self.retry, "embed", || embedder.embed(text)).await
    }

    /// Embed several texts in one batch, with retry.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.embedder()?;
        with_retry(&self.retry, "embed_batch", || embedder.embed_batch(texts)).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lensbot_llm::{MockBackend, MockResponse, StaticEmbedder};
    use std::sync::Arc;

    #[test]
    fn test_build_request() {
        let client = CompletionClient::new(Arc::new(MockBackend::failing()));
        let history = vec![Turn::user("Hi"), Turn::assistant("Hello"), Turn::user("Help")];

        let request = client.build_request("Be helpful", &history);

        assert_eq!(request.model, "gpt-3.5-turbo");
        assert_eq!(request.max_tokens, 150);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.system.as_deref(), Some("Be helpful"));
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1], Message::assistant("Hello"));
        assert_eq!(request.messages[2], Message::user("Help"));
    }

    #[tokio::test]
    async fn test_complete_trims_text() {
        let backend = Arc::new(MockBackend::with_text("  Dailies are single-use.  \n"));
        let client = CompletionClient::new(backend.clone());

        let text = client.complete("sys", &[Turn::user("q")]).await.unwrap();
        assert_eq!(text, "Dailies are single-use.");
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_complete_retries_once() {
        let backend = Arc::new(MockBackend::new(vec![
            MockResponse::error("timeout"),
            MockResponse::text("Recovered"),
        ]));
        let client = CompletionClient::new(backend.clone());

        let text = client.complete("sys", &[Turn::user("q")]).await.unwrap();
        assert_eq!(text, "Recovered");
        assert_eq!(backend.request_count(), 2);
    }

    #[tokio::test]
    async fn test_complete_fails_after_two_attempts() {
        let backend = Arc::new(MockBackend::failing());
        let client = CompletionClient::new(backend.clone());

        assert!(client.complete("sys", &[Turn::user("q")]).await.is_err());
        assert_eq!(backend.request_count(), 2);
    }

    #[tokio::test]
    async fn test_complete_respects_custom_policy() {
        let backend = Arc::new(MockBackend::failing());
        let client = CompletionClient::new(backend.clone())
            .with_retry_policy(RetryPolicy::default().with_max_retries(3));

        assert!(client.complete("sys", &[]).await.is_err());
        assert_eq!(backend.request_count(), 4);
    }

    #[tokio::test]
    async fn test_embed_without_embedder() {
        let client = CompletionClient::new(Arc::new(MockBackend::failing()));
        assert!(!client.has_embedder());
        assert!(matches!(
            client.embed("x").await,
            Err(LlmError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_retries_once() {
        let embedder = Arc::new(StaticEmbedder::new().with_vector("known", vec![1.0, 0.0]));
        let client =
            CompletionClient::new(Arc::new(MockBackend::failing())).with_embedder(embedder.clone());

        assert_eq!(client.embed("known").await.unwrap(), vec![1.0, 0.0]);
        assert!(client.embed("unknown").await.is_err());
        // one call for "known", two for "unknown"
        assert_eq!(embedder.call_count(), 3);
    }
}
