//! Text embeddings for semantic FAQ and myth lookup.
//!
//! # Implementations
//!
//! - [`OpenAiEmbedder`]: Uses an OpenAI-compatible `/embeddings` endpoint
//! - [`MockEmbedder`]: Deterministic hash-based vectors for testing
//! - [`StaticEmbedder`]: Hand-written text → vector table for exact-score tests

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, header};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{LlmError, ResponseValidationError, Result};
use crate::openai::{DEFAULT_OPENAI_BASE, handle_error_response};

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for generating text embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Get the dimensionality of embeddings produced by this embedder.
    fn dimensions(&self) -> usize;

    /// Get the name of this embedder.
    fn name(&self) -> &str;
}

/// A shared embedder that can be used across threads.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// A mock embedder for testing purposes.
///
/// The same text always produces the same unit-length vector, and different
/// texts are almost never similar enough to cross a matching threshold.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a new mock embedder with the specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut state = simple_hash(text);
        let mut embedding: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) as u16 as f32 / 32768.0) - 1.0
            })
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// djb2 over the lowercased text, so casing does not change the vector.
fn simple_hash(s: &str) -> u64 {
    s.to_lowercase()
        .bytes()
        .fold(5381u64, |hash, byte| hash.wrapping_mul(33).wrapping_add(byte as u64))
}

// ─────────────────────────────────────────────────────────────────────────────
// Static Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// An embedder backed by a fixed text → vector table.
///
/// Lets tests pin exact cosine scores. Unknown texts fail, which doubles as
/// a way to simulate an unreachable provider. Every call is counted.
#[derive(Debug, Default)]
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    failures: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the vector returned for `text`.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Number of `embed` calls made so far (including failed ones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts that were requested but had no registered vector.
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.vectors.get(text) {
            Some(vector) => Ok(vector.clone()),
            None => {
                self.failures.lock().push(text.to_string());
                Err(LlmError::Backend(format!(
                    "StaticEmbedder: no vector registered for {:?}",
                    text
                )))
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.vectors.values().next().map(Vec::len).unwrap_or(0)
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for OpenAI embeddings.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    /// API key for authentication.
    pub api_key: Option<String>,
    /// Base URL for the API.
    pub base_url: String,
    /// Model to use for embeddings.
    pub model: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiEmbedderConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI embeddings API client.
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiEmbedderConfig,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI embedder.
    pub fn new(config: OpenAiEmbedderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let dimensions = match config.model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        };

        Ok(Self {
            client,
            config,
            dimensions,
        })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.config.base_url)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| {
            ResponseValidationError::EmbeddingCount {
                expected: 1,
                actual: 0,
            }
            .into()
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: texts.iter().map(|s| s.to_string()).collect(),
        };

        tracing::debug!(model = %request.model, inputs = texts.len(), "Requesting embeddings");

        let mut builder = self
            .client
            .post(self.embeddings_url())
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(ref api_key) = self.config.api_key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", api_key));
        }

        let response = builder.json(&request).send().await?;
        if !response.status().is_success() {
            return Err(handle_error_response(response).await);
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Serialization(format!("Failed to parse response: {}", e)))?;

        into_ordered_vectors(result, texts.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Sort returned vectors by index and check one came back per input.
fn into_ordered_vectors(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut data = response.data;
    if data.len() != expected {
        return Err(ResponseValidationError::EmbeddingCount {
            expected,
            actual: data.len(),
        }
        .into());
    }
    data.sort_by_key(|e| e.index);
    Ok(data.into_iter().map(|e| e.embedding).collect())
}

#[derive(Debug, serde::Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Provider-agnostic description of the embedder to build.
///
/// The binary fills this from its `[embedding]` config section, which keeps
/// this crate independent of the config crate.
#[derive(Debug, Clone)]
pub struct EmbedderSpec {
    /// Provider name: "openai" or "mock".
    pub provider: String,
    /// API key for the "openai" provider.
    pub api_key: Option<String>,
    /// Model name override.
    pub model: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

/// Build a `SharedEmbedder` from a spec.
///
/// A missing key is not an error here; the provider rejects the first call
/// and the caller's retry/fallback policy takes over.
pub fn build_embedder(spec: &EmbedderSpec) -> Result<SharedEmbedder> {
    match spec.provider.as_str() {
        "openai" => {
            let mut config = OpenAiEmbedderConfig::new(spec.api_key.clone());
            if let Some(ref model) = spec.model {
                config = config.with_model(model);
            }
            if let Some(ref base_url) = spec.base_url {
                config = config.with_base_url(base_url);
            }
            if let Some(timeout) = spec.timeout {
                config = config.with_timeout(timeout);
            }
            Ok(Arc::new(OpenAiEmbedder::new(config)?))
        }
        "mock" => Ok(Arc::new(MockEmbedder::default())),
        other => Err(LlmError::Config(format!(
            "Unknown embedding provider '{}'. Valid: openai, mock",
            other
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Utility Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Calculate cosine similarity between two embeddings.
///
/// Returns 0.0 when the lengths differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = MockEmbedder::new(128);
        let embedding = embedder.embed("hello world").await.unwrap();

        assert_eq!(embedding.len(), 128);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic_and_case_insensitive() {
        let embedder = MockEmbedder::default();
        let a = embedder.embed("Do lenses hurt?").await.unwrap();
        let b = embedder.embed("do lenses hurt?").await.unwrap();
        assert_eq!(a, b);

        let c = embedder.embed("something else").await.unwrap();
        assert!(cosine_similarity(&a, &c) < 0.9);
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let embedder = MockEmbedder::default();
        let batch = embedder.embed_batch(&["one", "two"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.embed("two").await.unwrap());
    }

    #[tokio::test]
    async fn test_static_embedder() {
        let embedder = StaticEmbedder::new().with_vector("hi", vec![1.0, 0.0]);

        assert_eq!(embedder.embed("hi").await.unwrap(), vec![1.0, 0.0]);
        assert!(embedder.embed("unknown").await.is_err());
        assert_eq!(embedder.call_count(), 2);
        assert_eq!(embedder.failures(), vec!["unknown".to_string()]);
        assert_eq!(embedder.dimensions(), 2);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        // scale-invariant
        assert!((cosine_similarity(&[2.0, 2.0], &[1.0, 1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_into_ordered_vectors() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]}"#,
        )
        .unwrap();
        let vectors = into_ordered_vectors(response, 2).unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
    }

    #[test]
    fn test_into_ordered_vectors_count_mismatch() {
        let response: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        let err = into_ordered_vectors(response, 1).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_build_embedder() {
        let spec = EmbedderSpec {
            provider: "mock".to_string(),
            api_key: None,
            model: None,
            base_url: None,
            timeout: None,
        };
        assert_eq!(build_embedder(&spec).unwrap().name(), "mock");

        let openai = EmbedderSpec {
            provider: "openai".to_string(),
            model: Some("text-embedding-3-large".to_string()),
            ..spec.clone()
        };
        assert_eq!(build_embedder(&openai).unwrap().dimensions(), 3072);

        let unknown = EmbedderSpec {
            provider: "local".to_string(),
            ..spec
        };
        assert!(build_embedder(&unknown).is_err());
    }
}
