//! LLM Backend trait and implementations.
//!
//! This module defines the abstraction layer over chat-completion providers
//! and provides a scripted mock implementation for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse, StopReason, Usage};

// ─────────────────────────────────────────────────────────────────────────────
// Shared Retry Logic
// ─────────────────────────────────────────────────────────────────────────────

/// How many times a failed remote call is repeated, and how long to wait
/// between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Delay before each retry; doubles after every retry. Zero disables it.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Set the number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Execute an async operation, retrying on any error.
///
/// Every failure is logged; the error of the final attempt is returned.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = policy.backoff;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    transient = e.is_transient(),
                    error = %e,
                    "Remote call failed"
                );

                if attempt >= policy.max_attempts() {
                    return Err(e);
                }

                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for chat-completion providers.
///
/// Implementations perform exactly one remote call per `complete`; retrying
/// is the caller's decision.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Execute a completion request and return the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the name of this backend.
    fn name(&self) -> &str;
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted outcome for [`MockBackend`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a successful completion with this text.
    Text(String),
    /// Fail with a backend error carrying this message.
    Error(String),
}

impl MockResponse {
    /// Shorthand for a successful text response.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Shorthand for a failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// A mock backend for testing purposes.
///
/// Returns pre-configured outcomes in order and records every request it
/// receives. Once the script is exhausted every call fails.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    responses: Mutex<VecDeque<MockResponse>>,
    request_log: Mutex<Vec<CompletionRequest>>,
}

impl MockBackend {
    /// Create a new mock backend with the given scripted outcomes.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            responses: Mutex::new(responses.into()),
            request_log: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock backend with a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![MockResponse::text(text)])
    }

    /// Create a mock backend whose every call fails.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.request_log.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let count = {
            let mut log = self.request_log.lock();
            log.push(request);
            log.len()
        };

        match self.responses.lock().pop_front() {
            Some(MockResponse::Text(text)) => Ok(CompletionResponse::new(
                format!("mock_msg_{}", count),
                "mock-model",
                text,
                StopReason::EndTurn,
                Usage::new(10, 20),
            )),
            Some(MockResponse::Error(message)) => Err(LlmError::Backend(message)),
            None => Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
