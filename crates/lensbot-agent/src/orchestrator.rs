//! Conversation orchestration: one incoming message in, one reply out.
//!
//! Per message, in order:
//!
//! ```text
//! empty? ── yes ──▶ greeting
//!   │ no
//!   ▼
//! exact FAQ ─▶ exact myth ─▶ semantic FAQ ─▶ semantic myth ─▶ completion
//!                            (embedding strategy only)         │
//!                                                   success ◀──┴──▶ apology
//! ```
//!
//! Canned answers (FAQ/myth) leave history untouched unless the policy says
//! otherwise. Only the completion path appends the user turn.

use lensbot_session::{Session, Turn};
use serde::Serialize;

use crate::client::CompletionClient;
use crate::error::Result;
use crate::knowledge::{EmbeddedKnowledge, KnowledgeBase, KnowledgeEntry};
use crate::matcher::{EmbeddingMatcher, find_exact};

/// Fixed texts and history rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationPolicy {
    pub system_prompt: String,
    pub greeting: String,
    pub apology: String,
    /// Most recent turns forwarded to the model, including the new message.
    pub history_window: usize,
    /// Record canned exchanges as turns.
    pub remember_canned_answers: bool,
    /// Record the apology as an assistant turn.
    pub record_fallback: bool,
}

impl Default for ConversationPolicy {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant specialized in contact lens guidance."
                .to_string(),
            greeting: "Hi, I'm your Lens4U assistant. Do you have any questions or need help choosing a contact lens?".to_string(),
            apology: "Sorry, I'm experiencing an issue. Please try again.".to_string(),
            history_window: 10,
            remember_canned_answers: false,
            record_fallback: false,
        }
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplySource {
    Greeting,
    Faq,
    Myth,
    SemanticFaq { score: f32 },
    SemanticMyth { score: f32 },
    Generated,
    Fallback,
}

impl ReplySource {
    /// True for FAQ and myth answers, exact or semantic.
    pub fn is_canned(&self) -> bool {
        matches!(
            self,
            Self::Faq | Self::Myth | Self::SemanticFaq { .. } | Self::SemanticMyth { .. }
        )
    }
}

/// The text to send back plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    fn new(text: impl Into<String>, source: ReplySource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Index
// ─────────────────────────────────────────────────────────────────────────────

/// Knowledge plus whatever the active strategy needs to search it.
#[derive(Debug, Clone)]
pub enum KnowledgeIndex {
    /// Exact matching only.
    Exact(KnowledgeBase),
    /// Exact matching, then cosine similarity.
    Semantic {
        knowledge: EmbeddedKnowledge,
        matcher: EmbeddingMatcher,
    },
}

impl KnowledgeIndex {
    pub fn exact(base: KnowledgeBase) -> Self {
        Self::Exact(base)
    }

    /// Embed every item key once and build a semantic index.
    pub async fn semantic(
        base: KnowledgeBase,
        client: &CompletionClient,
        threshold: f32,
    ) -> Result<Self> {
        Ok(Self::Semantic {
            knowledge: base.embed(client).await?,
            matcher: EmbeddingMatcher::new(threshold),
        })
    }

    pub fn base(&self) -> &KnowledgeBase {
        match self {
            Self::Exact(base) => base,
            Self::Semantic { knowledge, .. } => &knowledge.base,
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Semantic { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Assistant
// ─────────────────────────────────────────────────────────────────────────────

/// The conversation orchestrator.
pub struct Assistant {
    client: CompletionClient,
    knowledge: KnowledgeIndex,
    policy: ConversationPolicy,
}

impl Assistant {
    pub fn new(client: CompletionClient, knowledge: KnowledgeIndex) -> Self {
        Self {
            client,
            knowledge,
            policy: ConversationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConversationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ConversationPolicy {
        &self.policy
    }

    pub fn knowledge(&self) -> &KnowledgeIndex {
        &self.knowledge
    }

    /// Handle one message for `session`.
    ///
    /// Never fails: remote errors end in the apology. The caller must hold
    /// the session's lock for the duration of the call.
    pub async fn respond(&self, session: &mut Session, message: &str) -> Reply {
        let message = message.trim();

        if message.is_empty() {
            if !session.is_greeted() {
                session.mark_greeted();
            }
            tracing::debug!(session_id = %session.id, "Sending greeting");
            return Reply::new(&self.policy.greeting, ReplySource::Greeting);
        }

        if !session.is_greeted() {
            session.mark_greeted();
        }

        if let Some(reply) = self.lookup(message).await {
            tracing::debug!(
                session_id = %session.id,
                source = ?reply.source,
                "Answered from knowledge base"
            );
            if self.policy.remember_canned_answers {
                session.push(Turn::user(message));
                session.push(Turn::assistant(reply.text.clone()));
            }
            return reply;
        }

        session.push(Turn::user(message));
        let context = session.recent(self.policy.history_window);

        let result = self.client.complete(&self.policy.system_prompt, context).await;

        match result {
            Ok(text) => {
                session.push(Turn::assistant(text.clone()));
                Reply::new(text, ReplySource::Generated)
            }
            Err(e) => {
                tracing::error!(
                    session_id = %session.id,
                    error = %e,
                    "Completion failed after retries, sending apology"
                );
                if self.policy.record_fallback {
                    session.push(Turn::assistant(self.policy.apology.clone()));
                }
                Reply::new(&self.policy.apology, ReplySource::Fallback)
            }
        }
    }

    /// Search the knowledge base for a canned answer.
    async fn lookup(&self, message: &str) -> Option<Reply> {
        let base = self.knowledge.base();

        if let Some(faq) = find_exact(message, &base.faqs) {
            return Some(Reply::new(faq.value(), ReplySource::Faq));
        }
        if let Some(myth) = find_exact(message, &base.myths) {
            return Some(Reply::new(myth.value(), ReplySource::Myth));
        }

        let KnowledgeIndex::Semantic { knowledge, matcher } = &self.knowledge else {
            return None;
        };

        // one embedding per message, shared by both passes
        let query = match self.client.embed(message).await {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed, skipping semantic match");
                return None;
            }
        };

        if let Some(hit) = matcher.find(&query, &knowledge.base.faqs, &knowledge.faq_vectors) {
            return Some(Reply::new(
                hit.item.value(),
                ReplySource::SemanticFaq { score: hit.score },
            ));
        }
        if let Some(hit) = matcher.find(&query, &knowledge.base.myths, &knowledge.myth_vectors) {
            return Some(Reply::new(
                hit.item.value(),
                ReplySource::SemanticMyth { score: hit.score },
            ));
        }

        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
