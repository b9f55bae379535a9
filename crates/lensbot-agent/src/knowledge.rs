//! FAQ and myth collections loaded from JSON at startup.
//!
//! Each file is a JSON array of records in collection order:
//!
//! ```json
//! [{"question": "Can I sleep in my lenses?", "answer": "Only if ..."}]
//! [{"myth": "Lenses can get lost behind the eye.", "bust": "They can't ..."}]
//! ```
//!
//! Collections are read-only after load. In the embedding strategy each
//! item's key text is embedded once, here, and never recomputed.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::CompletionClient;
use crate::error::KnowledgeError;

/// A record that can be matched on one field and answered with another.
pub trait KnowledgeEntry {
    /// Text compared against the incoming message.
    fn key(&self) -> &str;
    /// Text returned on a match.
    fn value(&self) -> &str;
}

/// A frequently asked question with its canned answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

impl KnowledgeEntry for FaqItem {
    fn key(&self) -> &str {
        &self.question
    }

    fn value(&self) -> &str {
        &self.answer
    }
}

/// A false claim with its correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MythItem {
    pub myth: String,
    pub bust: String,
}

impl KnowledgeEntry for MythItem {
    fn key(&self) -> &str {
        &self.myth
    }

    fn value(&self) -> &str {
        &self.bust
    }
}

/// Read a JSON array of records from `path`.
pub fn load_items<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, KnowledgeError> {
    let contents = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| KnowledgeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Base
// ─────────────────────────────────────────────────────────────────────────────

/// The two static collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    pub faqs: Vec<FaqItem>,
    pub myths: Vec<MythItem>,
}

impl KnowledgeBase {
    pub fn new(faqs: Vec<FaqItem>, myths: Vec<MythItem>) -> Self {
        Self { faqs, myths }
    }

    /// Load both collections. Any missing or malformed file is an error.
    pub fn load(faqs: &Path, myths: &Path) -> Result<Self, KnowledgeError> {
        let kb = Self {
            faqs: load_items(faqs)?,
            myths: load_items(myths)?,
        };
        tracing::info!(
            faqs = kb.faqs.len(),
            myths = kb.myths.len(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// Attach precomputed embeddings for every item key.
    pub async fn embed(self, client: &CompletionClient) -> Result<EmbeddedKnowledge, KnowledgeError> {
        let faq_vectors = embed_keys("faqs", &self.faqs, client).await?;
        let myth_vectors = embed_keys("myths", &self.myths, client).await?;
        Ok(EmbeddedKnowledge {
            base: self,
            faq_vectors,
            myth_vectors,
        })
    }
}

/// Knowledge base plus one embedding per item, index-aligned.
#[derive(Debug, Clone)]
pub struct EmbeddedKnowledge {
    pub base: KnowledgeBase,
    pub faq_vectors: Vec<Vec<f32>>,
    pub myth_vectors: Vec<Vec<f32>>,
}

async fn embed_keys<T: KnowledgeEntry>(
    collection: &'static str,
    items: &[T],
    client: &CompletionClient,
) -> Result<Vec<Vec<f32>>, KnowledgeError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<&str> = items.iter().map(KnowledgeEntry::key).collect();
    let vectors = client
        .embed_batch(&keys)
        .await
        .map_err(|source| KnowledgeError::Embed { collection, source })?;

    if vectors.len() != items.len() {
        return Err(KnowledgeError::VectorCount {
            collection,
            expected: items.len(),
            actual: vectors.len(),
        });
    }

    tracing::debug!(collection, count = vectors.len(), "Embedded knowledge items");
    Ok(vectors)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lensbot_llm::{MockBackend, StaticEmbedder};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_preserves_order_and_text() {
        let dir = TempDir::new().unwrap();
        let faqs = write(
            &dir,
            "faqs.json",
            r#"[
                {"question": "How do I clean lenses?", "answer": "Use fresh solution, never water."},
                {"question": "Are there lenses for dry eyes?", "answer": "Yes: silicone hydrogel."}
            ]"#,
        );
        let myths = write(
            &dir,
            "myths.json",
            r#"[{"myth": "Lenses can get lost behind your eye.", "bust": "They can't.", "source": "ignored"}]"#,
        );

        let kb = KnowledgeBase::load(&faqs, &myths).unwrap();

        assert_eq!(kb.faqs.len(), 2);
        assert_eq!(kb.faqs[0].question, "How do I clean lenses?");
        assert_eq!(kb.faqs[0].answer, "Use fresh solution, never water.");
        assert_eq!(kb.faqs[1].value(), "Yes: silicone hydrogel.");
        assert_eq!(kb.myths[0].key(), "Lenses can get lost behind your eye.");
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let myths = write(&dir, "myths.json", "[]");
        let err = KnowledgeBase::load(&dir.path().join("nope.json"), &myths).unwrap_err();
        assert!(matches!(err, KnowledgeError::Read { .. }));
    }

    #[test]
    fn test_missing_field_is_error() {
        let dir = TempDir::new().unwrap();
        let faqs = write(&dir, "faqs.json", r#"[{"question": "No answer here"}]"#);
        let myths = write(&dir, "myths.json", "[]");
        let err = KnowledgeBase::load(&faqs, &myths).unwrap_err();
        assert!(matches!(err, KnowledgeError::Parse { .. }));
        assert!(err.to_string().contains("faqs.json"));
    }

    #[test]
    fn test_malformed_json_is_error() {
        let dir = TempDir::new().unwrap();
        let faqs = write(&dir, "faqs.json", "[]");
        let myths = write(&dir, "myths.json", "{not json");
        assert!(matches!(
            KnowledgeBase::load(&faqs, &myths),
            Err(KnowledgeError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_embed_aligns_vectors_with_items() {
        let kb = KnowledgeBase::new(
            vec![
                FaqItem {
                    question: "q1".into(),
                    answer: "a1".into(),
                },
                FaqItem {
                    question: "q2".into(),
                    answer: "a2".into(),
                },
            ],
            vec![MythItem {
                myth: "m1".into(),
                bust: "b1".into(),
            }],
        );
        let embedder = StaticEmbedder::new()
            .with_vector("q1", vec![1.0, 0.0])
            .with_vector("q2", vec![0.0, 1.0])
            .with_vector("m1", vec![0.5, 0.5]);
        let client =
            CompletionClient::new(Arc::new(MockBackend::failing())).with_embedder(Arc::new(embedder));

        let embedded = kb.embed(&client).await.unwrap();

        assert_eq!(embedded.faq_vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(embedded.myth_vectors, vec![vec![0.5, 0.5]]);
        assert_eq!(embedded.base.faqs[1].answer, "a2");
    }

    #[tokio::test]
    async fn test_embed_failure_is_fatal() {
        let kb = KnowledgeBase::new(
            vec![FaqItem {
                question: "unregistered".into(),
                answer: "a".into(),
            }],
            Vec::new(),
        );
        let client = CompletionClient::new(Arc::new(MockBackend::failing()))
            .with_embedder(Arc::new(StaticEmbedder::new()));

        let err = kb.embed(&client).await.unwrap_err();
        assert!(matches!(err, KnowledgeError::Embed { collection: "faqs", .. }));
    }
}
