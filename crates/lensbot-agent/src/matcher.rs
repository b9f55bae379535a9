//! Single best-match lookup over a knowledge collection.
//!
//! Two strategies:
//! - [`find_exact`]: case-insensitive whole-string equality, first match wins.
//! - [`EmbeddingMatcher`]: highest cosine similarity against precomputed
//!   item embeddings, accepted only when strictly above the threshold.

use lensbot_llm::cosine_similarity;

use crate::knowledge::KnowledgeEntry;

/// Default similarity threshold.
pub const DEFAULT_THRESHOLD: f32 = 0.9;

// ─────────────────────────────────────────────────────────────────────────────
// Exact Matcher
// ─────────────────────────────────────────────────────────────────────────────

/// Find the first item whose key equals `message`, ignoring case.
///
/// Whitespace is significant; callers trim the message beforehand.
pub fn find_exact<'a, T: KnowledgeEntry>(message: &str, items: &'a [T]) -> Option<&'a T> {
    let needle = message.to_lowercase();
    items.iter().find(|item| item.key().to_lowercase() == needle)
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding Matcher
// ─────────────────────────────────────────────────────────────────────────────

/// A semantic hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch<'a, T> {
    pub item: &'a T,
    pub index: usize,
    pub score: f32,
}

/// Nearest-neighbor lookup by cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingMatcher {
    threshold: f32,
}

impl Default for EmbeddingMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl EmbeddingMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Pick the winning position from a sequence of scores.
    ///
    /// The maximum only moves on a strictly greater score, so ties keep the
    /// earliest position. The winner must also strictly exceed the threshold.
    /// Non-finite scores never win.
    pub fn select(&self, scores: impl IntoIterator<Item = f32>) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (index, score) in scores.into_iter().enumerate() {
            if !score.is_finite() {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((index, score)),
            }
        }
        best.filter(|&(_, score)| score > self.threshold)
    }

    /// Find the item whose embedding is closest to `query`.
    ///
    /// `vectors[i]` must be the embedding of `items[i]`.
    pub fn find<'a, T>(
        &self,
        query: &[f32],
        items: &'a [T],
        vectors: &[Vec<f32>],
    ) -> Option<ScoredMatch<'a, T>> {
        let scores = vectors
            .iter()
            .take(items.len())
            .map(|vector| cosine_similarity(query, vector));

        let (index, score) = self.select(scores)?;
        Some(ScoredMatch {
            item: &items[index],
            index,
            score,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
