//! Conversation state for a single caller-supplied identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Where a session is in the greeting/conversation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    /// Nothing has happened yet.
    New,
    /// The greeting was sent; no turns are recorded.
    Greeted,
    /// At least one turn is recorded.
    Active,
}

/// Server-side state for one session identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    history: Vec<Turn>,
    greeted: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session: empty history, not greeted.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: Vec::new(),
            greeted: false,
            created_at: now,
            last_active: now,
        }
    }

    pub fn state(&self) -> ConversationState {
        if !self.history.is_empty() {
            ConversationState::Active
        } else if self.greeted {
            ConversationState::Greeted
        } else {
            ConversationState::New
        }
    }

    pub fn is_greeted(&self) -> bool {
        self.greeted
    }

    pub fn mark_greeted(&mut self) {
        self.greeted = true;
        self.touch();
    }

    /// Full history, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The last `n` turns in chronological order.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn push(&mut self, turn: Turn) {
        self.history.push(turn);
        self.touch();
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = Session::new("abc");
        assert_eq!(session.id, "abc");
        assert!(session.history().is_empty());
        assert!(!session.is_greeted());
        assert_eq!(session.state(), ConversationState::New);
    }

    #[test]
    fn test_state_transitions() {
        let mut session = Session::new("abc");
        session.mark_greeted();
        assert_eq!(session.state(), ConversationState::Greeted);

        session.push(Turn::user("hello"));
        assert_eq!(session.state(), ConversationState::Active);
    }

    #[test]
    fn test_active_without_greeting() {
        let mut session = Session::new("abc");
        session.push(Turn::user("hello"));
        assert_eq!(session.state(), ConversationState::Active);
    }

    #[test]
    fn test_recent_window_preserves_order() {
        let mut session = Session::new("abc");
        for i in 0..12 {
            session.push(Turn::user(format!("m{}", i)));
        }

        let recent = session.recent(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "m2");
        assert_eq!(recent[9].content, "m11");

        assert_eq!(session.recent(50).len(), 12);
        assert!(session.recent(0).is_empty());
    }

    #[test]
    fn test_turn_serialization() {
        let json = serde_json::to_value(Turn::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }
}
