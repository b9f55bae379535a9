//! Session store for the lensbot assistant.
//!
//! Maps caller-supplied session identifiers to conversation state with:
//! - A per-session async lock so requests for one identifier serialize
//! - LRU eviction to bound memory
//! - Optional idle TTL with an explicit sweep
//!
//! # Example
//!
//! ```rust,ignore
//! use lensbot_session::{SessionStore, StoreConfig, Turn};
//!
//! let store = SessionStore::new(StoreConfig::default());
//! let handle = store.get_or_create("abc").await;
//! handle.lock().await.push(Turn::user("hello"));
//! ```

mod config;
mod error;
mod session;
mod store;

pub use config::{DEFAULT_MAX_SESSIONS, StoreConfig};
pub use error::{Result, SessionError};
pub use session::{ConversationState, Role, Session, Turn};
pub use store::{SessionHandle, SessionStore, StoreStats};
