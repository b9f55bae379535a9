//! Session store with per-session locking, LRU eviction and TTL support.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::error::{Result, SessionError};
use crate::session::Session;

/// Shared handle to one session.
///
/// Hold the lock for the whole read-modify-write of a turn; that is what
/// serializes concurrent requests for the same identifier.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Entry stored in the LRU.
struct StoreEntry {
    handle: SessionHandle,
    last_access: Instant,
}

impl StoreEntry {
    fn new(id: &str, now: Instant) -> Self {
        Self {
            handle: Arc::new(Mutex::new(Session::new(id))),
            last_access: now,
        }
    }

    /// A request outside the store still holds this session's handle.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.handle) > 1
    }
}

/// Outcome of a lookup that does not create.
enum Lookup {
    Live(SessionHandle),
    Expired,
    Missing,
}

/// Process-lifetime mapping from session identifier to conversation state.
///
/// The map itself sits behind one `RwLock` that is only held for map
/// bookkeeping; each session has its own async mutex for conversation work.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<LruCache<String, StoreEntry>>>,
    config: StoreConfig,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LruCache::new(Self::capacity(&config)))),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn capacity(config: &StoreConfig) -> NonZeroUsize {
        NonZeroUsize::new(config.max_sessions).unwrap_or(NonZeroUsize::MIN)
    }

    /// Idle past the TTL and not held by any in-flight turn.
    fn is_expired(&self, entry: &StoreEntry, now: Instant) -> bool {
        match self.config.ttl {
            Some(ttl) => now.duration_since(entry.last_access) > ttl && !entry.in_use(),
            None => false,
        }
    }

    /// Free a slot for one insertion.
    ///
    /// Evicts least recently used sessions that nobody holds. When every
    /// stored session is in use the cache grows past `max_sessions`, and
    /// shrinks back once enough of them are released.
    fn make_room(&self, lru: &mut LruCache<String, StoreEntry>) {
        let max = Self::capacity(&self.config);

        while lru.len() >= max.get() {
            let idle = lru
                .iter()
                .rev()
                .find(|(_, entry)| !entry.in_use())
                .map(|(id, _)| id.clone());
            let Some(id) = idle else { break };
            lru.pop(&id);
            debug!(session_id = %id, "Evicted least recently used session");
        }

        if lru.len() < max.get() {
            if lru.cap() != max {
                lru.resize(max);
            }
        } else if lru.len() >= lru.cap().get() {
            lru.resize(lru.cap().saturating_add(1));
            warn!(
                sessions = lru.len(),
                max_sessions = max.get(),
                "Every session is busy, growing the store past its limit"
            );
        }
    }

    /// Return the session for `session_id`, creating a fresh one if absent.
    ///
    /// An expired session is discarded and replaced. A session whose handle
    /// is still held elsewhere never counts as expired and is never evicted,
    /// so every request for one identifier shares one lock.
    pub async fn get_or_create(&self, session_id: &str) -> SessionHandle {
        let mut lru = self.inner.write().await;
        let now = Instant::now();

        let expired = match lru.get_mut(session_id) {
            Some(entry) if !self.is_expired(entry, now) => {
                entry.last_access = now;
                trace!(session_id = %session_id, "Session found");
                return Arc::clone(&entry.handle);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!(session_id = %session_id, "Session expired, starting a fresh one");
            lru.pop(session_id);
        }

        self.make_room(&mut lru);
        let entry = StoreEntry::new(session_id, now);
        let handle = Arc::clone(&entry.handle);
        lru.put(session_id.to_string(), entry);

        debug!(session_id = %session_id, sessions = lru.len(), "Session created");
        handle
    }

    async fn lookup(&self, session_id: &str, touch: bool) -> Lookup {
        let mut lru = self.inner.write().await;
        let now = Instant::now();

        let expired = match lru.peek_mut(session_id) {
            Some(entry) if !self.is_expired(entry, now) => {
                if touch {
                    entry.last_access = now;
                }
                let handle = Arc::clone(&entry.handle);
                if touch {
                    lru.promote(session_id);
                }
                return Lookup::Live(handle);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            lru.pop(session_id);
            debug!(session_id = %session_id, "Dropped expired session on lookup");
            Lookup::Expired
        } else {
            Lookup::Missing
        }
    }

    /// Get an existing session, refreshing its LRU position and TTL.
    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        match self.lookup(session_id, true).await {
            Lookup::Live(handle) => Some(handle),
            Lookup::Expired | Lookup::Missing => None,
        }
    }

    /// Get an existing session without refreshing it.
    pub async fn peek(&self, session_id: &str) -> Option<SessionHandle> {
        match self.lookup(session_id, false).await {
            Lookup::Live(handle) => Some(handle),
            Lookup::Expired | Lookup::Missing => None,
        }
    }

    /// Like [`peek`](Self::peek), but says why a session is unavailable.
    pub async fn require(&self, session_id: &str) -> Result<SessionHandle> {
        match self.lookup(session_id, false).await {
            Lookup::Live(handle) => Ok(handle),
            Lookup::Expired => Err(SessionError::Expired(session_id.to_string())),
            Lookup::Missing => Err(SessionError::NotFound(session_id.to_string())),
        }
    }

    /// Refresh a session's idle timer, e.g. when a turn on it finishes.
    pub async fn touch(&self, session_id: &str) {
        let mut lru = self.inner.write().await;
        if let Some(entry) = lru.get_mut(session_id) {
            entry.last_access = Instant::now();
        }
    }

    /// Check if a live session exists.
    pub async fn contains(&self, session_id: &str) -> bool {
        self.peek(session_id).await.is_some()
    }

    /// Remove a session. Returns its handle if it existed.
    pub async fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        let removed = self.inner.write().await.pop(session_id);
        if removed.is_some() {
            debug!(session_id = %session_id, "Session removed");
        }
        removed.map(|entry| entry.handle)
    }

    /// Drop every session idle past the TTL. Returns how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        if self.config.ttl.is_none() {
            return 0;
        }

        let mut lru = self.inner.write().await;
        let now = Instant::now();
        let expired: Vec<String> = lru
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            lru.pop(id);
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "Cleaned up expired sessions");
        }
        expired.len()
    }

    /// Spawn a task that runs [`cleanup_expired`](Self::cleanup_expired)
    /// every `cleanup_interval`. Returns `None` when no TTL is configured.
    pub fn spawn_cleanup_task(&self) -> Option<JoinHandle<()>> {
        self.config.ttl?;
        let store = self.clone();
        let period = self.config.cleanup_interval;

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                store.cleanup_expired().await;
            }
        }))
    }

    /// Identifiers of live sessions, most recently used first.
    pub async fn list(&self) -> Vec<String> {
        let lru = self.inner.read().await;
        let now = Instant::now();
        lru.iter()
            .filter(|(_, entry)| !self.is_expired(entry, now))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn stats(&self) -> StoreStats {
        let lru = self.inner.read().await;
        StoreStats {
            size: lru.len(),
            capacity: self.config.max_sessions,
            ttl_secs: self.config.ttl.map(|ttl| ttl.as_secs()),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Stored sessions.
    pub size: usize,
    /// Configured maximum.
    pub capacity: usize,
    /// Idle TTL in seconds, if any.
    pub ttl_secs: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Turn;
    use std::time::Duration;

    fn store() -> SessionStore {
        SessionStore::new(StoreConfig::default())
    }

    fn ttl_store(ttl_secs: u64) -> SessionStore {
        SessionStore::new(StoreConfig::default().with_ttl(Some(Duration::from_secs(ttl_secs))))
    }

    #[tokio::test]
    async fn test_get_or_create_inserts_fresh_session() {
        let store = store();
        let handle = store.get_or_create("abc").await;

        let session = handle.lock().await;
        assert_eq!(session.id, "abc");
        assert!(session.history().is_empty());
        assert!(!session.is_greeted());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_session() {
        let store = store();
        store
            .get_or_create("abc")
            .await
            .lock()
            .await
            .push(Turn::user("hello"));

        let handle = store.get_or_create("abc").await;
        assert_eq!(handle.lock().await.turn_count(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = store();
        assert!(store.get("nope").await.is_none());
        assert!(matches!(
            store.require("nope").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let store = SessionStore::new(StoreConfig::default().with_max_sessions(2));
        store.get_or_create("a").await;
        store.get_or_create("b").await;
        // touch "a" so "b" becomes least recently used
        store.get("a").await;
        store.get_or_create("c").await;

        assert!(store.contains("a").await);
        assert!(!store.contains("b").await);
        assert!(store.contains("c").await);
        assert_eq!(store.list().await, vec!["c".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_eviction_skips_sessions_in_use() {
        let store = SessionStore::new(StoreConfig::default().with_max_sessions(2));
        let held = store.get_or_create("a").await;
        store.get_or_create("b").await;
        store.get_or_create("c").await;

        assert!(Arc::ptr_eq(&held, &store.get_or_create("a").await));
        assert!(!store.contains("b").await);
        assert!(store.contains("c").await);
    }

    #[tokio::test]
    async fn test_store_grows_while_every_session_is_busy() {
        let store = SessionStore::new(StoreConfig::default().with_max_sessions(2));
        let a = store.get_or_create("a").await;
        let b = store.get_or_create("b").await;
        store.get_or_create("c").await;
        assert_eq!(store.len().await, 3);
        assert!(store.contains("a").await && store.contains("b").await);

        drop(a);
        drop(b);
        store.get_or_create("d").await;

        assert_eq!(store.len().await, 2);
        assert_eq!(store.list().await, vec!["d".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = store();
        store.get_or_create("abc").await;

        assert!(store.remove("abc").await.is_some());
        assert!(store.remove("abc").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiration_replaces_session() {
        let store = ttl_store(10);
        store
            .get_or_create("abc")
            .await
            .lock()
            .await
            .push(Turn::user("hello"));

        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(matches!(
            store.require("abc").await,
            Err(SessionError::Expired(_))
        ));
        let handle = store.get_or_create("abc").await;
        assert_eq!(handle.lock().await.turn_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_turn_keeps_session_alive() {
        let store = ttl_store(10);
        let first = store.get_or_create("abc").await;
        let mut session = first.lock().await;

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.cleanup_expired().await, 0);

        let second = store.get_or_create("abc").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.try_lock().is_err());

        session.push(Turn::user("hello"));
        session.push(Turn::assistant("hi"));
        drop(session);
        assert_eq!(second.lock().await.turn_count(), 2);

        drop(first);
        drop(second);
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.cleanup_expired().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_resets_ttl() {
        let store = ttl_store(10);
        store.get_or_create("abc").await;

        tokio::time::advance(Duration::from_secs(8)).await;
        store.touch("abc").await;
        tokio::time::advance(Duration::from_secs(8)).await;

        assert!(store.peek("abc").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_resets_ttl() {
        let store = ttl_store(10);
        store.get_or_create("abc").await;

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.get("abc").await.is_some());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.get("abc").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_does_not_reset_ttl() {
        let store = ttl_store(10);
        store.get_or_create("abc").await;

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.peek("abc").await.is_some());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.peek("abc").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let store = ttl_store(10);
        store.get_or_create("old").await;
        tokio::time::advance(Duration::from_secs(8)).await;
        store.get_or_create("new").await;
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.list().await, vec!["new".to_string()]);
    }

    #[tokio::test]
    async fn test_no_ttl_never_expires() {
        let store = store();
        store.get_or_create("abc").await;
        assert_eq!(store.cleanup_expired().await, 0);
        assert!(store.spawn_cleanup_task().is_none());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = SessionStore::new(
            StoreConfig::default()
                .with_max_sessions(5)
                .with_ttl(Some(Duration::from_secs(30))),
        );
        store.get_or_create("a").await;
        store.get_or_create("b").await;

        let stats = store.stats().await;
        assert_eq!(stats.size, 2);
        assert_eq!(stats.capacity, 5);
        assert_eq!(stats.ttl_secs, Some(30));
    }

    #[tokio::test]
    async fn test_concurrent_turns_serialize() {
        let store = store();
        let mut tasks = Vec::new();

        for i in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                let handle = store.get_or_create("shared").await;
                let mut session = handle.lock().await;
                let before = session.turn_count();
                session.push(Turn::user(format!("q{}", i)));
                tokio::task::yield_now().await;
                session.push(Turn::assistant(format!("a{}", i)));
                assert_eq!(session.turn_count(), before + 2);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let handle = store.get("shared").await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.turn_count(), 16);
        // every question is immediately followed by its own answer
        for pair in session.history().chunks(2) {
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }
}
