//! Configuration for the session store.

use std::time::Duration;

/// Default maximum number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Bounds applied by [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Sessions held before the least recently used one is evicted.
    pub max_sessions: usize,

    /// Idle time after which a session expires. `None` keeps sessions for
    /// the life of the process.
    pub ttl: Option<Duration>,

    /// Interval for the background sweep started by
    /// [`SessionStore::spawn_cleanup_task`](crate::SessionStore::spawn_cleanup_task).
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            ttl: None,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}
