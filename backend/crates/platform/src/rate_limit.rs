//! Rate Limiting Infrastructure
//!
//! Fixed-window counters keyed by route and client. A window opens on the
//! first request for a key and lasts `window`; at most `max_requests` are
//! allowed inside it. The next request after the window elapses opens a
//! fresh one.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Boxed error returned by storage backends
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    /// One request per 20 seconds
    fn default() -> Self {
        Self {
            max_requests: 1,
            window: Duration::from_secs(20),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Unix epoch millis at which the current window closes
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Seconds until the window closes, rounded up (for `Retry-After`)
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let remaining_ms = (self.reset_at_ms - now_ms).max(0) as u64;
        remaining_ms.div_ceil(1000)
    }
}

/// Build the storage key for a route and client pair.
pub fn rate_limit_key(route: &str, client: &str) -> String {
    format!("{route}|{client}")
}

/// Current wall clock in Unix epoch millis
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Trait for rate limit storage backends
///
/// Implementations must make check-and-increment atomic per key.
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count one request against `key` and report whether it is allowed.
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, BoxError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at_ms: i64,
}

/// Process-local store. Counters do not survive restarts and are not shared
/// between instances.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: DashMap<String, Window>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn hit(&self, key: &str, config: &RateLimitConfig, now: i64) -> RateLimitResult {
        let window_ms = config.window_ms();

        // The entry guard holds the shard lock, so the read-modify-write
        // below is atomic per key.
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at_ms: now,
        });

        if now.saturating_sub(entry.started_at_ms) >= window_ms {
            *entry = Window {
                count: 0,
                started_at_ms: now,
            };
        }

        entry.count = entry.count.saturating_add(1);

        RateLimitResult {
            allowed: entry.count <= config.max_requests,
            remaining: config.max_requests.saturating_sub(entry.count),
            reset_at_ms: entry.started_at_ms.saturating_add(window_ms),
        }
    }

    /// Drop windows that closed before `now`.
    pub fn purge_expired(&self, window: Duration) {
        let now = now_ms();
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        self.windows
            .retain(|_, w| now.saturating_sub(w.started_at_ms) < window_ms);
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, BoxError> {
        Ok(self.hit(key, config, now_ms()))
    }
}
