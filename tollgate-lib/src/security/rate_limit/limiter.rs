//! High-level rate limiter.
//!
//! Wraps a [`StateStore`] with the admission rules: a hard token draw and a
//! non-consuming remaining-capacity percentage check.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::bucket::MIN_FILL_INTERVAL;
use super::store::{InMemoryStore, StateStore, Sweeper};

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed to proceed.
    Allowed {
        /// Bucket capacity
        limit: u64,
        /// Tokens left after this request
        remaining: u64,
    },
    /// Request is rate limited and should be rejected.
    Limited {
        /// Bucket capacity
        limit: u64,
    },
}

impl RateLimitResult {
    /// Returns true if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Returns true if the request is limited.
    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimitResult::Limited { .. })
    }

    pub fn limit(&self) -> u64 {
        match self {
            RateLimitResult::Allowed { limit, .. } => *limit,
            RateLimitResult::Limited { limit } => *limit,
        }
    }

    /// Remaining tokens (always 0 when limited).
    pub fn remaining(&self) -> u64 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }
}

/// One tracked client in a stats snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub ip: String,
    pub available: u64,
}

/// Refill interval for a bucket of `limit` tokens.
///
/// A `window_ms` of 0 derives a steady per-second rate (`1000 / limit` ms per
/// token); any other value is used as the explicit per-token interval.
/// The result is never below [`MIN_FILL_INTERVAL`].
pub fn fill_interval_for(limit: u32, window_ms: u64) -> Duration {
    if window_ms > 0 {
        return Duration::from_millis(window_ms);
    }
    let per_token = 1000u64.checked_div(u64::from(limit)).unwrap_or(1000);
    Duration::from_millis(per_token).max(MIN_FILL_INTERVAL)
}

/// A per-key token bucket rate limiter tied to one capacity and one refill cadence.
///
/// # Example
/// ```ignore
/// use tollgate_lib::security::rate_limit::RateLimiter;
///
/// let limiter = RateLimiter::new(10, 0);
/// if limiter.exceeds_limit("10.0.0.1") {
///     // reply 429
/// }
/// ```
pub struct RateLimiter {
    limit: u64,
    fill_interval: Duration,
    store: Arc<dyn StateStore>,
    sweeper: Option<Sweeper>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .field("fill_interval", &self.fill_interval)
            .field("tracked_keys", &self.store.len())
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter backed by a fresh [`InMemoryStore`] with its eviction sweep.
    ///
    /// The sweep is only started when called from inside a tokio runtime.
    pub fn new(limit: u32, window_ms: u64) -> Self {
        let fill_interval = fill_interval_for(limit, window_ms);
        let store = Arc::new(InMemoryStore::new(u64::from(limit), fill_interval));

        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(_) => Some(Sweeper::spawn(&store)),
            Err(_) => {
                warn!("No tokio runtime available, rate limit entries will not be evicted");
                None
            }
        };

        Self { limit: u64::from(limit), fill_interval, store, sweeper }
    }

    /// Create a limiter on top of an arbitrary store. The store owns its own eviction.
    pub fn with_store(limit: u32, fill_interval: Duration, store: Arc<dyn StateStore>) -> Self {
        Self { limit: u64::from(limit), fill_interval, store, sweeper: None }
    }

    /// Draw a token for `key` and report the outcome.
    pub fn check(&self, key: &str) -> RateLimitResult {
        let increment = self.store.increment(key);
        if increment.ok {
            RateLimitResult::Allowed { limit: self.limit, remaining: increment.remaining }
        } else {
            debug!(key = %key, "rate limit exceeded");
            RateLimitResult::Limited { limit: self.limit }
        }
    }

    /// True when no token was available for `key`. A token is consumed otherwise.
    pub fn exceeds_limit(&self, key: &str) -> bool {
        self.check(key).is_limited()
    }

    /// Whether the remaining capacity of `key` is at least `percentage` percent of `limit`.
    ///
    /// Never consumes a token. A `limit` of 0 always reports `true`.
    pub fn above_percentage(&self, key: &str, limit: u64, percentage: u8) -> bool {
        if limit == 0 {
            warn!(key = %key, "percentage check with a zero limit, not throttling");
            return true;
        }

        let available = self.store.available(key) as f64;
        let available_percent = available / limit as f64 * 100.0;
        debug!(key = %key, available, limit, available_percent, "percentage check");

        available_percent >= f64::from(percentage)
    }

    /// Tokens currently available for `key`.
    pub fn available(&self, key: &str) -> u64 {
        self.store.available(key)
    }

    /// Flattened snapshot of every tracked key, unordered.
    pub fn stats(&self) -> Vec<Stat> {
        self.store
            .stats()
            .into_iter()
            .map(|(ip, available)| Stat { ip, available })
            .collect()
    }

    /// Backing store of this limiter.
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Cancellation token of the eviction sweep, if one was started.
    pub fn sweep_token(&self) -> Option<CancellationToken> {
        self.sweeper.as_ref().map(Sweeper::cancellation_token)
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn fill_interval(&self) -> Duration {
        self.fill_interval
    }
}
