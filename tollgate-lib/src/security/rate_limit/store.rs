//! Per-key bucket storage.
//!
//! [`InMemoryStore`] keeps one [`TokenBucket`] per client key behind a single
//! store-wide lock. Entries are created lazily on first use and removed by
//! a [`Sweeper`] once they have been idle for longer than the store TTL.

use ahash::AHashMap;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::bucket::TokenBucket;

/// Idle time after which an entry is evicted.
pub const ENTRY_TTL: Duration = Duration::from_secs(30);

/// How often the sweeper looks for idle entries.
pub const EVICTION_TICK: Duration = Duration::from_millis(500);

/// Outcome of a single token draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Increment {
    /// Tokens left after the draw (0 when the draw failed)
    pub remaining: u64,
    /// Whether a token was consumed
    pub ok: bool,
}

/// Storage capability used by the rate limiter.
///
/// `increment` must be atomic per key: two concurrent callers can never both
/// consume the last token.
pub trait StateStore: Send + Sync {
    /// Draw one token for `key`, creating a full entry if the key is new.
    fn increment(&self, key: &str) -> Increment;

    /// Tokens currently available for `key`, 0 if the key is unknown.
    fn available(&self, key: &str) -> u64;

    /// Point-in-time copy of every tracked key and its available tokens.
    fn stats(&self) -> HashMap<String, u64>;

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct Entry {
    bucket: TokenBucket,
    last_touched: Instant,
}

impl Entry {
    fn expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_touched) > ttl
    }
}

/// Process-local store of token buckets keyed by client identity.
#[derive(Debug)]
pub struct InMemoryStore {
    capacity: u64,
    fill_interval: Duration,
    ttl: Duration,
    entries: RwLock<AHashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new(capacity: u64, fill_interval: Duration) -> Self {
        Self::with_ttl(capacity, fill_interval, ENTRY_TTL)
    }

    pub fn with_ttl(capacity: u64, fill_interval: Duration, ttl: Duration) -> Self {
        Self { capacity, fill_interval, ttl, entries: RwLock::new(AHashMap::new()) }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn fill_interval(&self) -> Duration {
        self.fill_interval
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// [`StateStore::increment`] evaluated at an explicit instant.
    pub fn increment_at(&self, key: &str, now: Instant) -> Increment {
        let mut entries = self.write();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            bucket: TokenBucket::new_at(self.fill_interval, self.capacity, now),
            last_touched: now,
        });

        entry.last_touched = now;
        match entry.bucket.try_take_at(now) {
            Some(remaining) => Increment { remaining, ok: true },
            None => Increment { remaining: 0, ok: false },
        }
    }

    /// [`StateStore::available`] evaluated at an explicit instant.
    pub fn available_at(&self, key: &str, now: Instant) -> u64 {
        self.read()
            .get(key)
            .map(|entry| entry.bucket.available_at(now))
            .unwrap_or(0)
    }

    /// Remove every entry idle for longer than the TTL at `now`.
    ///
    /// Returns the number of removed entries.
    pub fn evict_expired(&self, now: Instant) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, entry| {
            let expired = entry.expired(now, self.ttl);
            if expired {
                debug!(key = %key, "removing expired key");
            }
            !expired
        });
        before.saturating_sub(entries.len())
    }

    fn read(&self) -> RwLockReadGuard<'_, AHashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Rate limit store lock poisoned");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, AHashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Rate limit store lock poisoned");
            PoisonError::into_inner(poisoned)
        })
    }
}

impl StateStore for InMemoryStore {
    fn increment(&self, key: &str) -> Increment {
        self.increment_at(key, Instant::now())
    }

    fn available(&self, key: &str) -> u64 {
        self.available_at(key, Instant::now())
    }

    fn stats(&self) -> HashMap<String, u64> {
        let now = Instant::now();
        self.read()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.bucket.available_at(now)))
            .collect()
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}

/// Background eviction task bound to one store.
///
/// The task holds only a weak reference to the store and stops when the
/// store is gone or when the `Sweeper` is dropped.
#[derive(Debug)]
pub struct Sweeper {
    cancel: CancellationToken,
}

impl Sweeper {
    /// Start sweeping `store` every [`EVICTION_TICK`]. Must be called inside a tokio runtime.
    pub fn spawn(store: &Arc<InMemoryStore>) -> Self {
        Self::spawn_with_tick(store, EVICTION_TICK)
    }

    pub fn spawn_with_tick(store: &Arc<InMemoryStore>, tick: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let store = Arc::downgrade(store);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(store) = store.upgrade() else {
                            break;
                        };
                        let removed = store.evict_expired(Instant::now());
                        if removed > 0 {
                            debug!(removed, remaining = store.len(), "eviction sweep");
                        }
                    }
                }
            }
            debug!("eviction sweep stopped");
        });

        Self { cancel }
    }

    /// Token cancelled when this sweeper stops.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
