//! Token bucket primitive.
//!
//! The bucket starts full and gains one token every `fill_interval`, up to
//! `capacity`. Refill is computed lazily from the number of whole intervals
//! elapsed since the bucket was created, so no timer is needed per key.

use std::time::{Duration, Instant};

/// Smallest refill interval a bucket accepts.
pub const MIN_FILL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u64,
    fill_interval: Duration,
    start: Instant,
    available: u64,
    // Number of whole fill intervals already credited to `available`.
    latest_tick: u64,
}

impl TokenBucket {
    /// Create a full bucket. Intervals below [`MIN_FILL_INTERVAL`] are clamped.
    pub fn new(fill_interval: Duration, capacity: u64) -> Self {
        Self::new_at(fill_interval, capacity, Instant::now())
    }

    pub fn new_at(fill_interval: Duration, capacity: u64, now: Instant) -> Self {
        Self {
            capacity,
            fill_interval: fill_interval.max(MIN_FILL_INTERVAL),
            start: now,
            available: capacity,
            latest_tick: 0,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn fill_interval(&self) -> Duration {
        self.fill_interval
    }

    /// Tokens available at `now`, without consuming or mutating.
    pub fn available_at(&self, now: Instant) -> u64 {
        let (_, available) = self.refilled(now);
        available
    }

    /// Refill up to `now`, then take one token if there is one.
    ///
    /// Returns the tokens left after the take, or `None` when the bucket was empty.
    pub fn try_take_at(&mut self, now: Instant) -> Option<u64> {
        let (tick, available) = self.refilled(now);
        self.latest_tick = tick;
        self.available = available;

        if self.available == 0 {
            return None;
        }
        self.available = self.available.saturating_sub(1);
        Some(self.available)
    }

    fn refilled(&self, now: Instant) -> (u64, u64) {
        let elapsed = now.saturating_duration_since(self.start);
        let tick = (elapsed.as_nanos() / self.fill_interval.as_nanos()) as u64;
        // A clock reading older than the last credited tick adds nothing.
        let tick = tick.max(self.latest_tick);
        let gained = tick.saturating_sub(self.latest_tick);
        let available = self.available.saturating_add(gained).min(self.capacity);
        (tick, available)
    }
}
