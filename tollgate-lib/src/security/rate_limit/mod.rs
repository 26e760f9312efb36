//! Rate limiting for Tollgate.
//!
//! Every client key owns an independent token bucket:
//!
//! - **TokenBucket** (`bucket.rs`): refill math. Starts full, regains one
//!   token per fill interval, capped at capacity.
//!
//! - **InMemoryStore** (`store.rs`): key → bucket map behind one lock, with a
//!   [`Sweeper`] task that drops entries idle for 30 seconds.
//!
//! - **RateLimiter** (`limiter.rs`): the hard gate (`exceeds_limit`), the
//!   soft percentage gate (`above_percentage`) and stats snapshots.
//!
//! # Example Usage
//!
//! ```ignore
//! use tollgate_lib::security::rate_limit::RateLimiter;
//!
//! // 10 tokens per client, one token back every 100ms
//! let limiter = RateLimiter::new(10, 0);
//!
//! if limiter.exceeds_limit("192.168.1.1") {
//!     // Return 429 Too Many Requests
//! } else if !limiter.above_percentage("192.168.1.1", 10, 50) {
//!     // Less than half of the bucket left
//! }
//! ```

mod bucket;
mod limiter;
mod store;

pub use bucket::{TokenBucket, MIN_FILL_INTERVAL};
pub use limiter::{fill_interval_for, RateLimitResult, RateLimiter, Stat};
pub use store::{InMemoryStore, Increment, StateStore, Sweeper, ENTRY_TTL, EVICTION_TICK};
