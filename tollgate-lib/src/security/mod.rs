pub mod admission;
pub mod rate_limit;

pub use admission::{client_key, AdmissionDecision, AdmissionPolicy};
pub use rate_limit::{RateLimitResult, RateLimiter, Stat, StateStore};
