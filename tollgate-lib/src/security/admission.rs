//! Per-request admission pipeline.
//!
//! Order of operations for one request:
//!
//! 1. sleep for the configured delay (rejected requests pay it too),
//! 2. hard gate: draw a token, reject when the bucket is empty,
//! 3. soft gate (only when a percentage is configured): reject when the
//!    remaining capacity is below the threshold.
//!
//! All three steps read the same [`Snapshot`], so a concurrent `/config`
//! update never mixes old and new parameters within one request.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::control::{LiveConfig, Snapshot};

/// Outcome of the admission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Forward the request upstream.
    Admitted {
        /// Tokens left for this client
        remaining: u64,
    },
    /// No token was available.
    TooManyRequests,
    /// A token was drawn but the remaining capacity is below the threshold.
    BelowPercentage,
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionDecision::Admitted { .. })
    }

    /// Label used in logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionDecision::Admitted { .. } => "admitted",
            AdmissionDecision::TooManyRequests => "too_many_requests",
            AdmissionDecision::BelowPercentage => "below_percentage",
        }
    }
}

/// Client identity used as the rate limit key: the peer IP without its port.
pub fn client_key(peer: SocketAddr) -> String {
    peer.ip().to_string()
}

#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    live: Arc<LiveConfig>,
}

impl AdmissionPolicy {
    pub fn new(live: Arc<LiveConfig>) -> Self {
        Self { live }
    }

    pub fn live(&self) -> &Arc<LiveConfig> {
        &self.live
    }

    /// Run the full pipeline for `key`, including the configured delay.
    pub async fn admit(&self, key: &str) -> AdmissionDecision {
        let snapshot = self.live.snapshot();

        let delay_ms = snapshot.settings.delay_ms;
        if delay_ms > 0 {
            debug!(key = %key, delay_ms, "Adding delay to the request");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        Self::decide(&snapshot, key)
    }

    /// Hard and soft gates against one snapshot, without the delay.
    pub fn decide(snapshot: &Snapshot, key: &str) -> AdmissionDecision {
        let result = snapshot.limiter.check(key);
        if result.is_limited() {
            return AdmissionDecision::TooManyRequests;
        }

        let percentage = snapshot.settings.percentage;
        if percentage > 0
            && !snapshot.limiter.above_percentage(
                key,
                u64::from(snapshot.settings.limit),
                percentage,
            )
        {
            return AdmissionDecision::BelowPercentage;
        }

        AdmissionDecision::Admitted { remaining: result.remaining() }
    }
}
