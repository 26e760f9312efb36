use serde::Deserialize;

/// Admission limits applied to every client key
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Tokens per client bucket (must be > 0)
    /// Default: 10
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Artificial latency added to every request, in milliseconds
    /// Default: 0
    #[serde(default)]
    pub delay_ms: u64,
    /// Explicit per-token refill interval in milliseconds
    /// 0 derives a per-second rate from `limit` (1000 / limit)
    /// Default: 0
    #[serde(default)]
    pub window_ms: u64,
    /// Minimum remaining-capacity percentage required to admit a request (0-100)
    /// 0 disables the percentage check
    /// Default: 0
    #[serde(default)]
    pub percentage: u8,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { limit: default_limit(), delay_ms: 0, window_ms: 0, percentage: 0 }
    }
}

fn default_limit() -> u32 {
    10
}
