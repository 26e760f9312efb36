use serde::Serialize;

use crate::config::LimitsConfig;

/// Admission parameters read by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionSettings {
    /// Tokens per client bucket
    pub limit: u32,
    /// Artificial latency per request, in milliseconds
    pub delay_ms: u64,
    /// Per-token refill interval in milliseconds, 0 = derived from `limit`
    pub window_ms: u64,
    /// Soft gate threshold (0 disables it)
    pub percentage: u8,
}

impl From<&LimitsConfig> for AdmissionSettings {
    fn from(limits: &LimitsConfig) -> Self {
        Self {
            limit: limits.limit,
            delay_ms: limits.delay_ms,
            window_ms: limits.window_ms,
            percentage: limits.percentage,
        }
    }
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}
