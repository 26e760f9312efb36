use serde::Deserialize;

/// Timeout configuration
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Graceful shutdown timeout in seconds
    /// Default: 30
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { shutdown_secs: default_shutdown_timeout() }
    }
}

fn default_shutdown_timeout() -> u64 {
    30
}
