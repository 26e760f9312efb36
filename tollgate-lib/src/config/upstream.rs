use serde::Deserialize;

/// Upstream transport configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Accept any certificate presented by HTTPS upstreams
    /// Default: true
    #[serde(default = "default_true")]
    pub skip_tls_verification: bool,
    /// TCP connect timeout in milliseconds
    /// Default: 5000
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// How long idle pooled upstream connections are kept, in seconds
    /// Default: 90
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            skip_tls_verification: true,
            connect_timeout_ms: default_connect_timeout(),
            pool_idle_timeout_secs: default_pool_idle_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_pool_idle_timeout() -> u64 {
    90
}
