use serde::Deserialize;
use std::net::SocketAddr;

use super::limits::LimitsConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::timeout::TimeoutConfig;
use super::upstream::UpstreamConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:8080"
    /// Default: 0.0.0.0:8080
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Initial admission limits (can be changed at runtime through `/config`)
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Upstream transport configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Telemetry configuration
    /// Controls metrics and health check endpoints
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            limits: LimitsConfig::default(),
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig::default(),
            timeout: TimeoutConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
