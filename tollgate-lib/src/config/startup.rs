use std::net::SocketAddr;

use crate::config::{validate, Config};
use crate::error::Result;

/// Startup values coming from the environment or the command line.
///
/// Every field is optional; set fields replace what the defaults or the
/// config file provided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupOverrides {
    pub port: Option<u16>,
    pub limit: Option<u32>,
    pub delay_ms: Option<u64>,
    /// Refill interval in milliseconds, negative values derive it from the limit
    pub duration_ms: Option<i64>,
    pub percentage: Option<u8>,
    pub skip_tls_verification: Option<bool>,
    pub metrics_port: Option<u16>,
    pub log_level: Option<String>,
}

impl StartupOverrides {
    /// Layer these values on top of `config` and validate the result.
    pub fn apply(&self, mut config: Config) -> Result<Config> {
        if let Some(port) = self.port {
            config.listen = SocketAddr::new(config.listen.ip(), port);
        }
        if let Some(limit) = self.limit {
            config.limits.limit = limit;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.limits.delay_ms = delay_ms;
        }
        if let Some(duration_ms) = self.duration_ms {
            config.limits.window_ms = u64::try_from(duration_ms).unwrap_or(0);
        }
        if let Some(percentage) = self.percentage {
            config.limits.percentage = percentage;
        }
        if let Some(skip) = self.skip_tls_verification {
            config.upstream.skip_tls_verification = skip;
        }
        if self.metrics_port.is_some() {
            config.telemetry.metrics_port = self.metrics_port;
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }

        validate(&config)?;
        Ok(config)
    }
}
