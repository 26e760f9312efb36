use crate::config::Config;
use crate::error::{GatewayError, Result};

pub fn validate(config: &Config) -> Result<()> {
    if config.limits.limit == 0 {
        return Err(GatewayError::Config("limit must be > 0".into()));
    }
    if config.limits.percentage > 100 {
        return Err(GatewayError::Config(format!(
            "percentage must be between 0 and 100, got {}",
            config.limits.percentage
        )));
    }
    if config.upstream.connect_timeout_ms == 0 {
        return Err(GatewayError::Config("connect_timeout_ms must be > 0".into()));
    }
    if config.telemetry.metrics_port == Some(config.listen.port()) && config.listen.port() != 0 {
        return Err(GatewayError::Config(format!(
            "metrics_port {} collides with the listen port",
            config.listen.port()
        )));
    }
    Ok(())
}
