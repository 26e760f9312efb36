#![forbid(unsafe_code)]

use clap::builder::BoolishValueParser;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tollgate_lib::config::{load_from_path, Config, StartupOverrides};
use tollgate_lib::telemetry::{init_metrics, init_tracing, start_observability_server};
use tollgate_lib::GatewayContext;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Tollgate rate limiting route service")]
struct Cli {
    /// Path to an optional configuration TOML file
    #[arg(short, long, value_name = "FILE", env = "TOLLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Tokens per client bucket
    #[arg(long, env = "RATE_LIMIT")]
    rate_limit: Option<u32>,

    /// Delay added to every proxied request, in milliseconds
    #[arg(long, env = "DELAY")]
    delay: Option<u64>,

    /// Refill interval per token in milliseconds, -1 derives it from the rate limit
    #[arg(long, env = "DURATION", allow_negative_numbers = true)]
    duration: Option<i64>,

    /// Reject requests once less than this percentage of the bucket is left (0 disables)
    #[arg(long, env = "PERCENTAGE")]
    percentage: Option<u8>,

    /// Accept any TLS certificate presented by upstreams
    #[arg(long, env = "SKIP_SSL_VALIDATION", value_parser = BoolishValueParser::new())]
    skip_ssl_validation: Option<bool>,

    /// Port for the metrics and health check server
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> StartupOverrides {
        StartupOverrides {
            port: self.port,
            limit: self.rate_limit,
            delay_ms: self.delay,
            duration_ms: self.duration,
            percentage: self.percentage,
            skip_tls_verification: self.skip_ssl_validation,
            metrics_port: self.metrics_port,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let base = match cli.config.as_ref() {
        Some(path) => match load_from_path(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("failed to load configuration: {err}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let cfg = match cli.overrides().apply(base) {
        Ok(cfg) => Arc::new(cfg),
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cfg.logging, &cfg.telemetry) {
        eprintln!("failed to initialize tracing: {err}");
        std::process::exit(1);
    }

    info!(
        listen = ?cfg.listen,
        limit = cfg.limits.limit,
        delay_ms = cfg.limits.delay_ms,
        window_ms = cfg.limits.window_ms,
        "configuration loaded"
    );

    let metrics = match cfg.telemetry.metrics_port {
        Some(port) => match init_metrics() {
            Ok((metrics, registry)) => Some((metrics, registry, port)),
            Err(err) => {
                warn!(%err, "failed to initialize metrics, continuing without them");
                None
            }
        },
        None => None,
    };

    let ctx = match GatewayContext::from_config(&cfg, metrics.as_ref().map(|(m, _, _)| Arc::clone(m))) {
        Ok(ctx) => Arc::new(ctx),
        Err(err) => {
            error!(%err, "failed to build gateway");
            std::process::exit(1);
        }
    };

    if let Some((_, registry, port)) = metrics {
        let live = Arc::clone(&ctx.live);
        tokio::spawn(async move {
            if let Err(err) = start_observability_server(port, registry, live).await {
                error!(%err, "observability server exited with error");
            }
        });
    }

    if let Err(err) = tollgate_lib::run(cfg, ctx).await {
        error!(%err, "gateway exited with error");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn numeric_flags_are_parsed() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "tollgate",
            "--rate-limit",
            "25",
            "--duration",
            "-1",
            "--percentage",
            "40",
        ])?;
        let overrides = cli.overrides();
        assert_eq!(overrides.limit, Some(25));
        assert_eq!(overrides.duration_ms, Some(-1));
        assert_eq!(overrides.percentage, Some(40));
        Ok(())
    }

    #[test]
    fn malformed_numeric_values_stop_startup() {
        for args in [
            ["tollgate", "--rate-limit", "ten"],
            ["tollgate", "--delay", "1.5"],
            ["tollgate", "--percentage", "300"],
        ] {
            let err = Cli::try_parse_from(args).err().map(|e| e.kind());
            assert_eq!(err, Some(ErrorKind::ValueValidation), "{args:?}");
        }
    }
}
