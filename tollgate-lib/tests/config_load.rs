use std::io::Write;

use tempfile::NamedTempFile;
use tollgate_lib::config::{load_from_path, load_from_str, Config, StartupOverrides};
use tollgate_lib::GatewayError;

#[test]
fn empty_file_uses_defaults() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = load_from_str("")?;
    assert_eq!(cfg.listen.to_string(), "0.0.0.0:8080");
    assert_eq!(cfg.limits.limit, 10);
    assert_eq!(cfg.limits.delay_ms, 0);
    assert_eq!(cfg.limits.window_ms, 0);
    assert_eq!(cfg.limits.percentage, 0);
    assert!(cfg.upstream.skip_tls_verification);
    assert_eq!(cfg.logging.level, "info");
    assert_eq!(cfg.timeout.shutdown_secs, 30);
    assert!(cfg.telemetry.metrics_port.is_none());
    Ok(())
}

#[test]
fn loads_full_file() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
listen = "127.0.0.1:9090"

[limits]
limit = 25
delay_ms = 40
window_ms = 500
percentage = 20

[upstream]
skip_tls_verification = false
connect_timeout_ms = 1500
pool_idle_timeout_secs = 10

[logging]
level = "debug"
show_target = true

[timeout]
shutdown_secs = 5

[telemetry]
metrics_port = 9100
"#
    )?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.listen.to_string(), "127.0.0.1:9090");
    assert_eq!(cfg.limits.limit, 25);
    assert_eq!(cfg.limits.delay_ms, 40);
    assert_eq!(cfg.limits.window_ms, 500);
    assert_eq!(cfg.limits.percentage, 20);
    assert!(!cfg.upstream.skip_tls_verification);
    assert_eq!(cfg.upstream.connect_timeout_ms, 1500);
    assert_eq!(cfg.upstream.pool_idle_timeout_secs, 10);
    assert_eq!(cfg.logging.level, "debug");
    assert!(cfg.logging.show_target);
    assert_eq!(cfg.timeout.shutdown_secs, 5);
    assert_eq!(cfg.telemetry.metrics_port, Some(9100));
    Ok(())
}

#[test]
fn zero_limit_is_rejected() {
    let result = load_from_str("[limits]\nlimit = 0\n");
    assert!(matches!(result, Err(GatewayError::Config(_))));
}

#[test]
fn percentage_over_100_is_rejected() {
    let result = load_from_str("[limits]\npercentage = 150\n");
    assert!(matches!(result, Err(GatewayError::Config(_))));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let result = load_from_str("listen = [not valid");
    assert!(matches!(result, Err(GatewayError::Config(_))));
}

#[test]
fn missing_file_is_a_config_error() {
    let result = load_from_path("/nonexistent/tollgate.toml");
    assert!(matches!(result, Err(GatewayError::Config(_))));
}

#[test]
fn startup_values_override_file() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base = load_from_str("[limits]\nlimit = 25\nwindow_ms = 500\n")?;
    let overrides = StartupOverrides {
        port: Some(7000),
        limit: Some(3),
        duration_ms: Some(-1),
        skip_tls_verification: Some(false),
        ..Default::default()
    };

    let cfg = overrides.apply(base)?;
    assert_eq!(cfg.listen.port(), 7000);
    assert_eq!(cfg.limits.limit, 3);
    assert_eq!(cfg.limits.window_ms, 0);
    assert!(!cfg.upstream.skip_tls_verification);
    Ok(())
}

#[test]
fn startup_values_are_validated() {
    let overrides = StartupOverrides { limit: Some(0), ..Default::default() };
    assert!(overrides.apply(Config::default()).is_err());
}
