use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::error::{GatewayError, Result};

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const DECISION: &str = "decision";
    pub const MODE: &str = "mode";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const PARAMETER: &str = "parameter";
    pub const OUTCOME: &str = "outcome";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const OUTCOME_APPLIED: &str = "applied";
    pub const OUTCOME_REJECTED: &str = "rejected";
}

#[derive(Clone)]
pub struct Metrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,

    pub requests_total: Counter<u64>,
    pub requests_duration_seconds: Histogram<f64>,

    // Admission metrics
    pub admission_decisions_total: Counter<u64>,
    pub admission_delay_seconds: Histogram<f64>,

    pub upstream_requests_total: Counter<u64>,
    pub upstream_errors_total: Counter<u64>,
    pub upstream_duration_seconds: Histogram<f64>,

    // Live configuration metrics
    pub config_updates_total: Counter<u64>,
    pub limiter_rebuilds_total: Counter<u64>,

    pub errors_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("tollgate_connections_total")
                .with_description("Total number of connections accepted")
                .build(),
            connections_active: meter
                .i64_up_down_counter("tollgate_connections_active")
                .with_description("Number of active connections")
                .build(),

            requests_total: meter
                .u64_counter("tollgate_requests_total")
                .with_description("Total number of requests processed")
                .build(),
            requests_duration_seconds: meter
                .f64_histogram("tollgate_requests_duration_seconds")
                .with_description("Request duration in seconds, including injected delay")
                .build(),

            admission_decisions_total: meter
                .u64_counter("tollgate_admission_decisions_total")
                .with_description("Admission decisions by outcome (admitted, too_many_requests, below_percentage)")
                .build(),
            admission_delay_seconds: meter
                .f64_histogram("tollgate_admission_delay_seconds")
                .with_description("Artificial delay applied before admission, in seconds")
                .build(),

            upstream_requests_total: meter
                .u64_counter("tollgate_upstream_requests_total")
                .with_description("Total number of requests forwarded upstream")
                .build(),
            upstream_errors_total: meter
                .u64_counter("tollgate_upstream_errors_total")
                .with_description("Total number of upstream transport errors")
                .build(),
            upstream_duration_seconds: meter
                .f64_histogram("tollgate_upstream_duration_seconds")
                .with_description("Upstream request duration in seconds")
                .build(),

            config_updates_total: meter
                .u64_counter("tollgate_config_updates_total")
                .with_description("Runtime configuration values by parameter and outcome")
                .build(),
            limiter_rebuilds_total: meter
                .u64_counter("tollgate_limiter_rebuilds_total")
                .with_description("Number of times the rate limiter store was rebuilt")
                .build(),

            errors_total: meter
                .u64_counter("tollgate_errors_total")
                .with_description("Total number of errors")
                .build(),

            build_info: meter
                .u64_gauge("tollgate_build_info")
                .with_description("Build information (version, rust version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_request(&self, method: &str, status_code: u16, mode: &str, duration: f64) {
        let attrs = [
            KeyValue::new(labels::METHOD, method.to_string()),
            KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
            KeyValue::new(labels::MODE, mode.to_string()),
        ];
        self.requests_total.add(1, &attrs);
        self.requests_duration_seconds.record(duration, &attrs);
    }

    pub fn record_admission(&self, decision: &str, mode: &str) {
        self.admission_decisions_total.add(
            1,
            &[
                KeyValue::new(labels::DECISION, decision.to_string()),
                KeyValue::new(labels::MODE, mode.to_string()),
            ],
        );
    }

    pub fn record_delay(&self, delay_ms: u64) {
        if delay_ms > 0 {
            self.admission_delay_seconds
                .record(delay_ms as f64 / 1000.0, &[]);
        }
    }

    pub fn record_upstream(&self, status_code: u16, duration: f64) {
        let attrs = [KeyValue::new(labels::STATUS_CODE, status_code.to_string())];
        self.upstream_requests_total.add(1, &attrs);
        self.upstream_duration_seconds.record(duration, &attrs);
    }

    pub fn record_upstream_error(&self, error_type: &'static str) {
        self.upstream_errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type)]);
    }

    pub fn record_config_update(&self, parameter: &'static str, outcome: &'static str) {
        self.config_updates_total.add(
            1,
            &[
                KeyValue::new(labels::PARAMETER, parameter),
                KeyValue::new(labels::OUTCOME, outcome),
            ],
        );
    }

    pub fn record_error(&self, error_type: &'static str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type)]);
    }
}

/// Install the Prometheus-backed meter provider and build the metric set.
pub fn init_metrics() -> Result<(Arc<Metrics>, Registry)> {
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|e| GatewayError::Telemetry(format!("Failed to build Prometheus exporter: {e}")))?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("tollgate");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
