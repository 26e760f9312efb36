use http::StatusCode;
use hyper::Response;
use tracing::info;

use crate::control::{ConfigOverrides, LiveConfig};
use crate::proxy::http_result::HttpResult;
use crate::proxy::synthetic_response::{json_response, RespBody};
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// `/config`: apply the query overrides and answer with the effective settings
pub fn config_response(
    live: &LiveConfig,
    query: Option<&str>,
    metrics: Option<&Metrics>,
) -> HttpResult<Response<RespBody>> {
    let overrides = ConfigOverrides::from_query(query);
    if overrides.is_empty() {
        return json_response(StatusCode::OK, &live.settings());
    }

    let report = live.apply(&overrides);
    info!(
        applied = report.applied.len(),
        rejected = report.rejected.len(),
        rebuilt = report.rebuilt,
        "Configuration updated"
    );

    if let Some(m) = metrics {
        for parameter in &report.applied {
            m.record_config_update(parameter.as_str(), values::OUTCOME_APPLIED);
        }
        for parameter in &report.rejected {
            m.record_config_update(parameter.as_str(), values::OUTCOME_REJECTED);
        }
        if report.rebuilt {
            m.limiter_rebuilds_total.add(1, &[]);
        }
    }

    json_response(StatusCode::OK, &report.settings)
}
