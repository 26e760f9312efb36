use http_body_util::BodyExt;
use serial_test::serial;
use tollgate_lib::control::{AdmissionSettings, LiveConfig};
use tollgate_lib::telemetry::{handle_metrics, init_metrics, ready_check_response};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::test]
#[serial]
async fn recorded_metrics_are_exported() -> Result<(), BoxError> {
    let (metrics, registry) = init_metrics()?;
    metrics.record_admission("too_many_requests", "simple");
    metrics.record_config_update("limit", "applied");

    let resp = handle_metrics(&registry)?;
    assert_eq!(resp.status(), http::StatusCode::OK);
    let body = resp.into_body().collect().await?.to_bytes();
    let text = String::from_utf8(body.to_vec())?;

    assert!(text.contains("tollgate_admission_decisions_total"));
    assert!(text.contains("too_many_requests"));
    assert!(text.contains("tollgate_config_updates_total"));
    Ok(())
}

#[tokio::test]
async fn ready_reports_tracked_clients() -> Result<(), BoxError> {
    let live = LiveConfig::new(AdmissionSettings::default());
    live.limiter().exceeds_limit("10.0.0.1");

    let resp = ready_check_response(&live)?;
    assert_eq!(resp.status(), http::StatusCode::OK);
    let body = resp.into_body().collect().await?.to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["status"], "ready");
    assert_eq!(json["tracked_clients"], 1);
    Ok(())
}
