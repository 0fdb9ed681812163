// tests/metrics_endpoint.rs
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt as _;

use smart_bin_dashboard::alerts::AlertDispatcher;
use smart_bin_dashboard::{create_router, AppState, Dashboard, FleetConfig};

#[tokio::test]
async fn metrics_expose_fleet_and_ingest_series() {
    let state = AppState::new(
        Dashboard::new(FleetConfig::default()),
        AlertDispatcher::disabled(),
    );
    let app = create_router(state);

    let upload = json!({ "device_id": "ESP32_BIN_01", "fill_percentage": 42 });
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ingest")
                .header("content-type", "application/json")
                .body(Body::from(upload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    for series in [
        "fleet_offline_threshold_ms",
        "fleet_configured_bins",
        "fleet_active_bins",
        "fleet_health_percent",
        "bin_ingest_uploads_total",
    ] {
        assert!(text.contains(series), "missing {series} in:\n{text}");
    }
}
