mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use serde_json::Value;

use common::*;

fn admin_app(api_key: Option<&str>) -> (axum::Router, Arc<RecordingLogger>) {
    let mut config = test_config();
    config.admin.api_key = api_key.map(str::to_owned);
    let logger = RecordingLogger::new();
    let pipeline = pipeline(&config, &logger).with_sampler(Arc::new(FixedSampler(0.0)));
    (app(config, pipeline), logger)
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_status_reports_version() {
    let (app, _) = admin_app(None);
    let (response, body) = send(&app, get("/_telemetry/status")).await;

    assert_eq!(response.status(), 200);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["status"], "operational");
    assert_eq!(json["active_progress_sessions"], 0);
}

#[tokio::test]
async fn test_stats_reflect_traffic_and_skip_admin_routes() {
    let (app, _) = admin_app(None);
    send(&app, get("/api/announcements")).await;
    send(&app, get("/api/homework/5")).await;
    send(&app, get("/_telemetry/status")).await;

    let (response, body) = send(&app, get("/_telemetry/stats")).await;
    assert_eq!(response.status(), 200);
    // Admin responses are not instrumented.
    assert!(response.headers().get("x-response-time").is_none());

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["overall"]["count"], 2);
    assert_eq!(json["endpoints"]["GET /api/homework/{id}"]["count"], 1);
    assert_eq!(json["endpoints"].as_object().unwrap().len(), 2);
    assert_eq!(json["roles"]["anonymous"]["count"], 2);
}

#[tokio::test]
async fn test_flush_logs_and_returns_snapshot() {
    let (app, logger) = admin_app(None);
    send(&app, get("/api/announcements")).await;

    let (response, body) = send(&app, post("/_telemetry/flush")).await;
    assert_eq!(response.status(), 200);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["overall"]["count"], 1);

    let flushes = logger.with_message("Performance statistics");
    assert_eq!(flushes.len(), 1);
    assert_eq!(flushes[0].meta, json);
}

#[tokio::test]
async fn test_reset_clears_aggregates() {
    let (app, _) = admin_app(None);
    send(&app, get("/api/announcements")).await;

    let (response, body) = send(&app, post("/_telemetry/reset")).await;
    assert_eq!(response.status(), 204);
    assert!(body.is_empty());

    let (_, body) = send(&app, get("/_telemetry/stats")).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["overall"]["count"], 0);
    assert!(json["endpoints"].as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_api_key_is_enforced_when_configured() {
    let (app, _) = admin_app(Some("s3cret"));

    let (response, _) = send(&app, get("/_telemetry/stats")).await;
    assert_eq!(response.status(), 401);

    let wrong = Request::get("/_telemetry/stats")
        .header("authorization", "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.0.status(), 401);

    let right = Request::get("/_telemetry/stats")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, right).await.0.status(), 200);

    // Demo routes stay open.
    assert_eq!(send(&app, get("/api/announcements")).await.0.status(), 200);
}

#[tokio::test]
async fn test_admin_can_be_disabled() {
    let mut config = test_config();
    config.admin.enabled = false;
    let logger = RecordingLogger::new();
    let app = app(config.clone(), pipeline(&config, &logger));

    let (response, _) = send(&app, get("/_telemetry/status")).await;
    assert_eq!(response.status(), 404);
}
