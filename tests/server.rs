//! HTTP API Integration Tests
//!
//! Drives the router with `oneshot` requests; no socket is bound.

use alertflow::actions::{Action, ActionRegistry, DummyAction};
use alertflow::config::ExecutorSettings;
use alertflow::core::EnrichmentService;
use alertflow::domain::{parse_rules, parse_workflow_defs};
use alertflow::server::build_router;
use async_trait::async_trait;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use tower::ServiceExt;

struct Refuse;

#[async_trait]
impl Action for Refuse {
    fn name(&self) -> &str {
        "refuse"
    }

    async fn run(&self, _input: &str) -> anyhow::Result<String> {
        anyhow::bail!("lookup service unavailable")
    }
}

async fn app() -> axum::Router {
    let registry = ActionRegistry::builder()
        .register(DummyAction)
        .register(Refuse)
        .build()
        .await
        .unwrap();

    let rules = parse_rules(
        r#"[
            {"name": "tag", "match": {"key": "alert", "value": "Test"}, "workflow": "tag"},
            {"name": "broken", "match": {"key": "alert", "value": "Broken"}, "workflow": "broken"}
        ]"#,
    )
    .unwrap();
    let defs = parse_workflow_defs(
        r#"{
            "tag": [{"step": "tag", "action": "dummy", "input": "alert", "output": "dummy"}],
            "broken": [{"step": "refuse", "action": "refuse", "input": "alert", "output": "x"}]
        }"#,
    )
    .unwrap();

    let service = EnrichmentService::build(rules, defs, registry, &ExecutorSettings::default()).unwrap();
    build_router(service.executor())
}

/// POST a raw body to /enrich and return (status, parsed JSON body)
async fn post_enrich(app: axum::Router, body: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/enrich")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn enrich_returns_enriched_alerts() {
    let (status, body) = post_enrich(
        app().await,
        r#"[{"alert": "Test", "id": "1"}, {"alert": "Other"}]"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["alert"], "Test");
    assert_eq!(body[0]["id"], "1");
    assert_eq!(body[0]["dummy"], "Dummy");
    assert_eq!(body[1], serde_json::json!({"alert": "Other"}));
}

#[tokio::test]
async fn enrich_accepts_empty_batch() {
    let (status, body) = post_enrich(app().await, "[]").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    for body in ["not json", r#"{"alert": "Test"}"#, r#"[{"alert": 7}]"#, ""] {
        let (status, json) = post_enrich(app().await, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body:?}");
        assert!(json["error"].as_str().unwrap().starts_with("Failed to parse alerts"));
    }
}

#[tokio::test]
async fn enrichment_failure_is_server_error() {
    let (status, json) = post_enrich(
        app().await,
        r#"[{"alert": "Test"}, {"alert": "Broken"}]"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to enrich alerts");
}

#[tokio::test]
async fn unmatched_alert_passes_through() {
    let (status, body) = post_enrich(app().await, r#"[{"id": "x"}]"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0], serde_json::json!({"id": "x"}));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/nope")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app().await.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
