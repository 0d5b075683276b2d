//! HTTP handlers for ad-hoc content inspection
//!
//! - POST /api/v1/content/scan     - run the current detector on text
//! - POST /api/v1/content/redact   - mask every detected value
//!
//! Both use the detector compiled into the current rule snapshot, so
//! results match what `/evaluate` would see.

use crate::error::ApiError;
use aigov_decision::detector::should_bulk_skip;
use aigov_decision::{DetectedMatch, Finding, SnapshotStore};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for content handlers
#[derive(Clone)]
pub struct ContentState {
    pub store: Arc<SnapshotStore>,
}

/// Create the content router
pub fn content_router(state: ContentState) -> Router {
    Router::new()
        .route("/api/v1/content/scan", post(scan))
        .route("/api/v1/content/redact", post(redact))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub findings: Vec<Finding>,
    pub matches: Vec<DetectedMatch>,
    pub bulk_skipped: bool,
    pub snapshot_version: u64,
}

#[derive(Debug, Serialize)]
pub struct RedactResponse {
    pub redacted: String,
    pub redaction_count: usize,
    pub snapshot_version: u64,
}

fn content_body(body: Result<Json<ContentRequest>, JsonRejection>) -> Result<ContentRequest, ApiError> {
    body.map(|Json(req)| req)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// POST /api/v1/content/scan
async fn scan(
    State(state): State<ContentState>,
    body: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let req = content_body(body)?;
    let snapshot = state.store.current()?;
    let detector = snapshot.detector();
    Ok(Json(ScanResponse {
        findings: detector.detect(&req.text),
        matches: detector.scan(&req.text),
        bulk_skipped: should_bulk_skip(&req.text),
        snapshot_version: snapshot.version(),
    }))
}

/// POST /api/v1/content/redact
async fn redact(
    State(state): State<ContentState>,
    body: Result<Json<ContentRequest>, JsonRejection>,
) -> Result<Json<RedactResponse>, ApiError> {
    let req = content_body(body)?;
    let snapshot = state.store.current()?;
    let (redacted, redaction_count) = snapshot.detector().redact_with_count(&req.text);
    Ok(Json(RedactResponse {
        redacted,
        redaction_count,
        snapshot_version: snapshot.version(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigov_decision::PolicyConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_app(store: SnapshotStore) -> Router {
        content_router(ContentState {
            store: Arc::new(store),
        })
    }

    fn configured() -> Router {
        make_app(SnapshotStore::new(PolicyConfig::default()).unwrap())
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_scan_finds_ssn() {
        let resp = post_json(
            configured(),
            "/api/v1/content/scan",
            serde_json::json!({"text": "Customer record\nSSN 123-45-6789 on file"}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["bulk_skipped"], false);
        assert_eq!(json["snapshot_version"], 1);
        assert_eq!(json["findings"][0]["name"], "ssn");
        assert_eq!(json["findings"][0]["category"], "pii");
        assert_eq!(json["matches"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_reports_bulk_skip() {
        let text = "// TODO: replace\n// FIXME\ncall(123-45-6789)";
        let json = body_json(
            post_json(configured(), "/api/v1/content/scan", serde_json::json!({ "text": text })).await,
        )
        .await;
        assert_eq!(json["bulk_skipped"], true);
        assert!(json["findings"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redact() {
        let resp = post_json(
            configured(),
            "/api/v1/content/redact",
            serde_json::json!({"text": "Ticket details\nSSN 123-45-6789 please"}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["redaction_count"], 1);
        let redacted = json["redacted"].as_str().unwrap();
        assert!(!redacted.contains("123-45-6789"));
        assert!(redacted.starts_with("Ticket details\nSSN "));
    }

    #[tokio::test]
    async fn test_redaction_count_matches_masks_applied() {
        let json = body_json(
            post_json(
                configured(),
                "/api/v1/content/redact",
                serde_json::json!({"text": "this is strictly confidential material"}),
            )
            .await,
        )
        .await;
        assert_eq!(json["redacted"], "this is [REDACTED] material");
        assert_eq!(json["redaction_count"], 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        for uri in ["/api/v1/content/scan", "/api/v1/content/redact"] {
            let resp = configured()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .header("content-type", "application/json")
                        .body(Body::from("{\"text\": 42"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let json = body_json(resp).await;
            assert_eq!(json["error"]["code"], "BAD_REQUEST");
            assert!(json["error"]["message"].is_string());
        }

        let resp = post_json(configured(), "/api/v1/content/scan", serde_json::json!({"body": "x"})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unconfigured_is_503() {
        let resp = post_json(
            make_app(SnapshotStore::unconfigured()),
            "/api/v1/content/scan",
            serde_json::json!({"text": "anything"}),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["error"]["code"], "NOT_CONFIGURED");
    }
}
