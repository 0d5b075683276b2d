//! Unified API router for the decision service
//!
//! Merges all module routers into a single axum `Router` with CORS and
//! request tracing.
//!
//! ## Endpoint Map
//!
//! | Prefix                    | Module  | Description                          |
//! |---------------------------|---------|--------------------------------------|
//! | `/`, `/health`            | api     | Banner and health check              |
//! | `/evaluate`               | api     | Evaluate one request                 |
//! | `/api/v1/content/*`       | content | Scan and redact text                 |
//! | `/api/v1/policy*`         | policy  | Read and replace the rule snapshot   |
//! | `/api/overrides*`         | policy  | Administrator overrides              |
//! | `/api/v1/decisions*`      | audit   | Audited decisions                    |
//! | `/stats/*`                | audit   | Summary, top services, violations    |

use crate::audit::{audit_router, AuditState};
use crate::content::{content_router, ContentState};
use crate::error::ApiError;
use crate::policy::{policy_router, PolicyState};
use aigov_decision::{Decision, DecisionRecord, DecisionRequest, DecisionService, FailureMode};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// State for the evaluation endpoints
#[derive(Clone)]
pub struct AppState {
    pub service: DecisionService,
    /// When set, an unconfigured engine answers with the fallback decision
    /// instead of 503
    pub failure_mode: Option<FailureMode>,
}

/// Build the complete HTTP application
pub fn build_app(state: AppState, audit_state: AuditState, cors_origins: &[String]) -> Router {
    let store = state.service.store().clone();
    let content_routes = content_router(ContentState {
        store: store.clone(),
    });
    let policy_routes = policy_router(PolicyState { store });

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .route("/evaluate", post(evaluate))
        .with_state(state)
        .merge(content_routes)
        .merge(policy_routes)
        .merge(audit_router(audit_state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

// =============================================================================
// Root handlers
// =============================================================================

async fn banner() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "aigov-decision-api",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health", "/evaluate", "/api/v1/policy", "/api/overrides", "/api/v1/decisions", "/stats/summary"],
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    snapshot_version: u64,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.service.store();
    let (code, status) = if store.is_configured() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unconfigured")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            snapshot_version: store.version(),
        }),
    )
}

// =============================================================================
// Evaluation
// =============================================================================

/// Decision plus audit metadata
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    #[serde(flatten)]
    pub decision: Decision,
    pub decision_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub snapshot_version: u64,
    pub evaluation_duration_ms: f64,
}

impl From<DecisionRecord> for EvaluateResponse {
    fn from(record: DecisionRecord) -> Self {
        Self {
            decision: record.decision,
            decision_id: record.decision_id,
            timestamp: record.timestamp,
            snapshot_version: record.snapshot_version,
            evaluation_duration_ms: record.evaluation_duration_ms,
        }
    }
}

/// POST /evaluate
async fn evaluate(
    State(state): State<AppState>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.user.email.trim().is_empty() {
        return Err(ApiError::BadRequest("user.email must not be empty".to_string()));
    }

    // Content scans are CPU-bound; keep them off the async workers
    let service = state.service.clone();
    let failure_mode = state.failure_mode;
    let record = tokio::task::spawn_blocking(move || match failure_mode {
        Some(mode) => Ok(service.evaluate_or_fallback(&request, mode)),
        None => service.evaluate(&request),
    })
    .await
    .map_err(|e| ApiError::Internal(format!("evaluation task failed: {e}")))?
    .map_err(ApiError::from)?;

    Ok(Json(record.into()))
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditEventBus, DecisionLog};
    use aigov_decision::{DecisionEngine, PolicyConfig, SnapshotStore};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::{Arc, RwLock};
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        log: Arc<RwLock<DecisionLog>>,
    }

    fn make_app(store: SnapshotStore, failure_mode: Option<FailureMode>) -> TestApp {
        let log = Arc::new(RwLock::new(DecisionLog::new(100)));
        let bus = Arc::new(AuditEventBus::new(16, log.clone()));
        let service = DecisionService::new(Arc::new(store), DecisionEngine::new(), bus);
        let app = build_app(
            AppState {
                service,
                failure_mode,
            },
            AuditState { log: log.clone() },
            &[],
        );
        TestApp { app, log }
    }

    fn configured() -> TestApp {
        make_app(SnapshotStore::new(PolicyConfig::default()).unwrap(), None)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn post_evaluate(app: Router, body: String) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/evaluate")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    fn request_json(email: &str, url: &str) -> String {
        serde_json::json!({
            "user": { "email": email },
            "resource": { "type": "ai_service", "url": url }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_banner() {
        let resp = configured()
            .app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["service"], "aigov-decision-api");
    }

    #[tokio::test]
    async fn test_health_configured() {
        let resp = configured()
            .app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["snapshot_version"], 1);
    }

    #[tokio::test]
    async fn test_health_unconfigured() {
        let resp = make_app(SnapshotStore::unconfigured(), None)
            .app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["status"], "unconfigured");
    }

    #[tokio::test]
    async fn test_evaluate_prohibited_is_audited() {
        let t = configured();
        let resp = post_evaluate(t.app, request_json("dev@corp.io", "https://character.ai")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["decision"], "DENY");
        assert_eq!(json["reason"], "service prohibited");
        assert_eq!(json["risk_score"], 90);
        assert_eq!(json["matched_rule"], "prohibited_service");
        assert_eq!(json["snapshot_version"], 1);

        let log = t.log.read().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(
            log.recent(1)[0].decision_id.to_string(),
            json["decision_id"].as_str().unwrap()
        );
    }

    #[tokio::test]
    async fn test_evaluate_approved_with_content() {
        let body = serde_json::json!({
            "user": { "email": "dev@corp.io", "department": "engineering" },
            "action": "submit_prompt",
            "resource": { "type": "ai_service", "url": "https://chatgpt.com/c/1" },
            "content": "Please review this paragraph for tone and grammar.",
            "context": { "source": "browser_extension" }
        });
        let resp = post_evaluate(configured().app, body.to_string()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["decision"], "ALLOW");
        assert_eq!(json["risk_score"], 10);
        assert!(json["evidence"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_malformed_body() {
        let resp = post_evaluate(configured().app, "{not json".to_string()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_evaluate_missing_email() {
        let resp = post_evaluate(configured().app, request_json(" ", "https://chatgpt.com")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_evaluate_unconfigured_is_503() {
        let t = make_app(SnapshotStore::unconfigured(), None);
        let resp = post_evaluate(t.app, request_json("dev@corp.io", "https://chatgpt.com")).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(resp).await["error"]["code"], "NOT_CONFIGURED");
        assert!(t.log.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_unconfigured_fail_closed() {
        let t = make_app(SnapshotStore::unconfigured(), Some(FailureMode::FailClosed));
        let resp = post_evaluate(t.app, request_json("dev@corp.io", "https://chatgpt.com")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["decision"], "DENY");
        assert_eq!(json["risk_score"], 100);
        assert_eq!(json["matched_rule"], "engine_unavailable");
        assert_eq!(json["snapshot_version"], 0);
        assert_eq!(t.log.read().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decisions_visible_through_audit_api() {
        let t = configured();
        post_evaluate(t.app.clone(), request_json("dev@corp.io", "https://character.ai")).await;
        post_evaluate(t.app.clone(), request_json("dev@corp.io", "https://chatgpt.com")).await;

        let resp = t
            .app
            .oneshot(
                Request::builder()
                    .uri("/stats/summary")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["total_recorded"], 2);
        assert_eq!(json["denied"], 1);
        assert_eq!(json["allowed"], 1);
    }

    #[test]
    fn test_build_cors_with_origins() {
        let _cors = build_cors(&["https://admin.corp.io".to_string()]);
        let _any = build_cors(&[]);
    }
}
