//! HTTP handlers for the decision audit API
//!
//! - GET /api/v1/decisions          - list audited decisions (paginated, filterable)
//! - GET /api/v1/decisions/:id      - get one decision
//! - GET /stats/summary             - counts by status, average score, unique users
//! - GET /stats/top-services        - services by request volume
//! - GET /stats/violations          - recent DENY decisions

use super::log::{DecisionFilter, DecisionLog};
use crate::error::{to_json, ApiError};
use aigov_decision::{DecisionRecord, DecisionStatus};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Shared state for audit handlers
#[derive(Clone)]
pub struct AuditState {
    pub log: Arc<RwLock<DecisionLog>>,
}

/// Create the audit router
pub fn audit_router(state: AuditState) -> Router {
    Router::new()
        .route("/api/v1/decisions", get(list_decisions))
        .route("/api/v1/decisions/:id", get(get_decision))
        .route("/stats/summary", get(summary))
        .route("/stats/top-services", get(top_services))
        .route("/stats/violations", get(violations))
        .with_state(state)
}

// =============================================================================
// Query types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListDecisionsQuery {
    user: Option<String>,
    decision: Option<String>,
    service: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

fn parse_status(s: &str) -> Option<DecisionStatus> {
    match s.to_ascii_uppercase().as_str() {
        "ALLOW" => Some(DecisionStatus::Allow),
        "DENY" => Some(DecisionStatus::Deny),
        "REVIEW" => Some(DecisionStatus::Review),
        _ => None,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/v1/decisions
async fn list_decisions(
    State(state): State<AuditState>,
    Query(params): Query<ListDecisionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match params.decision.as_deref() {
        Some(s) => Some(
            parse_status(s).ok_or_else(|| ApiError::BadRequest(format!("unknown decision '{}'", s)))?,
        ),
        None => None,
    };
    let filter = DecisionFilter {
        user: params.user,
        status,
        service: params.service,
    };
    let limit = params.limit.unwrap_or(50).min(500);
    let offset = params.offset.unwrap_or(0);

    // Clone under the lock, serialize after releasing it
    let (page, total): (Vec<DecisionRecord>, usize) = {
        let log = state.log.read().unwrap_or_else(|e| e.into_inner());
        let matched = log.query(&filter);
        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    };

    Ok(Json(serde_json::json!({
        "decisions": page,
        "total": total,
        "offset": offset,
        "limit": limit,
    })))
}

/// GET /api/v1/decisions/:id
async fn get_decision(
    State(state): State<AuditState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound(format!("Decision {} not found", id));
    let uuid = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let record = state
        .log
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&uuid)
        .cloned()
        .ok_or_else(not_found)?;
    Ok(Json(to_json(record)))
}

/// GET /stats/summary
async fn summary(State(state): State<AuditState>) -> impl IntoResponse {
    let summary = state.log.read().unwrap_or_else(|e| e.into_inner()).summary();
    Json(to_json(summary))
}

/// GET /stats/top-services
async fn top_services(
    State(state): State<AuditState>,
    Query(params): Query<LimitQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(10).min(100);
    let services = state
        .log
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .top_services(limit);
    Json(serde_json::json!({ "services": services }))
}

/// GET /stats/violations
async fn violations(
    State(state): State<AuditState>,
    Query(params): Query<LimitQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(50).min(500);
    let (page, total): (Vec<DecisionRecord>, usize) = {
        let log = state.log.read().unwrap_or_else(|e| e.into_inner());
        let denied = log.query(&DecisionFilter {
            status: Some(DecisionStatus::Deny),
            ..Default::default()
        });
        let total = denied.len();
        (denied.into_iter().take(limit).cloned().collect(), total)
    };
    Json(serde_json::json!({ "violations": page, "total": total }))
}
