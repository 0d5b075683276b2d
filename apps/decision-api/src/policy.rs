//! HTTP handlers for policy administration
//!
//! - GET    /api/v1/policy                     - current snapshot version and config
//! - PUT    /api/v1/policy                     - replace the policy (new snapshot)
//! - PUT    /api/v1/policy/service-sets/:name  - replace one service set
//! - GET    /api/overrides                     - list overrides
//! - POST   /api/overrides                     - create an override
//! - DELETE /api/overrides/:service_id         - revoke overrides for a service
//!
//! Every successful write publishes a new rule snapshot; in-flight
//! evaluations keep the snapshot they started with.

use crate::error::{to_json, ApiError};
use aigov_decision::{Override, PolicyConfig, ServiceRole, ServiceSet, SnapshotStore};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared state for policy handlers
#[derive(Clone)]
pub struct PolicyState {
    pub store: Arc<SnapshotStore>,
}

/// Create the policy router
pub fn policy_router(state: PolicyState) -> Router {
    Router::new()
        .route("/api/v1/policy", get(get_policy).put(put_policy))
        .route("/api/v1/policy/service-sets/:name", put(put_service_set))
        .route("/api/overrides", get(list_overrides).post(create_override))
        .route("/api/overrides/:service_id", delete(revoke_override))
        .with_state(state)
}

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ServiceSetBody {
    role: String,
    #[serde(default)]
    services: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateOverrideBody {
    #[serde(alias = "domain")]
    service_id: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    created_by: String,
}

#[derive(Debug, Deserialize)]
struct ListOverridesQuery {
    #[serde(default)]
    include_inactive: bool,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/v1/policy
async fn get_policy(State(state): State<PolicyState>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.store.current()?;
    Ok(Json(serde_json::json!({
        "version": snapshot.version(),
        "published_at": snapshot.published_at(),
        "config": to_json(snapshot.config()),
    })))
}

/// PUT /api/v1/policy
async fn put_policy(
    State(state): State<PolicyState>,
    body: Result<Json<PolicyConfig>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let config = json_body(body)?;
    let version = state.store.publish(config)?;
    Ok(Json(serde_json::json!({ "version": version })))
}

/// PUT /api/v1/policy/service-sets/:name
async fn put_service_set(
    State(state): State<PolicyState>,
    Path(name): Path<String>,
    body: Result<Json<ServiceSetBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(body)?;
    let set = ServiceSet {
        name,
        role: ServiceRole::parse(&body.role)?,
        services: body.services,
    };
    let version = state.store.replace_service_set(set)?;
    Ok(Json(serde_json::json!({ "version": version })))
}

/// GET /api/overrides
async fn list_overrides(
    State(state): State<PolicyState>,
    Query(params): Query<ListOverridesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.store.current()?;
    let overrides: Vec<&Override> = snapshot
        .overrides()
        .iter()
        .filter(|o| params.include_inactive || o.active)
        .collect();
    Ok(Json(serde_json::json!({
        "overrides": overrides,
        "version": snapshot.version(),
    })))
}

/// POST /api/overrides
async fn create_override(
    State(state): State<PolicyState>,
    body: Result<Json<CreateOverrideBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(body)?;
    if body.service_id.trim().is_empty() {
        return Err(ApiError::BadRequest("service_id must not be empty".to_string()));
    }
    let ov = Override::new(body.service_id.trim().to_lowercase(), body.reason, body.created_by);
    let version = state.store.add_override(ov.clone())?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "override": ov, "version": version })),
    ))
}

/// DELETE /api/overrides/:service_id
async fn revoke_override(
    State(state): State<PolicyState>,
    Path(service_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.store.revoke_override(&service_id)? {
        return Err(ApiError::NotFound(format!(
            "No active override for {}",
            service_id
        )));
    }
    Ok(Json(serde_json::json!({
        "revoked": service_id,
        "version": state.store.version(),
    })))
}
