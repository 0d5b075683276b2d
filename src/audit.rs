//! Decision records and the service that produces them
//!
//! The core does not persist anything. A [`DecisionSink`] receives every
//! record and decides what to do with it.

use crate::engine::DecisionEngine;
use crate::error::Result;
use crate::fallback::{fallback_decision, FailureMode};
use crate::snapshot::SnapshotStore;
use crate::types::{Decision, DecisionRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One audited decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// 0 when the decision came from a fallback
    pub snapshot_version: u64,
    pub user_email: String,
    #[serde(default)]
    pub department: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_url: String,
    /// Resolved service identifier, empty for fallback decisions
    #[serde(default)]
    pub service_id: String,
    pub source: String,
    pub decision: Decision,
    pub evaluation_duration_ms: f64,
}

impl DecisionRecord {
    fn new(
        request: &DecisionRequest,
        decision: Decision,
        snapshot_version: u64,
        service_id: String,
        duration_ms: f64,
    ) -> Self {
        Self {
            decision_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            snapshot_version,
            user_email: request.user.email.clone(),
            department: request.user.department.clone(),
            action: request.action.clone(),
            resource_type: request.resource.kind.clone(),
            resource_url: request.resource.target().to_string(),
            service_id,
            source: request.context.source.clone(),
            decision,
            evaluation_duration_ms: duration_ms,
        }
    }
}

/// Receiver of decision records. Must not block the caller.
pub trait DecisionSink: Send + Sync {
    fn record(&self, record: &DecisionRecord);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DecisionSink for NullSink {
    fn record(&self, _record: &DecisionRecord) {}
}

/// Evaluates requests against the current snapshot and records the result
#[derive(Clone)]
pub struct DecisionService {
    store: Arc<SnapshotStore>,
    engine: DecisionEngine,
    sink: Arc<dyn DecisionSink>,
}

impl std::fmt::Debug for DecisionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionService")
            .field("store", &self.store)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl DecisionService {
    pub fn new(store: Arc<SnapshotStore>, engine: DecisionEngine, sink: Arc<dyn DecisionSink>) -> Self {
        Self { store, engine, sink }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Evaluate and record. Fails with `NotConfigured` when nothing has
    /// been published.
    pub fn evaluate(&self, request: &DecisionRequest) -> Result<DecisionRecord> {
        let (outcome, _snapshot) = self.engine.evaluate_current(request, &self.store)?;
        let record = DecisionRecord::new(
            request,
            outcome.decision,
            outcome.snapshot_version,
            outcome.service.service_id,
            outcome.duration.as_secs_f64() * 1000.0,
        );
        self.sink.record(&record);
        Ok(record)
    }

    /// Evaluate, substituting the fallback decision for `mode` on failure.
    /// Fallback decisions are recorded too.
    pub fn evaluate_or_fallback(&self, request: &DecisionRequest, mode: FailureMode) -> DecisionRecord {
        match self.evaluate(request) {
            Ok(record) => record,
            Err(e) => {
                let decision = fallback_decision(mode, &e.to_string());
                let record = DecisionRecord::new(request, decision, 0, String::new(), 0.0);
                self.sink.record(&record);
                record
            }
        }
    }
}
