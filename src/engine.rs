//! Decision assembly
//!
//! [`DecisionEngine`] runs the matcher and detector, feeds their output to
//! the rule evaluator and risk scorer, and enforces the score invariants on
//! the final [`Decision`].

use crate::error::Result;
use crate::rules::{Evaluation, RuleEvaluator};
use crate::scoring::RiskScorer;
use crate::service::ServiceMatch;
use crate::snapshot::{RuleSnapshot, SnapshotStore};
use crate::types::{
    Decision, DecisionRequest, DecisionStatus, Finding, FindingCategory, MatchedRule,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum score of any DENY
pub const DENY_SCORE_FLOOR: u8 = 60;
/// Maximum score of any ALLOW; higher-scoring ALLOWs are escalated to REVIEW
pub const ALLOW_SCORE_CEILING: u8 = 40;

pub const REASON_SCAN_BUDGET: &str = "content scan exceeded time budget";

/// Stateless evaluator. One instance can serve every caller.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    rules: RuleEvaluator,
    scorer: RiskScorer,
    scan_budget: Option<Duration>,
}

/// A decision plus what was resolved on the way to it
#[derive(Debug, Clone)]
pub struct Outcome {
    pub decision: Decision,
    pub service: ServiceMatch,
    pub snapshot_version: u64,
    pub duration: Duration,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bias decisions toward REVIEW when a content scan takes longer than
    /// `budget`. Scanning always runs to completion.
    pub fn with_scan_budget(mut self, budget: Duration) -> Self {
        self.scan_budget = Some(budget);
        self
    }

    pub fn scan_budget(&self) -> Option<Duration> {
        self.scan_budget
    }

    /// Evaluate `request` against the store's current snapshot
    pub fn evaluate_current(
        &self,
        request: &DecisionRequest,
        store: &SnapshotStore,
    ) -> Result<(Outcome, Arc<RuleSnapshot>)> {
        let snapshot = store.current()?;
        let outcome = self.evaluate_detailed(request, &snapshot);
        Ok((outcome, snapshot))
    }

    /// Evaluate `request` against `snapshot`
    pub fn evaluate(&self, request: &DecisionRequest, snapshot: &RuleSnapshot) -> Decision {
        self.evaluate_detailed(request, snapshot).decision
    }

    pub fn evaluate_detailed(&self, request: &DecisionRequest, snapshot: &RuleSnapshot) -> Outcome {
        let started = Instant::now();
        let service = snapshot.matcher().match_service(request.resource.target());

        let (findings, budget_exceeded) = match request.content.as_deref() {
            Some(content) if !content.trim().is_empty() => {
                let scan_started = Instant::now();
                let findings = snapshot.detector().detect(content);
                let exceeded = self
                    .scan_budget
                    .map(|budget| scan_started.elapsed() >= budget)
                    .unwrap_or(false);
                (findings, exceeded)
            }
            _ => (Vec::new(), false),
        };

        let evaluation = self.rules.evaluate(request, &service, &findings, snapshot);
        let risk_score = self.scorer.score(&evaluation, &findings);
        let decision = assemble(evaluation, risk_score, findings, budget_exceeded);

        tracing::debug!(
            user = %request.user.email,
            service = %service.service_id,
            decision = %decision.status,
            rule = %decision.matched_rule,
            risk_score = decision.risk_score,
            version = snapshot.version(),
            "Evaluated request"
        );

        Outcome {
            decision,
            service,
            snapshot_version: snapshot.version(),
            duration: started.elapsed(),
        }
    }
}

/// Package a rule evaluation into a decision, enforcing score invariants
fn assemble(
    evaluation: Evaluation,
    risk_score: u8,
    findings: Vec<Finding>,
    budget_exceeded: bool,
) -> Decision {
    let mut status = evaluation.status;
    let mut reason = evaluation.reason;
    let mut risk_score = risk_score;
    let mut escalation = None;

    match status {
        DecisionStatus::Deny => risk_score = risk_score.max(DENY_SCORE_FLOOR),
        DecisionStatus::Allow if budget_exceeded => {
            tracing::warn!(rule = %evaluation.matched_rule, "Content scan exceeded time budget");
            status = DecisionStatus::Review;
            reason = REASON_SCAN_BUDGET.to_string();
            escalation = Some("Submit smaller content so it can be scanned in time");
        }
        // overridden scores keep the exact discount, so escalate instead of clamping
        DecisionStatus::Allow
            if evaluation.override_applied && risk_score > ALLOW_SCORE_CEILING =>
        {
            status = DecisionStatus::Review;
            reason = format!(
                "{}; escalated for review, risk score {} exceeds {}",
                reason, risk_score, ALLOW_SCORE_CEILING
            );
            escalation = Some("Wait for a reviewer: content risk is above the automatic approval threshold");
        }
        DecisionStatus::Allow => risk_score = risk_score.min(ALLOW_SCORE_CEILING),
        _ => {}
    }

    let mut recommendations = Vec::new();
    let mut push = |text: &str| {
        if !recommendations.iter().any(|r| r == text) {
            recommendations.push(text.to_string());
        }
    };

    for text in rule_recommendations(evaluation.matched_rule) {
        push(text);
    }
    if evaluation.override_applied {
        push("Access is granted by an administrator override and is audited");
    }
    if findings.iter().any(|f| f.category == FindingCategory::Pii) {
        push("Remove or redact personal data before sharing");
    }
    if findings.iter().any(|f| f.category == FindingCategory::Secret) {
        push("Remove credentials, keys, and tokens before sharing");
    }
    if findings.iter().any(|f| f.category == FindingCategory::Proprietary) {
        push("Do not share confidential material with external AI services");
    }
    if let Some(text) = escalation {
        push(text);
    }

    Decision {
        status,
        reason,
        risk_score,
        evidence: findings,
        matched_rule: evaluation.matched_rule,
        recommendations,
    }
}

fn rule_recommendations(rule: MatchedRule) -> &'static [&'static str] {
    match rule {
        MatchedRule::ProhibitedService => &[
            "Use an approved AI service instead",
            "Request an exception from the AI governance team if there is a business need",
        ],
        MatchedRule::CriticalContent => &["Rotate any secret that may have been exposed"],
        MatchedRule::DepartmentTraining => &["Complete the AI usage training for your department"],
        MatchedRule::ReviewRequired => &["Request manager approval for this service"],
        MatchedRule::ApprovedService => &[],
        MatchedRule::DefaultAllow => &["Usage of unlisted AI services is monitored"],
        MatchedRule::DefaultDeny => {
            &["Request that this service be added to the approved list"]
        }
        MatchedRule::EngineUnavailable => &[],
    }
}
