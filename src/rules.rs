//! Precedence-ordered rule evaluation
//!
//! Rules are plain functions tried in order; the first one that returns a
//! verdict wins. The final rule applies the snapshot's default policy and
//! always produces one.

use crate::service::ServiceMatch;
use crate::snapshot::{DefaultPolicy, Override, RuleSnapshot};
use crate::types::{DecisionRequest, DecisionStatus, Finding, MatchedRule, Severity};

pub const REASON_PROHIBITED: &str = "service prohibited";
pub const REASON_CRITICAL: &str = "critical sensitive content detected";
pub const REASON_TRAINING: &str = "training required for department";
pub const REASON_APPROVAL: &str = "manager approval required";
pub const REASON_APPROVED: &str = "service approved";
pub const REASON_DEFAULT_ALLOW: &str = "default allow, monitored";
pub const REASON_DEFAULT_DENY: &str = "service not in approved list";

/// Provisional outcome of rule evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub status: DecisionStatus,
    pub reason: String,
    pub matched_rule: MatchedRule,
    /// An active override neutralized a `prohibited` membership and the
    /// outcome came from a later rule
    pub override_applied: bool,
}

/// Inputs shared by every rule
pub struct RuleContext<'a> {
    pub request: &'a DecisionRequest,
    pub service: &'a ServiceMatch,
    pub findings: &'a [Finding],
    pub default_policy: DefaultPolicy,
    pub active_override: Option<&'a Override>,
}

impl RuleContext<'_> {
    fn user_approved(&self) -> bool {
        self.request
            .user
            .has_approval_for(&self.service.service_id, &self.service.target)
    }

    fn in_user_department(&self) -> bool {
        self.service
            .in_department(self.request.user.department.as_deref())
    }
}

type Verdict = (DecisionStatus, &'static str, MatchedRule);
type Rule = fn(&RuleContext<'_>) -> Option<Verdict>;

/// Evaluation order. A prohibited service covered by an active override
/// falls through `prohibited_service` and is handled by the later rules.
const RULES: &[(&str, Rule)] = &[
    ("prohibited_service", prohibited_service),
    ("critical_content", critical_content),
    ("department_training", department_training),
    ("review_required", review_required),
    ("approved_service", approved_service),
];

fn prohibited_service(ctx: &RuleContext<'_>) -> Option<Verdict> {
    (ctx.service.is_prohibited() && ctx.active_override.is_none()).then_some((
        DecisionStatus::Deny,
        REASON_PROHIBITED,
        MatchedRule::ProhibitedService,
    ))
}

fn critical_content(ctx: &RuleContext<'_>) -> Option<Verdict> {
    ctx.findings
        .iter()
        .any(|f| f.severity == Severity::Critical)
        .then_some((
            DecisionStatus::Deny,
            REASON_CRITICAL,
            MatchedRule::CriticalContent,
        ))
}

fn department_training(ctx: &RuleContext<'_>) -> Option<Verdict> {
    (ctx.in_user_department() && !ctx.request.user.training_completed).then_some((
        DecisionStatus::Review,
        REASON_TRAINING,
        MatchedRule::DepartmentTraining,
    ))
}

fn review_required(ctx: &RuleContext<'_>) -> Option<Verdict> {
    (ctx.service.is_review_required() && !ctx.user_approved() && ctx.active_override.is_none())
        .then_some((
            DecisionStatus::Review,
            REASON_APPROVAL,
            MatchedRule::ReviewRequired,
        ))
}

fn approved_service(ctx: &RuleContext<'_>) -> Option<Verdict> {
    // a review-required service the user holds an approval for counts as approved
    let individually_approved = ctx.service.is_review_required() && ctx.user_approved();
    (ctx.service.is_approved() || ctx.in_user_department() || individually_approved).then_some((
        DecisionStatus::Allow,
        REASON_APPROVED,
        MatchedRule::ApprovedService,
    ))
}

fn default_policy(ctx: &RuleContext<'_>) -> Verdict {
    match ctx.default_policy {
        DefaultPolicy::DefaultAllow => (
            DecisionStatus::Allow,
            REASON_DEFAULT_ALLOW,
            MatchedRule::DefaultAllow,
        ),
        DefaultPolicy::DefaultDeny => (
            DecisionStatus::Deny,
            REASON_DEFAULT_DENY,
            MatchedRule::DefaultDeny,
        ),
    }
}

/// Applies the ordered rule list
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn evaluate(
        &self,
        request: &DecisionRequest,
        service: &ServiceMatch,
        findings: &[Finding],
        snapshot: &RuleSnapshot,
    ) -> Evaluation {
        let ctx = RuleContext {
            request,
            service,
            findings,
            default_policy: snapshot.default_policy(),
            active_override: snapshot.active_override(service),
        };
        self.evaluate_context(&ctx)
    }

    pub fn evaluate_context(&self, ctx: &RuleContext<'_>) -> Evaluation {
        let (status, reason, matched_rule) = RULES
            .iter()
            .find_map(|(name, rule)| {
                let verdict = rule(ctx);
                if verdict.is_some() {
                    tracing::debug!(rule = *name, service = %ctx.service.service_id, "Rule matched");
                }
                verdict
            })
            .unwrap_or_else(|| default_policy(ctx));

        let override_applied = ctx.service.is_prohibited()
            && ctx.active_override.is_some()
            && matched_rule != MatchedRule::CriticalContent;

        Evaluation {
            status,
            reason: reason.to_string(),
            matched_rule,
            override_applied,
        }
    }
}
