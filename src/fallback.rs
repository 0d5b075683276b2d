//! Caller-side policy for when the engine cannot produce a decision

use crate::types::{Decision, DecisionStatus, MatchedRule};
use serde::{Deserialize, Serialize};

pub const REASON_FAIL_OPEN: &str = "decision engine unavailable, allowed by fail-open policy";
pub const REASON_FAIL_CLOSED: &str = "decision engine unavailable, denied by fail-closed policy";

/// What a caller does when no decision can be obtained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    FailOpen,
    #[default]
    FailClosed,
}

impl std::fmt::Display for FailureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailOpen => write!(f, "fail_open"),
            Self::FailClosed => write!(f, "fail_closed"),
        }
    }
}

/// Build the decision a caller returns when evaluation failed with `cause`
pub fn fallback_decision(mode: FailureMode, cause: &str) -> Decision {
    tracing::warn!(mode = %mode, cause = %cause, "Decision engine unavailable, applying fallback");
    let (status, reason, risk_score) = match mode {
        FailureMode::FailOpen => (DecisionStatus::Allow, REASON_FAIL_OPEN, 0),
        FailureMode::FailClosed => (DecisionStatus::Deny, REASON_FAIL_CLOSED, 100),
    };
    Decision {
        status,
        reason: reason.to_string(),
        risk_score,
        evidence: Vec::new(),
        matched_rule: MatchedRule::EngineUnavailable,
        recommendations: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_open() {
        let d = fallback_decision(FailureMode::FailOpen, "timeout");
        assert_eq!(d.status, DecisionStatus::Allow);
        assert_eq!(d.risk_score, 0);
        assert_eq!(d.matched_rule, MatchedRule::EngineUnavailable);
        assert_eq!(d.reason, REASON_FAIL_OPEN);
    }

    #[test]
    fn test_fail_closed() {
        let d = fallback_decision(FailureMode::FailClosed, "not configured");
        assert_eq!(d.status, DecisionStatus::Deny);
        assert_eq!(d.risk_score, 100);
        assert_eq!(d.reason, REASON_FAIL_CLOSED);
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(FailureMode::default(), FailureMode::FailClosed);
        let mode: FailureMode = serde_json::from_str("\"fail_open\"").unwrap();
        assert_eq!(mode, FailureMode::FailOpen);
    }
}
