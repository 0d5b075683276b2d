//! Risk scoring

use crate::rules::Evaluation;
use crate::types::{Finding, MatchedRule, Severity};

pub const SCORE_PROHIBITED: u8 = 90;
pub const SCORE_CRITICAL: u8 = 95;
pub const SCORE_DEFAULT_DENY: u8 = 70;
pub const SCORE_REVIEW: u8 = 50;
pub const SCORE_APPROVED: u8 = 10;
pub const SCORE_DEFAULT_ALLOW: u8 = 20;

/// Points taken off the prohibited score when an override applies
pub const OVERRIDE_DISCOUNT: u8 = 10;
/// Lowest score an overridden prohibition can reach
pub const OVERRIDE_FLOOR: u8 = 10;

/// Per-finding increment and cap for each non-critical severity
const SEVERITY_WEIGHTS: &[(Severity, u32, u32)] = &[
    (Severity::High, 30, 40),
    (Severity::Medium, 15, 30),
    (Severity::Low, 5, 10),
];

/// Aggregates rule outcome and findings into a 0-100 score
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer;

impl RiskScorer {
    pub fn score(&self, evaluation: &Evaluation, findings: &[Finding]) -> u8 {
        let additive = content_risk(findings);

        if evaluation.override_applied {
            // what the request would have scored without the override
            let prohibited = (u32::from(SCORE_PROHIBITED) + additive).min(100);
            let discounted = prohibited.saturating_sub(u32::from(OVERRIDE_DISCOUNT));
            return clamp(discounted.max(u32::from(OVERRIDE_FLOOR)));
        }

        clamp(u32::from(base_score(evaluation.matched_rule)) + additive)
    }
}

/// Base score for the rule that fired
pub fn base_score(rule: MatchedRule) -> u8 {
    match rule {
        MatchedRule::ProhibitedService => SCORE_PROHIBITED,
        MatchedRule::CriticalContent => SCORE_CRITICAL,
        MatchedRule::DefaultDeny => SCORE_DEFAULT_DENY,
        MatchedRule::DepartmentTraining | MatchedRule::ReviewRequired => SCORE_REVIEW,
        MatchedRule::ApprovedService => SCORE_APPROVED,
        MatchedRule::DefaultAllow => SCORE_DEFAULT_ALLOW,
        MatchedRule::EngineUnavailable => 0,
    }
}

/// Additive content risk from non-critical findings
pub fn content_risk(findings: &[Finding]) -> u32 {
    SEVERITY_WEIGHTS
        .iter()
        .map(|(severity, step, cap)| {
            let count = findings.iter().filter(|f| f.severity == *severity).count() as u32;
            (count * step).min(*cap)
        })
        .sum()
}

fn clamp(score: u32) -> u8 {
    score.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecisionStatus, FindingCategory};

    fn finding(name: &str, severity: Severity) -> Finding {
        Finding {
            category: FindingCategory::Pii,
            name: name.to_string(),
            severity,
            match_count: 3,
        }
    }

    fn evaluation(rule: MatchedRule, override_applied: bool) -> Evaluation {
        Evaluation {
            status: DecisionStatus::Allow,
            reason: String::new(),
            matched_rule: rule,
            override_applied,
        }
    }

    #[test]
    fn test_base_scores() {
        let scorer = RiskScorer;
        assert_eq!(scorer.score(&evaluation(MatchedRule::ProhibitedService, false), &[]), 90);
        assert_eq!(scorer.score(&evaluation(MatchedRule::CriticalContent, false), &[]), 95);
        assert_eq!(scorer.score(&evaluation(MatchedRule::ReviewRequired, false), &[]), 50);
        assert_eq!(scorer.score(&evaluation(MatchedRule::ApprovedService, false), &[]), 10);
        assert_eq!(scorer.score(&evaluation(MatchedRule::DefaultAllow, false), &[]), 20);
        assert_eq!(scorer.score(&evaluation(MatchedRule::DefaultDeny, false), &[]), 70);
    }

    #[test]
    fn test_content_risk_caps() {
        let highs = vec![finding("a", Severity::High), finding("b", Severity::High)];
        assert_eq!(content_risk(&highs), 40);

        let mediums: Vec<_> = (0..3).map(|i| finding(&i.to_string(), Severity::Medium)).collect();
        assert_eq!(content_risk(&mediums), 30);

        let lows: Vec<_> = (0..3).map(|i| finding(&i.to_string(), Severity::Low)).collect();
        assert_eq!(content_risk(&lows), 10);

        // match_count does not multiply the increment
        assert_eq!(content_risk(&[finding("email", Severity::Medium)]), 15);
        assert_eq!(content_risk(&[finding("key", Severity::Critical)]), 0);
    }

    #[test]
    fn test_score_clamped() {
        let findings = vec![
            finding("a", Severity::High),
            finding("b", Severity::High),
            finding("c", Severity::Medium),
        ];
        assert_eq!(
            RiskScorer.score(&evaluation(MatchedRule::CriticalContent, false), &findings),
            100
        );
    }

    #[test]
    fn test_override_discount() {
        let scorer = RiskScorer;
        assert_eq!(scorer.score(&evaluation(MatchedRule::DefaultAllow, true), &[]), 80);

        let high = vec![finding("ssn", Severity::High)];
        assert_eq!(scorer.score(&evaluation(MatchedRule::DefaultAllow, true), &high), 90);

        let saturated = vec![
            finding("a", Severity::High),
            finding("b", Severity::High),
            finding("c", Severity::Medium),
        ];
        assert_eq!(scorer.score(&evaluation(MatchedRule::ApprovedService, true), &saturated), 90);
    }
}
