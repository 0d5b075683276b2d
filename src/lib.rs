//! # aigov-decision
//!
//! Decision and risk evaluation core for governing access to external AI
//! services.
//!
//! ## Overview
//!
//! Given who is asking, which AI service they are reaching, and what content
//! they are about to send, the engine returns `ALLOW`, `DENY` or `REVIEW`
//! together with a reason, the evidence that drove it, and a 0-100 risk
//! score. Rules come from an immutable, versioned [`RuleSnapshot`] that can
//! be swapped while evaluations are in flight.
//!
//! ## Quick Start
//!
//! ```rust
//! use aigov_decision::{DecisionEngine, DecisionRequest, DecisionStatus, PolicyConfig, SnapshotStore};
//!
//! # fn example() -> aigov_decision::Result<()> {
//! let store = SnapshotStore::new(PolicyConfig::default())?;
//! let engine = DecisionEngine::new();
//!
//! let request = DecisionRequest::for_url("dev@corp.io", "https://character.ai");
//! let decision = engine.evaluate(&request, &*store.current()?);
//!
//! assert_eq!(decision.status, DecisionStatus::Deny);
//! assert_eq!(decision.reason, "service prohibited");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **PatternDetector** scans content for PII, secrets and confidentiality markers
//! - **ServiceMatcher** resolves a URL to its service-set memberships
//! - **RuleEvaluator** applies the precedence-ordered rule list
//! - **RiskScorer** turns the outcome and findings into a score
//! - **DecisionEngine** assembles the decision and enforces score invariants
//! - **SnapshotStore** publishes rule snapshots atomically

pub mod audit;
pub mod detector;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod rules;
pub mod scoring;
pub mod service;
pub mod snapshot;
pub mod types;

pub use audit::{DecisionRecord, DecisionService, DecisionSink, NullSink};
pub use detector::{DetectedMatch, DetectorConfig, PatternDefinition, PatternDetector, Validator};
pub use engine::{DecisionEngine, Outcome, ALLOW_SCORE_CEILING, DENY_SCORE_FLOOR};
pub use error::{DecisionError, Result};
pub use fallback::{fallback_decision, FailureMode};
pub use rules::{Evaluation, RuleEvaluator};
pub use scoring::RiskScorer;
pub use service::{match_service, Membership, ServiceMatch, ServiceMatcher};
pub use snapshot::{
    DefaultPolicy, Override, PolicyConfig, RuleSnapshot, ServiceRole, ServiceSet, SnapshotStore,
};
pub use types::{
    Decision, DecisionRequest, DecisionStatus, Finding, FindingCategory, MatchedRule,
    RequestContext, Resource, Severity, UserAttributes,
};
