//! Request and response types for the decision engine
//!
//! Field names follow the snake_case wire contract shared with the
//! browser, editor, and proxy integrations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attributes of the user making the request.
///
/// Supplied by the identity source; the engine treats them as opaque
/// inputs and does not validate their provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttributes {
    pub email: String,

    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub training_completed: bool,

    /// Services this user has been individually approved for (manager approval)
    #[serde(default)]
    pub approved_services: BTreeMap<String, bool>,
}

impl UserAttributes {
    /// Whether the user holds an approval that covers `target`.
    ///
    /// Uses the same containment test as service matching, so an approval
    /// for `midjourney.com` covers `https://www.midjourney.com/app`.
    pub fn has_approval_for(&self, service_id: &str, target: &str) -> bool {
        let service_id = service_id.to_lowercase();
        let target = target.to_lowercase();
        self.approved_services.iter().any(|(id, approved)| {
            if !*approved {
                return false;
            }
            let id = id.trim().to_lowercase();
            !id.is_empty() && (id == service_id || target.contains(&id))
        })
    }
}

/// The resource the user is trying to reach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type", default = "default_resource_type")]
    pub kind: String,

    /// URL or bare service identifier
    #[serde(default)]
    pub url: String,

    /// Optional service name supplied by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

fn default_resource_type() -> String {
    "ai_service".to_string()
}

impl Resource {
    /// The string the service matcher resolves: the URL when present,
    /// otherwise the service name.
    pub fn target(&self) -> &str {
        if !self.url.trim().is_empty() {
            &self.url
        } else {
            self.service.as_deref().unwrap_or("")
        }
    }
}

/// Where the request came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "browser_plugin".to_string()
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            source: default_source(),
        }
    }
}

/// A single evaluation request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub user: UserAttributes,

    #[serde(default = "default_action")]
    pub action: String,

    pub resource: Resource,

    /// Content the user is about to send (prompt, paste, file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default)]
    pub context: RequestContext,
}

fn default_action() -> String {
    "access_ai_service".to_string()
}

impl DecisionRequest {
    /// Build a request for `email` reaching `url` with no content.
    pub fn for_url(email: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            user: UserAttributes {
                email: email.into(),
                ..Default::default()
            },
            action: default_action(),
            resource: Resource {
                kind: default_resource_type(),
                url: url.into(),
                service: None,
            },
            content: None,
            context: RequestContext::default(),
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.user.department = Some(department.into());
        self
    }

    pub fn with_training(mut self, completed: bool) -> Self {
        self.user.training_completed = completed;
        self
    }

    pub fn with_approved_service(mut self, service_id: impl Into<String>) -> Self {
        self.user.approved_services.insert(service_id.into(), true);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.context.source = source.into();
        self
    }
}

/// Category of sensitive data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Pii,
    Secret,
    Proprietary,
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pii => write!(f, "pii"),
            Self::Secret => write!(f, "secret"),
            Self::Proprietary => write!(f, "proprietary"),
        }
    }
}

/// Severity of a finding. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A sensitive-content detection produced by the pattern detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: FindingCategory,
    /// Name of the pattern definition that matched (e.g. `credit_card`)
    pub name: String,
    pub severity: Severity,
    pub match_count: usize,
}

/// Final classification of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionStatus {
    Allow,
    Deny,
    Review,
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Deny => write!(f, "DENY"),
            Self::Review => write!(f, "REVIEW"),
        }
    }
}

/// Identifier of the rule that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedRule {
    ProhibitedService,
    CriticalContent,
    DepartmentTraining,
    ReviewRequired,
    ApprovedService,
    DefaultAllow,
    DefaultDeny,
    /// Produced by a caller-side fallback, never by the rule evaluator
    EngineUnavailable,
}

impl MatchedRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProhibitedService => "prohibited_service",
            Self::CriticalContent => "critical_content",
            Self::DepartmentTraining => "department_training",
            Self::ReviewRequired => "review_required",
            Self::ApprovedService => "approved_service",
            Self::DefaultAllow => "default_allow",
            Self::DefaultDeny => "default_deny",
            Self::EngineUnavailable => "engine_unavailable",
        }
    }
}

impl std::fmt::Display for MatchedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's answer for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(rename = "decision")]
    pub status: DecisionStatus,
    pub reason: String,
    pub risk_score: u8,
    pub evidence: Vec<Finding>,
    pub matched_rule: MatchedRule,
    #[serde(default)]
    pub recommendations: Vec<String>,
}
