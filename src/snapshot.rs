//! Versioned rule snapshots and the store that publishes them
//!
//! A [`RuleSnapshot`] is compiled once from a [`PolicyConfig`] and never
//! mutated afterwards. The [`SnapshotStore`] hands out `Arc` clones of the
//! current snapshot and replaces it wholesale on every update.

use crate::detector::{DetectorConfig, PatternDetector};
use crate::error::{DecisionError, Result};
use crate::service::{ServiceMatch, ServiceMatcher};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::{Arc, Mutex, RwLock};

/// Role of a service set in rule evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceRole {
    Prohibited,
    Approved,
    ReviewRequired,
    /// Services sanctioned for one department, gated on training
    Department(String),
}

impl ServiceRole {
    /// Parse `prohibited`, `approved`, `review_required` or `department:<name>`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "prohibited" => return Ok(Self::Prohibited),
            "approved" => return Ok(Self::Approved),
            "review_required" => return Ok(Self::ReviewRequired),
            _ => {}
        }
        if let Some((prefix, name)) = s.split_once(':') {
            let name = name.trim();
            if prefix.trim().eq_ignore_ascii_case("department") && !name.is_empty() {
                return Ok(Self::Department(name.to_lowercase()));
            }
        }
        Err(DecisionError::InvalidServiceRole(s.to_string()))
    }

    /// Whether this is the department role for `department`
    pub fn is_department(&self, department: &str) -> bool {
        matches!(self, Self::Department(name) if name.eq_ignore_ascii_case(department.trim()))
    }
}

impl std::fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prohibited => write!(f, "prohibited"),
            Self::Approved => write!(f, "approved"),
            Self::ReviewRequired => write!(f, "review_required"),
            Self::Department(name) => write!(f, "department:{}", name),
        }
    }
}

impl Serialize for ServiceRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A named, ordered collection of service identifiers sharing one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSet {
    pub name: String,
    pub role: ServiceRole,
    #[serde(default)]
    pub services: Vec<String>,
}

impl ServiceSet {
    pub fn new(name: impl Into<String>, role: ServiceRole, services: &[&str]) -> Self {
        Self {
            name: name.into(),
            role,
            services: services.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Administrator exception that neutralizes a `prohibited` match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub service_id: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Override {
    pub fn new(
        service_id: impl Into<String>,
        reason: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            reason: reason.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            active: true,
        }
    }

    /// Whether this override is active and covers the matched service.
    ///
    /// The override must name the prohibited identifier that matched, or the
    /// request host (or a parent domain of it). Mentions elsewhere in the
    /// target do not count.
    pub fn covers(&self, service: &ServiceMatch) -> bool {
        if !self.active {
            return false;
        }
        let id = self.service_id.trim().to_lowercase();
        if id.is_empty() {
            return false;
        }
        let names_prohibited = service
            .memberships
            .iter()
            .any(|m| m.role == ServiceRole::Prohibited && m.identifier == id);
        names_prohibited
            || service.domain == id
            || service.domain.ends_with(&format!(".{}", id))
    }
}

/// What happens when no rule matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    #[default]
    DefaultAllow,
    DefaultDeny,
}

impl std::fmt::Display for DefaultPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DefaultAllow => write!(f, "default_allow"),
            Self::DefaultDeny => write!(f, "default_deny"),
        }
    }
}

/// Serializable source of a rule snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub default_policy: DefaultPolicy,
    pub service_sets: Vec<ServiceSet>,
    pub overrides: Vec<Override>,
    pub detector: DetectorConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_policy: DefaultPolicy::DefaultAllow,
            service_sets: default_service_sets(),
            overrides: Vec::new(),
            detector: DetectorConfig::default(),
        }
    }
}

impl PolicyConfig {
    /// Policy with no service sets and no overrides
    pub fn empty(default_policy: DefaultPolicy) -> Self {
        Self {
            default_policy,
            service_sets: Vec::new(),
            overrides: Vec::new(),
            detector: DetectorConfig::default(),
        }
    }

    pub fn with_service_set(mut self, set: ServiceSet) -> Self {
        self.service_sets.push(set);
        self
    }

    pub fn with_override(mut self, ov: Override) -> Self {
        self.overrides.push(ov);
        self
    }

    /// Replace the set with the same name, or append it
    pub fn upsert_service_set(&mut self, set: ServiceSet) {
        match self.service_sets.iter_mut().find(|s| s.name == set.name) {
            Some(existing) => *existing = set,
            None => self.service_sets.push(set),
        }
    }

    /// Mark every active override for `service_id` inactive.
    ///
    /// Returns `true` if anything changed.
    pub fn revoke_override(&mut self, service_id: &str) -> bool {
        let id = service_id.trim().to_lowercase();
        let mut revoked = false;
        for ov in self
            .overrides
            .iter_mut()
            .filter(|o| o.active && o.service_id.trim().to_lowercase() == id)
        {
            ov.active = false;
            revoked = true;
        }
        revoked
    }

    fn validate(&self) -> Result<()> {
        for set in &self.service_sets {
            if set.name.trim().is_empty() {
                return Err(DecisionError::Config(
                    "service set name must not be empty".to_string(),
                ));
            }
        }
        for ov in &self.overrides {
            if ov.service_id.trim().is_empty() {
                return Err(DecisionError::Config(
                    "override service_id must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Built-in service sets
pub fn default_service_sets() -> Vec<ServiceSet> {
    vec![
        ServiceSet::new(
            "prohibited",
            ServiceRole::Prohibited,
            &["character.ai", "janitorai.com", "crushon.ai", "chatgpt-unlocked.com"],
        ),
        ServiceSet::new(
            "approved",
            ServiceRole::Approved,
            &[
                "chatgpt.com",
                "chat.openai.com",
                "claude.ai",
                "gemini.google.com",
                "copilot.microsoft.com",
            ],
        ),
        ServiceSet::new(
            "review_required",
            ServiceRole::ReviewRequired,
            &["midjourney.com", "perplexity.ai", "huggingface.co", "poe.com"],
        ),
        ServiceSet::new(
            "engineering",
            ServiceRole::Department("engineering".to_string()),
            &["github.com/copilot", "cursor.com", "codeium.com"],
        ),
        ServiceSet::new(
            "marketing",
            ServiceRole::Department("marketing".to_string()),
            &["jasper.ai", "copy.ai"],
        ),
    ]
}

/// Immutable, compiled rule configuration
#[derive(Debug)]
pub struct RuleSnapshot {
    version: u64,
    published_at: DateTime<Utc>,
    config: PolicyConfig,
    matcher: ServiceMatcher,
    detector: PatternDetector,
}

impl RuleSnapshot {
    /// Validate and compile `config` into a snapshot with the given version
    pub fn compile(config: PolicyConfig, version: u64) -> Result<Self> {
        config.validate()?;
        let matcher = ServiceMatcher::new(&config.service_sets);
        let detector = PatternDetector::new(&config.detector)?;
        Ok(Self {
            version,
            published_at: Utc::now(),
            config,
            matcher,
            detector,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn default_policy(&self) -> DefaultPolicy {
        self.config.default_policy
    }

    pub fn matcher(&self) -> &ServiceMatcher {
        &self.matcher
    }

    pub fn detector(&self) -> &PatternDetector {
        &self.detector
    }

    pub fn overrides(&self) -> &[Override] {
        &self.config.overrides
    }

    /// The first active override covering `service`, if any
    pub fn active_override(&self, service: &ServiceMatch) -> Option<&Override> {
        self.config.overrides.iter().find(|o| o.covers(service))
    }
}

/// Holder of the current snapshot.
///
/// Readers take an `Arc` clone and keep evaluating against it even if a
/// newer snapshot is published meanwhile. Writers are serialized so
/// read-modify-write updates never lose each other's changes.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<RuleSnapshot>>>,
    writer: Mutex<()>,
}

impl SnapshotStore {
    /// A store with nothing published; evaluation fails with `NotConfigured`
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// A store with `config` published as version 1
    pub fn new(config: PolicyConfig) -> Result<Self> {
        let store = Self::unconfigured();
        store.publish(config)?;
        Ok(store)
    }

    /// The current snapshot
    pub fn current(&self) -> Result<Arc<RuleSnapshot>> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or(DecisionError::NotConfigured)
    }

    pub fn is_configured(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Version of the current snapshot, 0 when unconfigured
    pub fn version(&self) -> u64 {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.version())
            .unwrap_or(0)
    }

    /// Compile `config` and make it current. Returns the new version.
    pub fn publish(&self, config: PolicyConfig) -> Result<u64> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.swap(config)
    }

    /// Build a new snapshot from a modified copy of the current config
    pub fn update<F>(&self, f: F) -> Result<u64>
    where
        F: FnOnce(&mut PolicyConfig) -> Result<()>,
    {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = self.current()?.config().clone();
        f(&mut config)?;
        self.swap(config)
    }

    pub fn add_override(&self, ov: Override) -> Result<u64> {
        tracing::info!(
            service = %ov.service_id,
            created_by = %ov.created_by,
            "Adding override"
        );
        self.update(|config| {
            config.overrides.push(ov);
            Ok(())
        })
    }

    /// Deactivate overrides for `service_id`.
    ///
    /// Publishes a new snapshot only when something was revoked.
    pub fn revoke_override(&self, service_id: &str) -> Result<bool> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut config = self.current()?.config().clone();
        if !config.revoke_override(service_id) {
            return Ok(false);
        }
        self.swap(config)?;
        tracing::info!(service = %service_id, "Override revoked");
        Ok(true)
    }

    pub fn replace_service_set(&self, set: ServiceSet) -> Result<u64> {
        self.update(|config| {
            config.upsert_service_set(set);
            Ok(())
        })
    }

    // Caller must hold the writer lock.
    fn swap(&self, config: PolicyConfig) -> Result<u64> {
        let version = self.version() + 1;
        let snapshot = Arc::new(RuleSnapshot::compile(config, version)?);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
        tracing::info!(version, "Published rule snapshot");
        Ok(version)
    }
}
