//! Resolve URLs and service identifiers to configured service sets

use crate::snapshot::{RuleSnapshot, ServiceRole, ServiceSet};
use serde::Serialize;

/// Membership of a matched service in one service set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    /// Name of the service set
    pub set: String,
    pub role: ServiceRole,
    /// The identifier from the set that matched
    pub identifier: String,
}

/// Result of resolving a request target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMatch {
    /// Lower-cased, trimmed input
    pub target: String,
    /// Bare hostname, empty if none could be extracted
    pub domain: String,
    /// Most specific matched identifier, or the domain when unmatched
    pub service_id: String,
    pub memberships: Vec<Membership>,
}

impl ServiceMatch {
    fn has_role(&self, pred: impl Fn(&ServiceRole) -> bool) -> bool {
        self.memberships.iter().any(|m| pred(&m.role))
    }

    pub fn is_prohibited(&self) -> bool {
        self.has_role(|r| *r == ServiceRole::Prohibited)
    }

    pub fn is_approved(&self) -> bool {
        self.has_role(|r| *r == ServiceRole::Approved)
    }

    pub fn is_review_required(&self) -> bool {
        self.has_role(|r| *r == ServiceRole::ReviewRequired)
    }

    /// Member of the `department:<department>` set
    pub fn in_department(&self, department: Option<&str>) -> bool {
        match department {
            Some(dept) if !dept.trim().is_empty() => self.has_role(|r| r.is_department(dept)),
            _ => false,
        }
    }

    /// Whether any set knows this service
    pub fn is_known(&self) -> bool {
        !self.memberships.is_empty()
    }
}

#[derive(Debug, Clone)]
struct CompiledSet {
    name: String,
    role: ServiceRole,
    identifiers: Vec<String>,
}

/// Matches targets against the service sets of one snapshot
#[derive(Debug, Clone)]
pub struct ServiceMatcher {
    sets: Vec<CompiledSet>,
}

impl ServiceMatcher {
    pub fn new(sets: &[ServiceSet]) -> Self {
        let sets = sets
            .iter()
            .map(|set| CompiledSet {
                name: set.name.clone(),
                role: set.role.clone(),
                identifiers: set
                    .services
                    .iter()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
            })
            .collect();
        Self { sets }
    }

    /// Resolve `target` (URL or bare identifier).
    ///
    /// Targets with no extractable hostname resolve to an unknown service
    /// with no memberships.
    pub fn match_service(&self, target: &str) -> ServiceMatch {
        let normalized = target.trim().to_lowercase();
        let Some(domain) = parse_host(&normalized) else {
            return ServiceMatch {
                service_id: normalized.clone(),
                target: normalized,
                domain: String::new(),
                memberships: Vec::new(),
            };
        };

        let mut memberships = Vec::new();
        for set in &self.sets {
            // longest identifier wins within a set
            let best = set
                .identifiers
                .iter()
                .filter(|id| normalized.contains(id.as_str()))
                .max_by_key(|id| id.len());
            if let Some(identifier) = best {
                memberships.push(Membership {
                    set: set.name.clone(),
                    role: set.role.clone(),
                    identifier: identifier.clone(),
                });
            }
        }

        let service_id = memberships
            .iter()
            .map(|m| &m.identifier)
            .max_by_key(|id| id.len())
            .cloned()
            .unwrap_or_else(|| domain.clone());

        ServiceMatch {
            target: normalized,
            domain,
            service_id,
            memberships,
        }
    }
}

/// Resolve `target` against the service sets of `snapshot`
pub fn match_service(target: &str, snapshot: &RuleSnapshot) -> ServiceMatch {
    snapshot.matcher().match_service(target)
}

/// Extract a bare, lower-cased hostname from a URL-shaped string.
///
/// Accepts `https://host:port/path`, `host/path`, and `user@host`.
pub fn parse_host(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };

    // strip path, query, fragment
    let host_port = rest.split(['/', '?', '#']).next().unwrap_or(rest);

    let host_port = match host_port.rfind('@') {
        Some(idx) => &host_port[idx + 1..],
        None => host_port,
    };

    let host = match host_port.rfind(':') {
        Some(idx) if host_port[idx + 1..].parse::<u16>().is_ok() => &host_port[..idx],
        _ => host_port,
    };

    let host = host.to_lowercase();
    let valid = !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_');
    valid.then_some(host)
}
