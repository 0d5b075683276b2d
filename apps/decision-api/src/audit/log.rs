//! In-memory decision log with bounded capacity

use aigov_decision::{DecisionRecord, DecisionStatus};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Filter for listing decisions. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct DecisionFilter {
    pub user: Option<String>,
    pub status: Option<DecisionStatus>,
    pub service: Option<String>,
}

impl DecisionFilter {
    fn matches(&self, record: &DecisionRecord) -> bool {
        self.user
            .as_ref()
            .map_or(true, |u| record.user_email.eq_ignore_ascii_case(u))
            && self.status.map_or(true, |s| record.decision.status == s)
            && self
                .service
                .as_ref()
                .map_or(true, |s| record.service_id.contains(&s.to_lowercase()))
    }
}

/// Aggregate counts over the buffered decisions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecisionSummary {
    pub total_recorded: u64,
    pub buffered: usize,
    pub allowed: usize,
    pub denied: usize,
    pub review: usize,
    pub average_risk_score: f64,
    pub unique_users: usize,
}

/// Request volume for one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceUsage {
    pub service_id: String,
    pub requests: usize,
    pub denied: usize,
}

/// Bounded buffer of recent decisions
#[derive(Debug)]
pub struct DecisionLog {
    records: VecDeque<DecisionRecord>,
    capacity: usize,
    total_count: u64,
}

impl DecisionLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            total_count: 0,
        }
    }

    /// Append a record, evicting the oldest when full
    pub fn record(&mut self, record: DecisionRecord) {
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
        self.total_count += 1;
    }

    /// Recent records (newest first)
    pub fn recent(&self, limit: usize) -> Vec<&DecisionRecord> {
        self.records.iter().rev().take(limit).collect()
    }

    /// Records matching `filter` (newest first)
    pub fn query(&self, filter: &DecisionFilter) -> Vec<&DecisionRecord> {
        self.records.iter().rev().filter(|r| filter.matches(r)).collect()
    }

    pub fn get(&self, id: &Uuid) -> Option<&DecisionRecord> {
        self.records.iter().find(|r| &r.decision_id == id)
    }

    pub fn summary(&self) -> DecisionSummary {
        let mut summary = DecisionSummary {
            total_recorded: self.total_count,
            buffered: self.records.len(),
            ..Default::default()
        };
        let mut users = HashSet::new();
        let mut score_sum = 0u64;
        for r in &self.records {
            match r.decision.status {
                DecisionStatus::Allow => summary.allowed += 1,
                DecisionStatus::Deny => summary.denied += 1,
                DecisionStatus::Review => summary.review += 1,
            }
            score_sum += u64::from(r.decision.risk_score);
            users.insert(r.user_email.to_lowercase());
        }
        if !self.records.is_empty() {
            summary.average_risk_score = score_sum as f64 / self.records.len() as f64;
        }
        summary.unique_users = users.len();
        summary
    }

    /// Services ordered by request count, ties broken by name
    pub fn top_services(&self, limit: usize) -> Vec<ServiceUsage> {
        let mut usage: HashMap<&str, ServiceUsage> = HashMap::new();
        for r in &self.records {
            let entry = usage.entry(r.service_id.as_str()).or_insert_with(|| ServiceUsage {
                service_id: r.service_id.clone(),
                requests: 0,
                denied: 0,
            });
            entry.requests += 1;
            if r.decision.status == DecisionStatus::Deny {
                entry.denied += 1;
            }
        }
        let mut usage: Vec<_> = usage.into_values().collect();
        usage.sort_by(|a, b| {
            b.requests
                .cmp(&a.requests)
                .then_with(|| a.service_id.cmp(&b.service_id))
        });
        usage.truncate(limit);
        usage
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}
