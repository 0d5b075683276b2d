//! Decision service configuration

use aigov_decision::{DecisionEngine, FailureMode, PolicyConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionApiConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Audit log configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Initial rule snapshot
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl DecisionApiConfig {
    /// Parse configuration from HCL, or from JSON when the content starts
    /// with `{`.
    pub fn from_hcl(content: &str) -> anyhow::Result<Self> {
        if content.trim_start().starts_with('{') {
            return serde_json::from_str(content)
                .map_err(|e| anyhow::anyhow!("Failed to parse JSON config: {}", e));
        }
        hcl::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse HCL config: {}", e))
    }

    /// Render as HCL
    pub fn to_hcl(&self) -> anyhow::Result<String> {
        hcl::to_string(self).map_err(|e| anyhow::anyhow!("Failed to render HCL config: {}", e))
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Decisions retained in memory
    pub capacity: usize,

    /// Broadcast channel buffer size
    pub channel_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            channel_capacity: 1024,
        }
    }
}

/// Engine tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Content scans slower than this bias the decision toward REVIEW
    pub scan_budget_ms: Option<u64>,

    /// Answer with a fallback decision instead of 503 when no snapshot
    /// is available
    pub failure_mode: Option<FailureMode>,
}

impl EngineConfig {
    pub fn build_engine(&self) -> DecisionEngine {
        match self.scan_budget_ms {
            Some(ms) => DecisionEngine::new().with_scan_budget(Duration::from_millis(ms)),
            None => DecisionEngine::new(),
        }
    }
}
