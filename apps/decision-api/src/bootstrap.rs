//! Service bootstrap: config loading, state wiring, and the server loop.

use crate::{
    api::{build_app, AppState},
    audit::{AuditEventBus, AuditState, DecisionLog},
    config::DecisionApiConfig,
};
use aigov_decision::{DecisionService, SnapshotStore};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

// ── Config loading ──────────────────────────────────────────────────

const LOCAL_CONFIG: &str = "aigov.hcl";

fn read_config(path: &Path) -> Result<DecisionApiConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    tracing::info!("Loading config from {}", path.display());
    DecisionApiConfig::from_hcl(&content)
        .with_context(|| format!("Config parse error in {}", path.display()))
}

/// Load configuration using the standard priority chain.
///
/// Priority: explicit path > `./aigov.hcl` > `<config_dir>/aigov/config.hcl`
///           > default.
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<(DecisionApiConfig, Option<PathBuf>)> {
    if let Some(path) = explicit_path {
        return Ok((read_config(path)?, Some(path.clone())));
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok((read_config(&local)?, Some(local)));
    }

    if let Some(config_dir) = dirs_next::config_dir() {
        let hcl_path = config_dir.join("aigov/config.hcl");
        if hcl_path.exists() {
            return Ok((read_config(&hcl_path)?, Some(hcl_path)));
        }
    }

    tracing::info!("No config found, using defaults");
    Ok((DecisionApiConfig::default(), None))
}

// ── State wiring ────────────────────────────────────────────────────

/// Everything a running service holds on to
pub struct ServiceHandle {
    pub app_state: AppState,
    pub audit_state: AuditState,
    pub bus: Arc<AuditEventBus>,
}

/// Compile the initial snapshot and wire the decision service to the
/// audit bus.
pub fn build_state(config: &DecisionApiConfig) -> Result<ServiceHandle> {
    let store = SnapshotStore::new(config.policy.clone())
        .map_err(|e| anyhow::anyhow!("Invalid policy: {e}"))?;
    tracing::info!(
        version = store.version(),
        service_sets = config.policy.service_sets.len(),
        overrides = config.policy.overrides.len(),
        "Initial rule snapshot published"
    );

    let log = Arc::new(RwLock::new(DecisionLog::new(config.audit.capacity)));
    let bus = Arc::new(AuditEventBus::new(config.audit.channel_capacity, log.clone()));
    let service = DecisionService::new(Arc::new(store), config.engine.build_engine(), bus.clone());

    Ok(ServiceHandle {
        app_state: AppState {
            service,
            failure_mode: config.engine.failure_mode,
        },
        audit_state: AuditState { log },
        bus,
    })
}

// ── Server runner ───────────────────────────────────────────────────

/// Bind and serve until Ctrl-C.
pub async fn run_server(config: DecisionApiConfig, host: &str, port: u16) -> Result<()> {
    let handle = build_state(&config)?;
    let violation_logger = handle.bus.spawn_violation_logger();
    let app = build_app(handle.app_state, handle.audit_state, &config.server.cors_origins);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Decision API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    violation_logger.abort();
    tracing::info!("Decision API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
