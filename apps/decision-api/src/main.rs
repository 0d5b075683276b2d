//! aigov-decision-api - AI service governance decision service
//!
//! Serves the decision engine over HTTP and offers offline evaluation and
//! content scanning from the command line.

use aigov_decision::{DecisionRequest, DecisionService, NullSink, PatternDetector, SnapshotStore};
use aigov_decision_api::api::EvaluateResponse;
use aigov_decision_api::DecisionApiConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aigov-decision-api")]
#[command(version)]
#[command(about = "Decision and risk engine for AI service governance")]
struct Cli {
    /// Configuration file path (.hcl or .json)
    #[arg(short, long, env = "AIGOV_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Evaluate one JSON request and print the decision
    Evaluate {
        /// Request file
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Run the content detector over a file or stdin
    Scan {
        /// Input file (stdin if not specified)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print the redacted text instead of findings
        #[arg(long)]
        redact: bool,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let (config, _config_path) = aigov_decision_api::bootstrap::load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            aigov_decision_api::bootstrap::run_server(config, &host, port).await?;
        }
        Commands::Evaluate { request } => {
            evaluate_file(&config, &request)?;
        }
        Commands::Scan { file, redact } => {
            scan(&config, file.as_deref(), redact)?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "aigov_decision={lvl},aigov_decision_api={lvl},tower_http=debug",
            lvl = log_level
        )
        .into()
    });

    // stdout carries command output
    let (json_layer, text_layer) = if json {
        (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn evaluate_file(config: &DecisionApiConfig, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    let request: DecisionRequest =
        serde_json::from_str(&content).context("Failed to parse decision request")?;

    let store = SnapshotStore::new(config.policy.clone())
        .map_err(|e| anyhow::anyhow!("Invalid policy: {e}"))?;
    let service = DecisionService::new(
        Arc::new(store),
        config.engine.build_engine(),
        Arc::new(NullSink),
    );
    let record = match config.engine.failure_mode {
        Some(mode) => service.evaluate_or_fallback(&request, mode),
        None => service
            .evaluate(&request)
            .map_err(|e| anyhow::anyhow!("Evaluation failed: {e}"))?,
    };

    let json = serde_json::to_string_pretty(&EvaluateResponse::from(record))
        .context("Failed to serialize decision")?;
    println!("{}", json);
    Ok(())
}

fn scan(config: &DecisionApiConfig, file: Option<&Path>, redact: bool) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let detector = PatternDetector::new(&config.policy.detector)
        .map_err(|e| anyhow::anyhow!("Invalid detector config: {e}"))?;

    if redact {
        print!("{}", detector.redact(&text));
        return Ok(());
    }

    let output = serde_json::json!({
        "findings": detector.detect(&text),
        "matches": detector.scan(&text),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to serialize findings")?
    );
    Ok(())
}

fn show_config(config: Option<&DecisionApiConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_hcl()?);
    Ok(())
}
