//! alertwatch -- polling dashboard client for security-alert risk trends.
//!
//! This crate fetches alert records, summary statistics and recommendations
//! from an alert service, aggregates alerts into daily risk series, and
//! refreshes a dashboard on a fixed cadence.

pub mod alerts;
pub mod analysis;
pub mod client;
pub mod config;
pub mod refresh;
pub mod render;

use std::path::Path;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::client::file::SnapshotSource;
use crate::client::http::HttpAlertSource;
use crate::client::AlertSource;
use crate::config::{Config, LoggingConfig};
use crate::refresh::{Orchestrator, RefreshSettings};
use crate::render::ConsoleRenderer;

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured
/// level. Logs go to stderr; stdout carries the dashboard.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolve configuration under a temporary stderr subscriber.
///
/// The configured subscriber cannot exist before the config is read, so a
/// file that is found but skipped would otherwise fall back to defaults
/// silently. `RUST_LOG` applies here too; without it only warnings show.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::with_default(bootstrap, || Config::resolve(explicit))
}

/// Pick the data source: a snapshot file when given, the HTTP service otherwise.
pub fn open_source(config: &Config, input: Option<&Path>) -> Result<Box<dyn AlertSource>> {
    match input {
        Some(path) => {
            tracing::info!(path = %path.display(), "reading alerts from snapshot file");
            Ok(Box::new(SnapshotSource::new(path)))
        }
        None => {
            tracing::info!(base_url = %config.api.base_url, "polling alert service");
            Ok(Box::new(HttpAlertSource::from_config(&config.api)?))
        }
    }
}

/// Forward non-empty stdin lines as range tokens.
///
/// A plain thread rather than a runtime task: a blocking stdin read cannot be
/// cancelled and would otherwise hold up runtime shutdown.
fn spawn_range_input() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            let token = line.trim();
            if token.is_empty() {
                continue;
            }
            if tx.blocking_send(token.to_string()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run the dashboard until Ctrl-C.
pub async fn watch(config: &Config, settings: RefreshSettings, input: Option<&Path>) -> Result<()> {
    let source = open_source(config, input)?;
    let orchestrator = Orchestrator::new(source, ConsoleRenderer::stdout(), settings);

    let range_changes = spawn_range_input();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown requested");
    };

    orchestrator.run(range_changes, shutdown).await;
    Ok(())
}
