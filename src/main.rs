use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use alertwatch::analysis::{self, TimeRange, TrendChart};
use alertwatch::client::{AlertSource, FetchOutcome};
use alertwatch::config::Config;
use alertwatch::refresh::{Orchestrator, RefreshSettings, Renderer};
use alertwatch::render::ConsoleRenderer;

#[derive(Parser)]
#[command(
    name = "alertwatch",
    about = "Polling dashboard client for security-alert risk trends",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the dashboard on a timer; type a range (24h, 7d, 30d, 365d) and press Enter to switch
    Watch {
        /// Initial range (overrides config)
        #[arg(long)]
        range: Option<String>,

        /// Seconds between refreshes (overrides config)
        #[arg(long)]
        interval: Option<u64>,

        /// Read from a JSON snapshot file instead of the service
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Print the daily alert trend once
    Trend {
        /// Range token: 24h, 7d, 30d or 365d (anything else shows all records)
        #[arg(long)]
        range: Option<String>,

        /// Read alerts from a JSON file instead of the service
        #[arg(long)]
        input: Option<PathBuf>,

        /// Reference time for the range cutoff (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Refresh every widget once and exit
    Snapshot {
        /// Range token for the trend chart
        #[arg(long)]
        range: Option<String>,

        /// Read from a JSON snapshot file instead of the service
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

/// `trend --json` document: the chart plus how the fetch went, so "no alerts"
/// and "could not fetch alerts" stay distinguishable.
#[derive(Serialize)]
struct TrendReport<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(flatten)]
    chart: &'a TrendChart,
}

impl<'a> TrendReport<'a> {
    fn new<T>(chart: &'a TrendChart, outcome: &FetchOutcome<T>) -> Self {
        let status = match outcome {
            FetchOutcome::Data(_) => "ok",
            FetchOutcome::Empty => "empty",
            FetchOutcome::Failed(_) => "failed",
        };
        Self {
            status,
            error: outcome.error().map(|e| e.to_string()),
            chart,
        }
    }
}

fn settings_for(config: &Config, range: Option<&str>, interval: Option<u64>) -> Result<RefreshSettings> {
    let mut settings = RefreshSettings::from(&config.refresh);
    if let Some(token) = range {
        settings.initial_range = TimeRange::from_token(token);
    }
    if let Some(secs) = interval {
        anyhow::ensure!(secs > 0, "--interval must be greater than zero");
        settings.interval = Duration::from_secs(secs);
    }
    Ok(settings)
}

fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("--now is not an RFC 3339 timestamp: {}", raw))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = alertwatch::resolve_config(cli.config.as_deref())?;

    alertwatch::init_tracing(&config.logging);

    match cli.command {
        Commands::Watch {
            range,
            interval,
            input,
        } => {
            let settings = settings_for(&config, range.as_deref(), interval)?;
            tracing::info!(range = %settings.initial_range, interval_secs = settings.interval.as_secs(), "Starting alertwatch");
            alertwatch::watch(&config, settings, input.as_deref()).await?;
        }
        Commands::Trend {
            range,
            input,
            now,
            json,
        } => {
            let range = match range.as_deref() {
                Some(token) => TimeRange::from_token(token),
                None => config.refresh.initial_range(),
            };
            let now = parse_now(now.as_deref())?;
            let source = alertwatch::open_source(&config, input.as_deref())?;

            let alerts = source.alerts().await;
            let series = analysis::aggregate(alerts.items(), range, now);
            let chart = TrendChart::new(range, &series);

            if json {
                let report = TrendReport::new(&chart, &alerts);
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let mut renderer = ConsoleRenderer::stdout();
                renderer.draw_trend(&chart, alerts.error())?.dispose();
            }
        }
        Commands::Snapshot { range, input } => {
            let settings = settings_for(&config, range.as_deref(), None)?;
            let source = alertwatch::open_source(&config, input.as_deref())?;
            let mut orchestrator = Orchestrator::new(source, ConsoleRenderer::stdout(), settings);
            let report = orchestrator.refresh_all().await;
            tracing::debug!(?report, "snapshot complete");
        }
    }

    Ok(())
}
