//! Plain-text dashboard for terminals.

use std::io::Write;

use anyhow::Result;
use tracing::debug;

use crate::alerts::{AlertRecord, Recommendation, SummaryStats};
use crate::analysis::TrendChart;
use crate::client::{FetchError, FetchOutcome};
use crate::refresh::{ChartHandle, Renderer};

const PLACEHOLDER: &str = "—";

/// Writes each widget as a text block to `out`.
pub struct ConsoleRenderer<W: Write + Send> {
    out: W,
    frames: u64,
}

impl ConsoleRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, frames: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Trend charts drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Handle for a chart printed to the console. Nothing to free; disposal is
/// only traced.
struct ConsoleChart {
    frame: u64,
}

impl ChartHandle for ConsoleChart {
    fn dispose(self: Box<Self>) {
        debug!(frame = self.frame, "disposed console chart");
    }
}

fn or_placeholder(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => PLACEHOLDER,
    }
}

fn alert_time(record: &AlertRecord) -> String {
    match record.occurred_at() {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

impl<W: Write + Send> Renderer for ConsoleRenderer<W> {
    fn render_stats(&mut self, outcome: &FetchOutcome<SummaryStats>) -> Result<()> {
        writeln!(self.out, "\n=== Summary ===")?;
        match outcome {
            FetchOutcome::Data(stats) => {
                let users = stats
                    .unique_users
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string());
                writeln!(self.out, "{:<16} {}", "Total alerts:", stats.total_alerts)?;
                writeln!(self.out, "{:<16} {}", "Critical alerts:", stats.critical_alerts)?;
                writeln!(self.out, "{:<16} {}", "Unique users:", users)?;
                writeln!(
                    self.out,
                    "{:<16} {:.2} ({})",
                    "Average risk:",
                    stats.avg_risk_score,
                    stats.risk_level()
                )?;
            }
            FetchOutcome::Empty => writeln!(self.out, "No statistics available")?,
            FetchOutcome::Failed(e) => writeln!(self.out, "Unable to fetch statistics ({})", e)?,
        }
        Ok(())
    }

    fn render_alerts(
        &mut self,
        outcome: &FetchOutcome<Vec<AlertRecord>>,
        limit: usize,
    ) -> Result<()> {
        writeln!(self.out, "\n=== Recent Alerts ===")?;
        let alerts = match outcome {
            FetchOutcome::Data(alerts) => alerts,
            FetchOutcome::Empty => {
                writeln!(self.out, "No recent alerts")?;
                return Ok(());
            }
            FetchOutcome::Failed(e) => {
                writeln!(self.out, "Unable to fetch alerts ({})", e)?;
                return Ok(());
            }
        };

        writeln!(
            self.out,
            "{:<24} | {:<8} | {:<20} | {:<15} | Time",
            "User", "Priority", "Action", "Source IP"
        )?;
        writeln!(self.out, "{:-<24}-|-{:-<8}-|-{:-<20}-|-{:-<15}-|-{:-<19}", "", "", "", "", "")?;
        for alert in alerts.iter().take(limit) {
            writeln!(
                self.out,
                "{:<24} | {:<8} | {:<20} | {:<15} | {}",
                or_placeholder(alert.user.as_deref()),
                alert.priority(),
                or_placeholder(alert.action.as_deref()),
                or_placeholder(alert.src_ip.as_deref()),
                alert_time(alert)
            )?;
        }
        if alerts.len() > limit {
            writeln!(self.out, "... {} more", alerts.len() - limit)?;
        }
        Ok(())
    }

    fn render_recommendations(
        &mut self,
        outcome: &FetchOutcome<Vec<Recommendation>>,
    ) -> Result<()> {
        writeln!(self.out, "\n=== Recommendations ===")?;
        match outcome {
            FetchOutcome::Data(items) => {
                for item in items {
                    writeln!(
                        self.out,
                        " - {}: {}",
                        or_placeholder(Some(item.user.as_str())),
                        item.recommendation
                    )?;
                }
            }
            FetchOutcome::Empty => writeln!(self.out, "No recommendations")?,
            FetchOutcome::Failed(e) => {
                writeln!(self.out, "Unable to fetch recommendations ({})", e)?
            }
        }
        Ok(())
    }

    fn draw_trend(
        &mut self,
        chart: &TrendChart,
        failure: Option<&FetchError>,
    ) -> Result<Box<dyn ChartHandle>> {
        self.frames += 1;
        writeln!(self.out, "\n=== {} ===", chart.title)?;

        if let Some(e) = failure {
            writeln!(self.out, "Unable to fetch alerts ({})", e)?;
        } else if chart.is_empty() {
            writeln!(self.out, "No alerts in this range")?;
        } else {
            writeln!(self.out, "{:<10} | {:>6} | Avg Risk", "Date", "Count")?;
            writeln!(self.out, "{:-<10}-|-{:->6}-|-{:-<8}", "", "", "")?;
            for ((label, count), risk) in chart
                .labels
                .iter()
                .zip(&chart.counts)
                .zip(&chart.avg_risk)
            {
                writeln!(self.out, "{:<10} | {:>6} | {:.2}", label, count, risk)?;
            }
        }
        self.out.flush()?;

        Ok(Box::new(ConsoleChart { frame: self.frames }))
    }
}
