use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{ChartHandle, Clock, Renderer, SystemClock};
use crate::alerts::AlertRecord;
use crate::analysis::{self, TimeRange, TrendChart};
use crate::client::{AlertSource, FetchOutcome};
use crate::config::RefreshConfig;

/// What happened to one widget during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetStatus {
    Rendered,
    /// Rendered, but the service had nothing to show.
    NoData,
    /// Rendered as unavailable because the fetch failed.
    FetchFailed,
    /// The renderer itself returned an error.
    RenderFailed,
}

impl WidgetStatus {
    fn after_render<T>(outcome: &FetchOutcome<T>, rendered: anyhow::Result<()>, widget: &str) -> Self {
        match rendered {
            Err(e) => {
                warn!(%widget, error = %e, "widget render failed");
                WidgetStatus::RenderFailed
            }
            Ok(()) => match outcome {
                FetchOutcome::Data(_) => WidgetStatus::Rendered,
                FetchOutcome::Empty => WidgetStatus::NoData,
                FetchOutcome::Failed(_) => WidgetStatus::FetchFailed,
            },
        }
    }
}

/// Per-widget results of one full refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub stats: WidgetStatus,
    pub alerts: WidgetStatus,
    pub recommendations: WidgetStatus,
    pub trend: WidgetStatus,
}

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub initial_range: TimeRange,
    pub alert_list_limit: usize,
}

impl From<&RefreshConfig> for RefreshSettings {
    fn from(cfg: &RefreshConfig) -> Self {
        Self {
            interval: Duration::from_secs(cfg.interval_secs),
            initial_range: cfg.initial_range(),
            alert_list_limit: cfg.alert_list_limit,
        }
    }
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self::from(&RefreshConfig::default())
    }
}

/// Drives every dashboard widget from one data source into one renderer.
///
/// Owns the currently displayed chart: each redraw disposes the previous
/// handle before the new one is drawn, so at most one is ever live.
pub struct Orchestrator<S, R> {
    source: S,
    renderer: R,
    clock: Box<dyn Clock>,
    settings: RefreshSettings,
    range: TimeRange,
    chart: Option<Box<dyn ChartHandle>>,
    cycles: u64,
}

impl<S: AlertSource, R: Renderer> Orchestrator<S, R> {
    pub fn new(source: S, renderer: R, settings: RefreshSettings) -> Self {
        Self {
            source,
            renderer,
            clock: Box::new(SystemClock),
            range: settings.initial_range,
            settings,
            chart: None,
            cycles: 0,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Completed full refresh cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn has_chart(&self) -> bool {
        self.chart.is_some()
    }

    /// Tear down, disposing any live chart.
    pub fn into_parts(mut self) -> (S, R) {
        self.dispose_chart();
        (self.source, self.renderer)
    }

    /// Refresh every widget once. Alerts are fetched once and shared by the
    /// alert list and the trend chart.
    pub async fn refresh_all(&mut self) -> CycleReport {
        info!(range = %self.range, "refreshing dashboard");

        let stats = self.source.stats().await;
        let stats_status =
            WidgetStatus::after_render(&stats, self.renderer.render_stats(&stats), "stats");

        let alerts = self.source.alerts().await;
        let alerts_status = WidgetStatus::after_render(
            &alerts,
            self.renderer
                .render_alerts(&alerts, self.settings.alert_list_limit),
            "alerts",
        );

        let recs = self.source.recommendations().await;
        let recs_status = WidgetStatus::after_render(
            &recs,
            self.renderer.render_recommendations(&recs),
            "recommendations",
        );

        let trend_status = self.draw_trend(&alerts);

        self.cycles += 1;
        let report = CycleReport {
            stats: stats_status,
            alerts: alerts_status,
            recommendations: recs_status,
            trend: trend_status,
        };
        debug!(cycle = self.cycles, ?report, "refresh cycle complete");
        report
    }

    /// Re-fetch alerts and redraw only the trend chart.
    pub async fn refresh_trend(&mut self) -> WidgetStatus {
        let alerts = self.source.alerts().await;
        self.draw_trend(&alerts)
    }

    /// Switch the active range and redraw the trend immediately.
    pub async fn select_range(&mut self, token: &str) -> WidgetStatus {
        self.range = TimeRange::from_token(token);
        info!(token = %token.trim(), range = %self.range, "range changed");
        self.refresh_trend().await
    }

    fn draw_trend(&mut self, alerts: &FetchOutcome<Vec<AlertRecord>>) -> WidgetStatus {
        let series = analysis::aggregate(alerts.items(), self.range, self.clock.now());
        let chart = TrendChart::new(self.range, &series);

        self.dispose_chart();
        let drawn = match self.renderer.draw_trend(&chart, alerts.error()) {
            Ok(handle) => {
                self.chart = Some(handle);
                debug!(range = %self.range, days = chart.labels.len(), "trend chart drawn");
                Ok(())
            }
            Err(e) => Err(e),
        };

        WidgetStatus::after_render(alerts, drawn, "trend")
    }

    fn dispose_chart(&mut self) {
        if let Some(handle) = self.chart.take() {
            handle.dispose();
        }
    }

    /// Poll until `shutdown` resolves.
    ///
    /// The first tick fires immediately. Each cycle, and each range change
    /// read from `range_changes`, runs to completion before the next event is
    /// taken, so cycles never overlap; ticks missed during a slow cycle are
    /// skipped rather than replayed.
    pub async fn run<F>(mut self, mut range_changes: mpsc::Receiver<String>, shutdown: F) -> Self
    where
        F: Future<Output = ()>,
    {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            range = %self.range,
            "refresh loop started"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);
        let mut listening = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.refresh_all().await;
                }
                token = range_changes.recv(), if listening => match token {
                    Some(token) => {
                        self.select_range(&token).await;
                    }
                    None => {
                        debug!("range input closed");
                        listening = false;
                    }
                },
            }
        }

        self.dispose_chart();
        info!(cycles = self.cycles, "refresh loop stopped");
        self
    }
}
