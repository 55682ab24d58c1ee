//! Refresh loop behaviour against an in-memory source and a recording renderer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alertwatch::alerts::{AlertRecord, Recommendation, SummaryStats};
use alertwatch::analysis::{TimeRange, TrendChart};
use alertwatch::client::{AlertSource, FetchError, FetchOutcome};
use alertwatch::refresh::{
    ChartHandle, FixedClock, Orchestrator, RefreshSettings, Renderer, WidgetStatus,
};
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;

#[derive(Default)]
struct FakeSource {
    alerts: Vec<AlertRecord>,
    stats_fail: bool,
    alerts_fail: bool,
    alert_calls: AtomicUsize,
    stats_calls: AtomicUsize,
}

fn status_error(endpoint: &str) -> FetchError {
    FetchError::Status {
        endpoint: endpoint.to_string(),
        status: 503,
    }
}

#[async_trait::async_trait]
impl AlertSource for FakeSource {
    async fn alerts(&self) -> FetchOutcome<Vec<AlertRecord>> {
        self.alert_calls.fetch_add(1, Ordering::SeqCst);
        if self.alerts_fail {
            return FetchOutcome::Failed(status_error("/alerts/"));
        }
        FetchOutcome::from_items(self.alerts.clone())
    }

    async fn stats(&self) -> FetchOutcome<SummaryStats> {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        if self.stats_fail {
            return FetchOutcome::Failed(status_error("/stats/"));
        }
        FetchOutcome::Data(SummaryStats {
            total_alerts: self.alerts.len() as u64,
            ..Default::default()
        })
    }

    async fn recommendations(&self) -> FetchOutcome<Vec<Recommendation>> {
        FetchOutcome::Empty
    }
}

/// Shared view of what the renderer saw, readable after the orchestrator
/// has taken ownership of the renderer.
#[derive(Default)]
struct Recorded {
    charts: Mutex<Vec<TrendChart>>,
    stats_renders: AtomicUsize,
    alert_renders: AtomicUsize,
    live_charts: AtomicUsize,
    max_live_charts: AtomicUsize,
    disposed: AtomicUsize,
}

struct RecordingRenderer {
    log: Arc<Recorded>,
    fail_stats: bool,
}

struct RecordingChart {
    log: Arc<Recorded>,
}

impl ChartHandle for RecordingChart {
    fn dispose(self: Box<Self>) {
        self.log.live_charts.fetch_sub(1, Ordering::SeqCst);
        self.log.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Renderer for RecordingRenderer {
    fn render_stats(&mut self, _outcome: &FetchOutcome<SummaryStats>) -> anyhow::Result<()> {
        self.log.stats_renders.fetch_add(1, Ordering::SeqCst);
        if self.fail_stats {
            anyhow::bail!("stats panel unavailable");
        }
        Ok(())
    }

    fn render_alerts(
        &mut self,
        _outcome: &FetchOutcome<Vec<AlertRecord>>,
        _limit: usize,
    ) -> anyhow::Result<()> {
        self.log.alert_renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn render_recommendations(
        &mut self,
        _outcome: &FetchOutcome<Vec<Recommendation>>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn draw_trend(
        &mut self,
        chart: &TrendChart,
        _failure: Option<&FetchError>,
    ) -> anyhow::Result<Box<dyn ChartHandle>> {
        self.log.charts.lock().unwrap().push(chart.clone());
        let live = self.log.live_charts.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_live_charts.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(RecordingChart {
            log: Arc::clone(&self.log),
        }))
    }
}

fn sample_alerts() -> Vec<AlertRecord> {
    [
        ("2024-01-01T10:00:00Z", 0.5),
        ("2024-01-01T12:00:00Z", 0.9),
        ("2023-12-20T08:00:00Z", 0.3),
    ]
    .iter()
    .map(|(ts, score)| AlertRecord {
        timestamp: Some(ts.to_string()),
        alert_score: Some(serde_json::json!(score)),
        ..Default::default()
    })
    .collect()
}

fn settings(range: TimeRange) -> RefreshSettings {
    RefreshSettings {
        interval: Duration::from_secs(30),
        initial_range: range,
        alert_list_limit: 30,
    }
}

fn build(
    source: FakeSource,
    fail_stats: bool,
    range: TimeRange,
) -> (Orchestrator<FakeSource, RecordingRenderer>, Arc<Recorded>) {
    let log = Arc::new(Recorded::default());
    let renderer = RecordingRenderer {
        log: Arc::clone(&log),
        fail_stats,
    };
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let orchestrator =
        Orchestrator::new(source, renderer, settings(range)).with_clock(FixedClock(now));
    (orchestrator, log)
}

#[tokio::test]
async fn test_full_cycle_renders_every_widget() {
    let source = FakeSource {
        alerts: sample_alerts(),
        ..Default::default()
    };
    let (mut orchestrator, log) = build(source, false, TimeRange::Last7d);

    let report = orchestrator.refresh_all().await;
    assert_eq!(report.stats, WidgetStatus::Rendered);
    assert_eq!(report.alerts, WidgetStatus::Rendered);
    assert_eq!(report.recommendations, WidgetStatus::NoData);
    assert_eq!(report.trend, WidgetStatus::Rendered);
    assert_eq!(orchestrator.cycles(), 1);
    assert!(orchestrator.has_chart());

    let charts = log.charts.lock().unwrap();
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].title, "Alert Trends (7d)");
    // The 2023-12-20 alert is older than seven days.
    assert_eq!(charts[0].labels, vec!["2024-01-01"]);
    assert_eq!(charts[0].counts, vec![2]);
    assert_eq!(charts[0].avg_risk, vec![0.7]);
}

#[tokio::test]
async fn test_alerts_fetched_once_per_cycle() {
    let source = FakeSource {
        alerts: sample_alerts(),
        ..Default::default()
    };
    let (mut orchestrator, _log) = build(source, false, TimeRange::Last30d);
    orchestrator.refresh_all().await;
    orchestrator.refresh_all().await;

    let (source, _) = orchestrator.into_parts();
    assert_eq!(source.alert_calls.load(Ordering::SeqCst), 2);
    assert_eq!(source.stats_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_stats_fetch_does_not_block_other_widgets() {
    let source = FakeSource {
        alerts: sample_alerts(),
        stats_fail: true,
        ..Default::default()
    };
    let (mut orchestrator, log) = build(source, false, TimeRange::Last30d);

    let report = orchestrator.refresh_all().await;
    assert_eq!(report.stats, WidgetStatus::FetchFailed);
    assert_eq!(report.alerts, WidgetStatus::Rendered);
    assert_eq!(report.trend, WidgetStatus::Rendered);
    assert_eq!(log.charts.lock().unwrap()[0].counts, vec![1, 2]);
}

#[tokio::test]
async fn test_render_error_does_not_block_other_widgets() {
    let source = FakeSource {
        alerts: sample_alerts(),
        ..Default::default()
    };
    let (mut orchestrator, log) = build(source, true, TimeRange::Last30d);

    let report = orchestrator.refresh_all().await;
    assert_eq!(report.stats, WidgetStatus::RenderFailed);
    assert_eq!(report.alerts, WidgetStatus::Rendered);
    assert_eq!(report.trend, WidgetStatus::Rendered);
    assert_eq!(log.alert_renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_alert_fetch_draws_empty_chart() {
    let source = FakeSource {
        alerts_fail: true,
        ..Default::default()
    };
    let (mut orchestrator, log) = build(source, false, TimeRange::Last30d);

    let report = orchestrator.refresh_all().await;
    assert_eq!(report.alerts, WidgetStatus::FetchFailed);
    assert_eq!(report.trend, WidgetStatus::FetchFailed);
    assert_eq!(report.stats, WidgetStatus::Rendered);

    let charts = log.charts.lock().unwrap();
    assert!(charts[0].is_empty());
}

#[tokio::test]
async fn test_range_change_redraws_trend_only() {
    let source = FakeSource {
        alerts: sample_alerts(),
        ..Default::default()
    };
    let (mut orchestrator, log) = build(source, false, TimeRange::Last24h);
    orchestrator.refresh_all().await;

    let status = orchestrator.select_range("30d").await;
    assert_eq!(status, WidgetStatus::Rendered);
    assert_eq!(orchestrator.range(), TimeRange::Last30d);
    assert_eq!(log.stats_renders.load(Ordering::SeqCst), 1);

    let charts = log.charts.lock().unwrap();
    assert_eq!(charts.len(), 2);
    assert_eq!(charts[0].labels, vec!["2024-01-01"]);
    assert_eq!(charts[1].title, "Alert Trends (30d)");
    assert_eq!(charts[1].labels, vec!["2023-12-20", "2024-01-01"]);
}

#[tokio::test]
async fn test_unknown_range_token_shows_everything() {
    let source = FakeSource {
        alerts: sample_alerts(),
        ..Default::default()
    };
    let (mut orchestrator, log) = build(source, false, TimeRange::Last24h);
    orchestrator.select_range("forever").await;

    assert_eq!(orchestrator.range(), TimeRange::Unbounded);
    let charts = log.charts.lock().unwrap();
    assert_eq!(charts[0].title, "Alert Trends (all)");
    assert_eq!(charts[0].counts.iter().sum::<u64>(), 3);
}

#[tokio::test]
async fn test_previous_chart_disposed_before_redraw() {
    let source = FakeSource {
        alerts: sample_alerts(),
        ..Default::default()
    };
    let (mut orchestrator, log) = build(source, false, TimeRange::Last30d);

    for _ in 0..3 {
        orchestrator.refresh_all().await;
    }
    orchestrator.select_range("7d").await;

    assert_eq!(log.charts.lock().unwrap().len(), 4);
    assert_eq!(log.disposed.load(Ordering::SeqCst), 3);
    assert_eq!(log.live_charts.load(Ordering::SeqCst), 1);
    assert_eq!(log.max_live_charts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_ticks_and_handles_range_changes() {
    let source = FakeSource {
        alerts: sample_alerts(),
        ..Default::default()
    };
    let (orchestrator, log) = build(source, false, TimeRange::Last30d);

    let (tx, rx) = mpsc::channel(4);
    tx.send("7d".to_string()).await.unwrap();
    drop(tx);

    // Ticks at 0s, 30s and 60s; shutdown at 65s.
    let shutdown = tokio::time::sleep(Duration::from_secs(65));
    let orchestrator = orchestrator.run(rx, shutdown).await;

    assert_eq!(orchestrator.cycles(), 3);
    assert_eq!(orchestrator.range(), TimeRange::Last7d);
    assert!(!orchestrator.has_chart());
    assert_eq!(log.charts.lock().unwrap().len(), 4);
    assert_eq!(log.live_charts.load(Ordering::SeqCst), 0);
    assert_eq!(log.max_live_charts.load(Ordering::SeqCst), 1);
}
