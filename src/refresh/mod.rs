//! Dashboard refresh: the widget contracts and the polling loop that drives
//! them.

pub mod engine;

pub use engine::{CycleReport, Orchestrator, RefreshSettings, WidgetStatus};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::alerts::{AlertRecord, Recommendation, SummaryStats};
use crate::analysis::TrendChart;
use crate::client::{FetchError, FetchOutcome};

/// Source of "now" for range cutoffs.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A drawn chart that holds rendering resources until disposed.
pub trait ChartHandle: Send {
    fn dispose(self: Box<Self>);
}

/// Presentation side of the dashboard.
///
/// Each widget is rendered independently; an error from one method is logged
/// by the caller and never stops the others.
pub trait Renderer: Send {
    fn render_stats(&mut self, outcome: &FetchOutcome<SummaryStats>) -> Result<()>;

    /// `limit` caps how many alerts are listed.
    fn render_alerts(&mut self, outcome: &FetchOutcome<Vec<AlertRecord>>, limit: usize)
        -> Result<()>;

    fn render_recommendations(&mut self, outcome: &FetchOutcome<Vec<Recommendation>>)
        -> Result<()>;

    /// Draw a fresh trend chart. `failure` is set when the chart is empty
    /// because the alerts could not be fetched.
    fn draw_trend(
        &mut self,
        chart: &TrendChart,
        failure: Option<&FetchError>,
    ) -> Result<Box<dyn ChartHandle>>;
}
