//! Ordered daily series and the trend chart view built from it.

use chrono::NaiveDate;
use serde::Serialize;

use super::bucket::Buckets;
use super::range::TimeRange;

/// One point of the daily trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub count: u64,
    /// Mean score for the day rounded to two decimals; `0.0` when no record
    /// that day carried a usable score.
    pub average_risk: f64,
}

/// Daily trend ordered by date, ascending. Days without qualifying records
/// are absent rather than zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_count(&self) -> u64 {
        self.points.iter().map(|p| p.count).sum()
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Flatten buckets into the ordered series.
pub fn build_series(buckets: &Buckets) -> Series {
    // BTreeMap iteration is already ascending by date.
    let points = buckets
        .iter()
        .map(|(date, bucket)| SeriesPoint {
            date: *date,
            count: bucket.count(),
            average_risk: bucket.average_risk().map(round2).unwrap_or(0.0),
        })
        .collect();

    Series { points }
}

/// Everything the chart renderer needs: a title plus three parallel arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub title: String,
    pub range: TimeRange,
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
    pub avg_risk: Vec<f64>,
}

impl TrendChart {
    pub fn new(range: TimeRange, series: &Series) -> Self {
        let mut labels = Vec::with_capacity(series.len());
        let mut counts = Vec::with_capacity(series.len());
        let mut avg_risk = Vec::with_capacity(series.len());

        for point in &series.points {
            labels.push(point.date.format("%Y-%m-%d").to_string());
            counts.push(point.count);
            avg_risk.push(point.average_risk);
        }

        Self {
            title: format!("Alert Trends ({})", range),
            range,
            labels,
            counts,
            avg_risk,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
