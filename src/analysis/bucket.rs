//! Day buckets: per-date alert counts and the scores behind the average risk.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::alerts::AlertRecord;

/// Per-day accumulator.
///
/// Scores are kept rather than summed on arrival. Float addition depends on
/// operand order, so the sum is taken over the sorted scores and the same
/// records give the same average whatever order they arrived in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBucket {
    count: u64,
    scores: Vec<f64>,
}

impl DayBucket {
    /// Count one record, keeping its score when it has one.
    pub fn record(&mut self, score: Option<f64>) {
        self.count += 1;
        if let Some(score) = score {
            self.scores.push(score);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn risk_sum(&self) -> f64 {
        let mut sorted = self.scores.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.iter().sum()
    }

    pub fn risk_count(&self) -> u64 {
        self.scores.len() as u64
    }

    /// Unrounded mean of the scored records, `None` when nothing was scored.
    pub fn average_risk(&self) -> Option<f64> {
        if self.scores.is_empty() {
            None
        } else {
            Some(self.risk_sum() / self.scores.len() as f64)
        }
    }
}

/// Day buckets keyed by calendar date. `NaiveDate` orders the same way as its
/// ISO string form.
pub type Buckets = BTreeMap<NaiveDate, DayBucket>;

/// Group records into day buckets.
///
/// Records without a parsable timestamp, or older than `cutoff`, are dropped.
/// The bucket key is the date as written in the record's own offset.
pub fn bucketize(records: &[AlertRecord], cutoff: Option<DateTime<Utc>>) -> Buckets {
    let mut buckets = Buckets::new();
    let mut dropped = 0usize;

    for record in records {
        let Some(occurred_at) = record.occurred_at() else {
            dropped += 1;
            continue;
        };

        if let Some(cutoff) = cutoff {
            if occurred_at < cutoff {
                continue;
            }
        }

        buckets
            .entry(occurred_at.date_naive())
            .or_default()
            .record(record.score());
    }

    if dropped > 0 {
        tracing::debug!(dropped, total = records.len(), "skipped records without a usable timestamp");
    }

    buckets
}
