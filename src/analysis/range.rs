//! Lookback windows for the trend chart.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// Label used for the unbounded fallback window.
pub const UNBOUNDED_LABEL: &str = "all";

/// A requested lookback window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    Last24h,
    Last7d,
    #[default]
    Last30d,
    Last365d,
    /// Fallback for tokens we do not recognise: no lower bound at all.
    Unbounded,
}

impl TimeRange {
    /// Map a user-facing token to a window.
    ///
    /// Unknown tokens resolve to [`TimeRange::Unbounded`] so that every record
    /// is shown rather than none.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "24h" => TimeRange::Last24h,
            "7d" => TimeRange::Last7d,
            "30d" => TimeRange::Last30d,
            "365d" => TimeRange::Last365d,
            other => {
                tracing::debug!(token = %other, "unrecognised range token, including all records");
                TimeRange::Unbounded
            }
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            TimeRange::Last24h => "24h",
            TimeRange::Last7d => "7d",
            TimeRange::Last30d => "30d",
            TimeRange::Last365d => "365d",
            TimeRange::Unbounded => UNBOUNDED_LABEL,
        }
    }

    /// The four selectable windows, shortest first.
    pub fn selectable() -> [TimeRange; 4] {
        [
            TimeRange::Last24h,
            TimeRange::Last7d,
            TimeRange::Last30d,
            TimeRange::Last365d,
        ]
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.token())
    }
}

/// Earliest instant a record may carry and still be included, or `None` for
/// no filtering.
pub fn resolve_cutoff(range: TimeRange, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match range {
        TimeRange::Last24h => Some(now - Duration::days(1)),
        TimeRange::Last7d => Some(now - Duration::days(7)),
        TimeRange::Last30d => Some(now - Duration::days(30)),
        // Calendar year: Feb 29 falls back to Feb 28.
        TimeRange::Last365d => Some(
            now.checked_sub_months(Months::new(12))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        ),
        TimeRange::Unbounded => None,
    }
}
