//! Time-series aggregation of alert records.
//!
//! The pipeline is pure and synchronous: a [`TimeRange`] resolves to a cutoff,
//! [`bucketize`] groups records by day, and [`build_series`] flattens the
//! buckets into the ordered [`Series`] the trend chart consumes.

pub mod bucket;
pub mod range;
pub mod series;

pub use bucket::{bucketize, Buckets, DayBucket};
pub use range::{resolve_cutoff, TimeRange};
pub use series::{build_series, Series, SeriesPoint, TrendChart};

use chrono::{DateTime, Utc};

use crate::alerts::AlertRecord;

/// Run the whole pipeline for one range as of `now`.
pub fn aggregate(records: &[AlertRecord], range: TimeRange, now: DateTime<Utc>) -> Series {
    let cutoff = resolve_cutoff(range, now);
    let buckets = bucketize(records, cutoff);
    build_series(&buckets)
}
