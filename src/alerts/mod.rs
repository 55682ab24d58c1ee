//! Alert service data model: raw alert records, summary statistics and
//! recommendations, plus the lenient value parsing the service requires.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Naive date-time layouts accepted in addition to RFC 3339.
/// `%.f` makes fractional seconds optional.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A single alert as served by `/alerts/`.
///
/// Only `timestamp` and `alert_score` feed the aggregation engine; the rest is
/// carried through for the alert list. Text fields accept any JSON value so a
/// badly typed field costs that field, never the record: numbers keep their
/// digits, anything else reads as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "alertScore")]
    pub alert_score: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub action: Option<String>,
    #[serde(default, alias = "srcIp", deserialize_with = "lenient_text")]
    pub src_ip: Option<String>,
    #[serde(default, alias = "prelimPriority", deserialize_with = "lenient_text")]
    pub prelim_priority: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl AlertRecord {
    /// Parsed timestamp in the offset it was written with, or `None` when the
    /// field is missing or malformed.
    pub fn occurred_at(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    /// Risk score when present and finite.
    pub fn score(&self) -> Option<f64> {
        self.alert_score.as_ref().and_then(parse_score)
    }

    pub fn priority(&self) -> Priority {
        Priority::from_label(self.prelim_priority.as_deref())
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Timestamps without an offset are taken as UTC. A bare date is midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    // Python's str(datetime) form: space separator with a `+00:00` offset.
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt);
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Interpret a number-like JSON value as a finite `f64`.
///
/// Numbers and numeric strings are accepted; `NaN`, infinities, booleans,
/// objects and unparsable strings are not.
pub fn parse_score(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Preliminary priority assigned upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Anything other than `HIGH` or `MEDIUM` (including a missing label) is `Low`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some(l) if l.eq_ignore_ascii_case("high") => Priority::High,
            Some(l) if l.eq_ignore_ascii_case("medium") => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.pad(label)
    }
}

/// Colour band for an average risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Normal,
    Elevated,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            RiskLevel::High
        } else if score >= 0.3 {
            RiskLevel::Elevated
        } else {
            RiskLevel::Normal
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RiskLevel::Normal => "Normal",
            RiskLevel::Elevated => "Elevated",
            RiskLevel::High => "High",
        };
        f.pad(label)
    }
}

/// Headline numbers served by `/stats/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_alerts: u64,
    pub critical_alerts: u64,
    pub unique_users: Option<u64>,
    pub avg_risk_score: f64,
}

impl SummaryStats {
    /// Build from the raw `/stats/` body. Missing or non-numeric counters
    /// read as zero; a missing user count stays unknown.
    pub fn from_json(body: &Value) -> Self {
        fn field<'a>(body: &'a Value, name: &str) -> Option<&'a Value> {
            body.get(name).filter(|v| !v.is_null())
        }

        Self {
            total_alerts: field(body, "total_alerts").and_then(parse_count).unwrap_or(0),
            critical_alerts: field(body, "critical_alerts")
                .and_then(parse_count)
                .unwrap_or(0),
            unique_users: field(body, "unique_users").and_then(parse_count),
            avg_risk_score: field(body, "avg_risk_score")
                .and_then(parse_score)
                .unwrap_or(0.0),
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.avg_risk_score)
    }
}

/// One entry from the recommendations endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default, alias = "entity")]
    pub user: String,
    #[serde(default, alias = "summary")]
    pub recommendation: String,
}
