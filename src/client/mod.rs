//! Data acquisition from the alert service.
//!
//! Every fetch settles into a [`FetchOutcome`]: callers can tell "the service
//! has no alerts" apart from "the service could not be reached", and neither
//! case is an error for the refresh loop.

pub mod file;
pub mod http;

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::alerts::{AlertRecord, Recommendation, SummaryStats};

pub const ALERTS_PATH: &str = "/alerts/";
pub const STATS_PATH: &str = "/stats/";
pub const INSIGHTS_PATH: &str = "/insights/agentic";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("malformed response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("{endpoint} reported an error: {message}")]
    Service { endpoint: String, message: String },

    #[error("failed to read snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one fetch.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// The service answered with something to show.
    Data(T),
    /// The service answered, but there is nothing to show.
    Empty,
    /// No usable answer this cycle.
    Failed(FetchError),
}

impl<T> FetchOutcome<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            FetchOutcome::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

impl<T> FetchOutcome<Vec<T>> {
    /// An empty list becomes [`FetchOutcome::Empty`].
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Data(items)
        }
    }

    /// The fetched items, or nothing when the fetch was empty or failed.
    pub fn items(&self) -> &[T] {
        match self {
            FetchOutcome::Data(items) => items,
            _ => &[],
        }
    }
}

/// Where dashboard data comes from.
#[async_trait::async_trait]
pub trait AlertSource: Send + Sync {
    async fn alerts(&self) -> FetchOutcome<Vec<AlertRecord>>;
    async fn stats(&self) -> FetchOutcome<SummaryStats>;
    async fn recommendations(&self) -> FetchOutcome<Vec<Recommendation>>;
}

#[async_trait::async_trait]
impl<S: AlertSource + ?Sized> AlertSource for Box<S> {
    async fn alerts(&self) -> FetchOutcome<Vec<AlertRecord>> {
        (**self).alerts().await
    }

    async fn stats(&self) -> FetchOutcome<SummaryStats> {
        (**self).stats().await
    }

    async fn recommendations(&self) -> FetchOutcome<Vec<Recommendation>> {
        (**self).recommendations().await
    }
}

/// Collapse a fetch result into an outcome, logging the failure.
pub(crate) fn settle<T>(
    endpoint: &str,
    result: Result<FetchOutcome<T>, FetchError>,
) -> FetchOutcome<T> {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(%endpoint, error = %e, "fetch failed, no data this cycle");
            FetchOutcome::Failed(e)
        }
    }
}

/// The backend signals failures in-band as `{"error": ...}` or
/// `{"status": "error", "message": ...}`.
pub(crate) fn service_error(body: &Value) -> Option<String> {
    let obj = body.as_object()?;
    if let Some(err) = obj.get("error") {
        return Some(match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    }
    if obj.get("status").and_then(Value::as_str) == Some("error") {
        let message = obj
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unspecified error");
        return Some(message.to_string());
    }
    None
}

/// Decode the `/alerts/` array one record at a time. A record that is not a
/// JSON object is skipped; the rest of the list survives.
pub(crate) fn decode_alerts(
    endpoint: &str,
    body: Value,
) -> Result<FetchOutcome<Vec<AlertRecord>>, FetchError> {
    if let Some(message) = service_error(&body) {
        return Err(FetchError::Service {
            endpoint: endpoint.to_string(),
            message,
        });
    }
    let Value::Array(items) = body else {
        return Err(FetchError::Decode {
            endpoint: endpoint.to_string(),
            reason: "expected a JSON array of alerts".to_string(),
        });
    };

    let total = items.len();
    let records: Vec<AlertRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(%endpoint, index, error = %e, "skipping malformed alert record");
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            %endpoint,
            skipped = total - records.len(),
            total,
            "some alert records could not be decoded"
        );
    }
    Ok(FetchOutcome::from_items(records))
}

pub(crate) fn decode_stats(
    endpoint: &str,
    body: Value,
) -> Result<FetchOutcome<SummaryStats>, FetchError> {
    if let Some(message) = service_error(&body) {
        return Err(FetchError::Service {
            endpoint: endpoint.to_string(),
            message,
        });
    }
    if !body.is_object() {
        return Err(FetchError::Decode {
            endpoint: endpoint.to_string(),
            reason: "expected a JSON object".to_string(),
        });
    }
    Ok(FetchOutcome::Data(SummaryStats::from_json(&body)))
}

/// Accepts `{"insights": [...]}` or a bare list.
pub(crate) fn decode_recommendations(
    endpoint: &str,
    body: Value,
) -> Result<FetchOutcome<Vec<Recommendation>>, FetchError> {
    if let Some(message) = service_error(&body) {
        return Err(FetchError::Service {
            endpoint: endpoint.to_string(),
            message,
        });
    }
    let list = match body {
        Value::Object(mut obj) => obj.remove("insights").unwrap_or(Value::Null),
        other => other,
    };
    let items: Vec<Recommendation> =
        serde_json::from_value(list).map_err(|e| FetchError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
    Ok(FetchOutcome::from_items(items))
}
