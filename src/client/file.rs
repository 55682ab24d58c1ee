use std::path::PathBuf;

use serde_json::Value;

use super::{
    decode_alerts, decode_recommendations, decode_stats, settle, AlertSource, FetchError,
    FetchOutcome,
};
use crate::alerts::{AlertRecord, Recommendation, SummaryStats};

/// Offline source backed by a JSON snapshot on disk.
///
/// The file is either a bare `/alerts/` array, or an object with optional
/// `alerts`, `stats` and `insights` keys mirroring the three endpoints. The
/// file is re-read on every fetch so it can be edited while watching.
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn label(&self, key: &str) -> String {
        format!("{}#{}", self.path.display(), key)
    }

    async fn section(&self, key: &str) -> Result<Option<Value>, FetchError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;
        let body: Value = serde_json::from_str(&content).map_err(|e| FetchError::Decode {
            endpoint: self.label(key),
            reason: e.to_string(),
        })?;

        Ok(match body {
            Value::Array(_) if key == "alerts" => Some(body),
            Value::Object(mut obj) => obj.remove(key),
            _ => None,
        })
    }
}

#[async_trait::async_trait]
impl AlertSource for SnapshotSource {
    async fn alerts(&self) -> FetchOutcome<Vec<AlertRecord>> {
        let label = self.label("alerts");
        let result = match self.section("alerts").await {
            Ok(Some(body)) => decode_alerts(&label, body),
            Ok(None) => Ok(FetchOutcome::Empty),
            Err(e) => Err(e),
        };
        settle(&label, result)
    }

    async fn stats(&self) -> FetchOutcome<SummaryStats> {
        let label = self.label("stats");
        let result = match self.section("stats").await {
            Ok(Some(body)) => decode_stats(&label, body),
            Ok(None) => Ok(FetchOutcome::Empty),
            Err(e) => Err(e),
        };
        settle(&label, result)
    }

    async fn recommendations(&self) -> FetchOutcome<Vec<Recommendation>> {
        let label = self.label("insights");
        let result = match self.section("insights").await {
            Ok(Some(body)) => decode_recommendations(&label, body),
            Ok(None) => Ok(FetchOutcome::Empty),
            Err(e) => Err(e),
        };
        settle(&label, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bare_array_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("alerts.json");
        std::fs::write(
            &path,
            r#"[{"timestamp": "2024-01-01T10:00:00Z", "alert_score": 0.5}]"#,
        )
        .unwrap();

        let source = SnapshotSource::new(&path);
        assert_eq!(source.alerts().await.items().len(), 1);
        assert!(matches!(source.stats().await, FetchOutcome::Empty));
        assert!(matches!(source.recommendations().await, FetchOutcome::Empty));
    }

    #[tokio::test]
    async fn test_object_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(
            &path,
            r#"{
                "alerts": [],
                "stats": {"total_alerts": 4, "critical_alerts": 1, "unique_users": 2, "avg_risk_score": 0.8},
                "insights": {"insights": [{"user": "Admin Account", "recommendation": "Lock session"}]}
            }"#,
        )
        .unwrap();

        let source = SnapshotSource::new(&path);
        assert!(matches!(source.alerts().await, FetchOutcome::Empty));
        let stats = source.stats().await;
        assert_eq!(stats.data().unwrap().unique_users, Some(2));
        assert_eq!(source.recommendations().await.items()[0].recommendation, "Lock session");
    }

    #[tokio::test]
    async fn test_numeric_timestamp_drops_only_that_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("alerts.json");
        std::fs::write(
            &path,
            r#"[{"timestamp":"2024-01-01T10:00:00Z","alert_score":0.5},{"timestamp":1704103200,"alert_score":0.9}]"#,
        )
        .unwrap();

        let alerts = SnapshotSource::new(&path).alerts().await;
        assert!(!alerts.is_failed());
        assert_eq!(alerts.items().len(), 2);

        let series = crate::analysis::build_series(&crate::analysis::bucketize(alerts.items(), None));
        assert_eq!(series.total_count(), 1);
        assert_eq!(series.points[0].average_risk, 0.5);
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let source = SnapshotSource::new("/nonexistent/alertwatch/snapshot.json");
        let outcome = source.alerts().await;
        assert!(matches!(outcome.error(), Some(FetchError::Io { .. })));
    }
}
