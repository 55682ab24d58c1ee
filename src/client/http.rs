use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{
    decode_alerts, decode_recommendations, decode_stats, settle, AlertSource, FetchError,
    FetchOutcome, ALERTS_PATH, INSIGHTS_PATH, STATS_PATH,
};
use crate::alerts::{AlertRecord, Recommendation, SummaryStats};
use crate::config::ApiConfig;

/// Alert service reached over HTTP.
pub struct HttpAlertSource {
    client: Client,
    base_url: String,
}

impl HttpAlertSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        Self::new(&api.base_url, Duration::from_secs(api.timeout_secs))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.endpoint(path);
        let start = Instant::now();

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                endpoint: url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: url,
                status: status.as_u16(),
            });
        }

        let body = resp.json::<Value>().await.map_err(|e| FetchError::Decode {
            endpoint: url.clone(),
            reason: e.to_string(),
        })?;

        debug!(
            endpoint = %url,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "fetched"
        );
        Ok(body)
    }
}

#[async_trait::async_trait]
impl AlertSource for HttpAlertSource {
    async fn alerts(&self) -> FetchOutcome<Vec<AlertRecord>> {
        let result = match self.get_json(ALERTS_PATH).await {
            Ok(body) => decode_alerts(&self.endpoint(ALERTS_PATH), body),
            Err(e) => Err(e),
        };
        settle(ALERTS_PATH, result)
    }

    async fn stats(&self) -> FetchOutcome<SummaryStats> {
        let result = match self.get_json(STATS_PATH).await {
            Ok(body) => decode_stats(&self.endpoint(STATS_PATH), body),
            Err(e) => Err(e),
        };
        settle(STATS_PATH, result)
    }

    async fn recommendations(&self) -> FetchOutcome<Vec<Recommendation>> {
        let result = match self.get_json(INSIGHTS_PATH).await {
            Ok(body) => decode_recommendations(&self.endpoint(INSIGHTS_PATH), body),
            Err(e) => Err(e),
        };
        settle(INSIGHTS_PATH, result)
    }
}
