//! Satellite vegetation-index source
//!
//! Integrates with the Agromonitoring API: a polygon is registered once per
//! rounded field location, then NDVI history is read for that polygon.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::{BoundingRegion, DateRange, Sample};
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

const SERVICE: &str = "Vegetation source";

/// Body fragment the API returns when the requested window ends in the future
const FUTURE_END_MESSAGE: &str = "end can not be after now";

/// Time series of vigor samples for a region.
#[async_trait]
pub trait VegetationSource: Send + Sync {
    async fn fetch_samples(&self, region: &BoundingRegion, range: &DateRange)
        -> AppResult<Vec<Sample>>;
}

/// Agromonitoring API client
#[derive(Clone)]
pub struct AgroMonitoringClient {
    client: Client,
    api_key: String,
    base_url: String,
    polygons: Arc<RwLock<HashMap<u64, String>>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolygonResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NdviHistoryItem {
    dt: i64,
    /// Cloud coverage, percent
    #[serde(default)]
    cl: f64,
    data: NdviStats,
}

#[derive(Debug, Deserialize)]
struct NdviStats {
    mean: Option<f64>,
}

enum HistoryOutcome {
    Items(Vec<NdviHistoryItem>),
    EndInFuture,
}

impl AgroMonitoringClient {
    /// Create a new client against the public API
    pub fn new(api_key: String) -> AppResult<Self> {
        Self::with_base_url(
            api_key,
            "https://api.agromonitoring.com".to_string(),
            Duration::from_secs(20),
        )
    }

    /// Create a new client with custom base URL and per-request timeout
    pub fn with_base_url(api_key: String, base_url: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            polygons: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Polygon id for the region, registering it on first use.
    ///
    /// The write lock is held across registration so concurrent first
    /// requests for one field register a single polygon.
    async fn polygon_id(&self, region: &BoundingRegion) -> AppResult<String> {
        let key = region.center.location_key();
        if let Some(id) = self.polygons.read().await.get(&key) {
            return Ok(id.clone());
        }

        let mut polygons = self.polygons.write().await;
        if let Some(id) = polygons.get(&key) {
            return Ok(id.clone());
        }
        let id = self.register_polygon(region).await?;
        polygons.insert(key, id.clone());
        Ok(id)
    }

    async fn register_polygon(&self, region: &BoundingRegion) -> AppResult<String> {
        let url = format!("{}/agro/1.0/polygons?appid={}", self.base_url, self.api_key);
        let body = json!({
            "name": format!("field-{}", region.center.rounded()),
            "geo_json": {
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [region.ring()],
                }
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("polygon", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                SERVICE,
                format!("polygon API error: {} - {}", status, text),
            ));
        }

        let polygon: PolygonResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("failed to parse polygon: {}", e)))?;

        tracing::info!(polygon_id = %polygon.id, center = %region.center, "registered field polygon");
        Ok(polygon.id)
    }

    async fn ndvi_history(&self, polygon_id: &str, range: &DateRange) -> AppResult<HistoryOutcome> {
        let url = format!(
            "{}/agro/1.0/ndvi/history?start={}&end={}&polyid={}&appid={}",
            self.base_url,
            day_start(range.start),
            day_end(range.end),
            polygon_id,
            self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error("history", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status == StatusCode::BAD_REQUEST && text.contains(FUTURE_END_MESSAGE) {
                return Ok(HistoryOutcome::EndInFuture);
            }
            return Err(AppError::upstream(
                SERVICE,
                format!("history API error: {} - {}", status, text),
            ));
        }

        let items: Vec<NdviHistoryItem> = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("failed to parse history: {}", e)))?;
        Ok(HistoryOutcome::Items(items))
    }
}

#[async_trait]
impl VegetationSource for AgroMonitoringClient {
    async fn fetch_samples(
        &self,
        region: &BoundingRegion,
        range: &DateRange,
    ) -> AppResult<Vec<Sample>> {
        let polygon_id = self.polygon_id(region).await?;

        let items = match self.ndvi_history(&polygon_id, range).await? {
            HistoryOutcome::Items(items) => items,
            HistoryOutcome::EndInFuture => {
                let shifted = range.shifted_back_one_year();
                tracing::warn!(
                    start = %shifted.start,
                    end = %shifted.end,
                    "history window ends in the future, retrying one year earlier"
                );
                match self.ndvi_history(&polygon_id, &shifted).await? {
                    HistoryOutcome::Items(items) => items,
                    HistoryOutcome::EndInFuture => {
                        return Err(AppError::upstream(
                            SERVICE,
                            "history window rejected after shifting back one year",
                        ))
                    }
                }
            }
        };

        Ok(convert_history(items))
    }
}

fn request_error(what: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(SERVICE)
    } else {
        AppError::upstream(SERVICE, format!("{} request failed: {}", what, e))
    }
}

/// Items without a mean or timestamp are dropped; cloud percent becomes a fraction.
fn convert_history(items: Vec<NdviHistoryItem>) -> Vec<Sample> {
    items
        .into_iter()
        .filter_map(|item| {
            let mean = item.data.mean?;
            let timestamp = DateTime::from_timestamp(item.dt, 0)?;
            Some(Sample::new(timestamp, mean, item.cl / 100.0))
        })
        .collect()
}

fn day_start(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn day_end(date: NaiveDate) -> i64 {
    day_start(date) + 86_399
}

/// Helper for callers that only know "now".
pub fn lookback_range(today: NaiveDate, days: i64) -> DateRange {
    DateRange {
        start: today - chrono::Duration::days(days.max(1)),
        end: today,
    }
}
