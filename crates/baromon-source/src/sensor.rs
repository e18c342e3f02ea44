use crate::error::{Result, SourceError};
use crate::{build_client, ReadingSource};
use async_trait::async_trait;
use baromon_common::types::PressureReading;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing;

/// Live sensor endpoint (a BME680 behind a small HTTP API).
pub struct SensorApiSource {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct SensorPayload {
    timestamp: Option<String>,
    pressure: Option<Value>,
}

impl SensorApiSource {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ReadingSource for SensorApiSource {
    fn name(&self) -> &str {
        "sensor"
    }

    /// `now` is unused: the sensor always reports its latest sample.
    async fn fetch(&self, _now: DateTime<Utc>) -> Result<Option<PressureReading>> {
        let resp = self.client.get(&self.url).send().await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            tracing::warn!(status = %status, url = %self.url, "Sensor API returned non-200");
            return Err(SourceError::Unavailable(format!("sensor API returned HTTP {status}")));
        }

        let body = resp.text().await?;
        let reading = parse_sensor_body(&body)?;
        tracing::debug!(?reading, "Current reading fetched");
        Ok(Some(reading))
    }
}

/// Decodes `{"timestamp": "<RFC 3339>", "pressure": <hPa>}`.
pub fn parse_sensor_body(body: &str) -> Result<PressureReading> {
    let payload: SensorPayload = serde_json::from_str(body)
        .map_err(|e| SourceError::InvalidReading(format!("malformed sensor payload: {e}")))?;

    let raw_ts = payload
        .timestamp
        .ok_or_else(|| SourceError::InvalidReading("sensor payload has no timestamp".to_string()))?;
    let timestamp = DateTime::parse_from_rfc3339(raw_ts.trim())
        .map_err(|e| SourceError::InvalidReading(format!("bad sensor timestamp '{raw_ts}': {e}")))?
        .with_timezone(&Utc);

    let value_hpa = match payload.pressure {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| SourceError::InvalidReading("sensor pressure is missing or not a number".to_string()))?;

    Ok(PressureReading::new(timestamp, value_hpa))
}
