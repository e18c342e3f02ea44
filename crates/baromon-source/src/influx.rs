use crate::error::{Result, SourceError};
use crate::{build_client, ReadingSource};
use async_trait::async_trait;
use baromon_common::types::PressureReading;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing;

/// Connection and query settings for the InfluxDB v2 time-series store.
#[derive(Debug, Clone)]
pub struct InfluxSettings {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub measurement: String,
    pub field: String,
    /// How far back from `now` the historical reading is taken.
    pub lookback_secs: i64,
    /// Half-width of the query range around `now - lookback`.
    pub tolerance_secs: i64,
    pub timeout_secs: u64,
}

/// Fetches the pressure value nearest to `now - lookback` from InfluxDB.
pub struct InfluxHistorySource {
    client: reqwest::Client,
    settings: InfluxSettings,
    lookback: Duration,
    tolerance: Duration,
}

impl InfluxHistorySource {
    /// Rejects a non-positive lookback, a negative tolerance, and a
    /// tolerance that would reach past `now`.
    pub fn new(settings: InfluxSettings) -> Result<Self> {
        if settings.lookback_secs <= 0 {
            return Err(SourceError::InvalidConfig(format!(
                "lookback_secs must be positive, got {}",
                settings.lookback_secs
            )));
        }
        if settings.tolerance_secs < 0 || settings.tolerance_secs >= settings.lookback_secs {
            return Err(SourceError::InvalidConfig(format!(
                "tolerance_secs must be in [0, lookback_secs), got {}",
                settings.tolerance_secs
            )));
        }
        let lookback = Duration::try_seconds(settings.lookback_secs).ok_or_else(|| {
            SourceError::InvalidConfig(format!("lookback_secs {} is out of range", settings.lookback_secs))
        })?;
        let tolerance = Duration::try_seconds(settings.tolerance_secs).ok_or_else(|| {
            SourceError::InvalidConfig(format!("tolerance_secs {} is out of range", settings.tolerance_secs))
        })?;

        Ok(Self {
            client: build_client(settings.timeout_secs)?,
            settings,
            lookback,
            tolerance,
        })
    }

    /// The Flux query for the reading around `now - lookback`.
    pub fn build_query(&self, now: DateTime<Utc>) -> Result<String> {
        let out_of_range = || {
            SourceError::InvalidConfig(format!(
                "query window {}s before {now} is out of range",
                self.settings.lookback_secs
            ))
        };
        let target = now.checked_sub_signed(self.lookback).ok_or_else(out_of_range)?;
        let start = target
            .checked_sub_signed(self.tolerance)
            .ok_or_else(out_of_range)?
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let stop = target
            .checked_add_signed(self.tolerance)
            .ok_or_else(out_of_range)?
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        Ok(format!(
            r#"from(bucket: "{bucket}")
  |> range(start: {start}, stop: {stop})
  |> filter(fn: (r) => r._measurement == "{measurement}" and r._field == "{field}")
  |> last()"#,
            bucket = flux_escape(&self.settings.bucket),
            measurement = flux_escape(&self.settings.measurement),
            field = flux_escape(&self.settings.field),
        ))
    }
}

#[async_trait]
impl ReadingSource for InfluxHistorySource {
    fn name(&self) -> &str {
        "influxdb"
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<Option<PressureReading>> {
        let query = self.build_query(now)?;
        let endpoint = format!("{}/api/v2/query", self.settings.url.trim_end_matches('/'));

        let resp = self
            .client
            .post(&endpoint)
            .query(&[("org", self.settings.org.as_str())])
            .header("Authorization", format!("Token {}", self.settings.token))
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(query)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            tracing::warn!(status = %status, "InfluxDB query failed");
            return Err(SourceError::Unavailable(format!(
                "InfluxDB returned HTTP {status}: {}",
                body.trim()
            )));
        }

        let reading = parse_flux_csv(&body)?;
        tracing::debug!(?reading, "Historical reading fetched");
        Ok(reading)
    }
}

fn flux_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Extracts the last `_time`/`_value` row from a Flux CSV response.
///
/// Handles both annotated (`#datatype`, `#group`, `#default` lines) and
/// plain output, and multiple tables separated by blank lines.
pub fn parse_flux_csv(body: &str) -> Result<Option<PressureReading>> {
    let mut columns: Option<(usize, usize)> = None;
    let mut last: Option<PressureReading> = None;

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            // Each table restates its header.
            columns = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let fields = split_csv_record(line);
        let Some((time_idx, value_idx)) = columns else {
            let time_idx = fields.iter().position(|f| f == "_time");
            let value_idx = fields.iter().position(|f| f == "_value");
            match (time_idx, value_idx) {
                (Some(t), Some(v)) => columns = Some((t, v)),
                _ => {
                    return Err(SourceError::InvalidReading(
                        "Flux response header lacks _time/_value columns".to_string(),
                    ))
                }
            }
            continue;
        };

        let time_raw = fields.get(time_idx).map(String::as_str).unwrap_or_default();
        let value_raw = fields.get(value_idx).map(String::as_str).unwrap_or_default();

        let timestamp = DateTime::parse_from_rfc3339(time_raw)
            .map_err(|e| SourceError::InvalidReading(format!("bad _time '{time_raw}': {e}")))?
            .with_timezone(&Utc);
        let value_hpa: f64 = value_raw
            .parse()
            .map_err(|_| SourceError::InvalidReading(format!("non-numeric _value '{value_raw}'")))?;

        last = Some(PressureReading::new(timestamp, value_hpa));
    }

    Ok(last)
}

/// Splits one RFC 4180 record. Quoted fields may contain commas, and `""`
/// inside quotes is a literal quote. Records never span lines in Flux output.
fn split_csv_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
