//! Pressure reading sources.
//!
//! Each [`ReadingSource`] produces at most one [`PressureReading`] per
//! decision cycle. `Ok(None)` means the source answered but had no
//! reading for the requested instant.

pub mod error;
pub mod influx;
pub mod sensor;


use async_trait::async_trait;
use baromon_common::types::PressureReading;
use chrono::{DateTime, Utc};

pub use error::{Result, SourceError};

/// Default timeout for a single HTTP request to a data source.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Short name used in logs (e.g., `"influxdb"`, `"sensor"`).
    fn name(&self) -> &str;

    /// Fetches the reading this source is responsible for, relative to `now`.
    ///
    /// # Errors
    ///
    /// [`SourceError::Unavailable`] when the source cannot be reached or
    /// answers with an error, [`SourceError::InvalidReading`] when the
    /// answer cannot be read as a pressure value.
    async fn fetch(&self, now: DateTime<Utc>) -> Result<Option<PressureReading>>;
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {e}")))
}
