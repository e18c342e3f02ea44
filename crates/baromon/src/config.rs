use anyhow::{Context, Result};
use baromon_alert::cooldown::CooldownTracker;
use baromon_alert::window::QuietHoursWindow;
use baromon_alert::AlertPolicy;
use baromon_source::influx::InfluxSettings;
use chrono::{Duration, FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaromonConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// How long a cycle waits for another cycle's memory lock.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub influx: InfluxConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// A fall strictly larger than this (hPa) triggers.
    #[serde(default = "default_drop_threshold_hpa")]
    pub drop_threshold_hpa: f64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
    /// Local wall-clock offset for quiet hours and message timestamps.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_quiet_start")]
    pub quiet_start: String,
    #[serde(default = "default_quiet_end")]
    pub quiet_end: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            drop_threshold_hpa: default_drop_threshold_hpa(),
            cooldown_secs: default_cooldown_secs(),
            utc_offset: default_utc_offset(),
            quiet_start: default_quiet_start(),
            quiet_end: default_quiet_end(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_measurement")]
    pub measurement: String,
    #[serde(default = "default_field")]
    pub field: String,
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: i64,
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: String::new(),
            org: String::new(),
            bucket: String::new(),
            measurement: default_measurement(),
            field: default_field(),
            lookback_secs: default_lookback_secs(),
            tolerance_secs: default_tolerance_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_message_template")]
    pub message_template: String,
    #[serde(default)]
    pub line: Option<LineSection>,
    /// Extra channels built through the channel registry.
    #[serde(default)]
    pub channels: Vec<ChannelSection>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            message_template: default_message_template(),
            line: None,
            channels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineSection {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSection {
    #[serde(rename = "type")]
    pub channel_type: String,
    #[serde(default = "default_channel_config")]
    pub config: serde_json::Value,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    30
}

fn default_http_timeout_secs() -> u64 {
    baromon_source::DEFAULT_TIMEOUT_SECS
}

fn default_drop_threshold_hpa() -> f64 {
    baromon_alert::engine::DEFAULT_DROP_THRESHOLD_HPA
}

fn default_cooldown_secs() -> i64 {
    baromon_alert::cooldown::DEFAULT_COOLDOWN_SECS
}

fn default_utc_offset() -> String {
    "+09:00".to_string()
}

fn default_quiet_start() -> String {
    "00:00".to_string()
}

fn default_quiet_end() -> String {
    "06:00".to_string()
}

fn default_measurement() -> String {
    "bme680".to_string()
}

fn default_field() -> String {
    "pressure".to_string()
}

fn default_lookback_secs() -> i64 {
    30 * 60
}

fn default_tolerance_secs() -> i64 {
    60
}

fn default_message_template() -> String {
    baromon_notify::message::DEFAULT_TEMPLATE.to_string()
}

fn default_channel_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Default for BaromonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lock_timeout_secs: default_lock_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            alert: AlertConfig::default(),
            influx: InfluxConfig::default(),
            sensor: SensorConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl BaromonConfig {
    /// Loads `path`, falling back to defaults when the file does not exist,
    /// then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse config file '{}'", path.display()))?
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment variables take precedence over the file for endpoints
    /// and secrets. `lookup` is `std::env::var` outside of tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BAROMON_DATA_DIR") {
            self.data_dir = v;
        }
        if let Some(v) = get("BME680_URL") {
            self.sensor.url = v;
        }
        if let Some(v) = get("INFLUXDB_URL") {
            self.influx.url = v;
        }
        if let Some(v) = get("INFLUX_TOKEN") {
            self.influx.token = v;
        }
        if let Some(v) = get("INFLUX_ORG") {
            self.influx.org = v;
        }
        if let Some(v) = get("INFLUX_BUCKET") {
            self.influx.bucket = v;
        }

        let token = get("LINE_CHANNEL_ACCESS_TOKEN");
        let user_ids = get("LINE_USER_IDS");
        if token.is_some() || user_ids.is_some() {
            let line = self.notify.line.get_or_insert_with(LineSection::default);
            if let Some(token) = token {
                line.access_token = token;
            }
            if let Some(ids) = user_ids {
                line.user_ids = ids.split(',').map(|s| s.trim().to_string()).collect();
            }
        }
    }

    pub fn alert_policy(&self) -> Result<AlertPolicy> {
        let alert = &self.alert;
        let utc_offset: FixedOffset = alert
            .utc_offset
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid alert.utc_offset '{}': {e}", alert.utc_offset))?;
        let start = parse_time_of_day(&alert.quiet_start).context("Invalid alert.quiet_start")?;
        let end = parse_time_of_day(&alert.quiet_end).context("Invalid alert.quiet_end")?;

        if !alert.drop_threshold_hpa.is_finite() || alert.drop_threshold_hpa < 0.0 {
            anyhow::bail!(
                "alert.drop_threshold_hpa must be a non-negative number, got {}",
                alert.drop_threshold_hpa
            );
        }
        if alert.cooldown_secs < 0 {
            anyhow::bail!("alert.cooldown_secs must not be negative");
        }
        let cooldown = Duration::try_seconds(alert.cooldown_secs).ok_or_else(|| {
            anyhow::anyhow!("alert.cooldown_secs {} is out of range", alert.cooldown_secs)
        })?;

        Ok(AlertPolicy {
            drop_threshold_hpa: alert.drop_threshold_hpa,
            quiet_hours: QuietHoursWindow::new(start, end, utc_offset),
            cooldown: CooldownTracker::new(cooldown),
        })
    }

    pub fn influx_settings(&self) -> Result<InfluxSettings> {
        let influx = &self.influx;
        for (key, value) in [
            ("influx.url", &influx.url),
            ("influx.org", &influx.org),
            ("influx.bucket", &influx.bucket),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{key} is not configured");
            }
        }
        if influx.lookback_secs <= 0 {
            anyhow::bail!("influx.lookback_secs must be positive, got {}", influx.lookback_secs);
        }
        if influx.tolerance_secs < 0 {
            anyhow::bail!("influx.tolerance_secs must not be negative, got {}", influx.tolerance_secs);
        }
        if influx.tolerance_secs >= influx.lookback_secs {
            anyhow::bail!("influx.tolerance_secs must be smaller than influx.lookback_secs");
        }
        if Duration::try_seconds(influx.lookback_secs).is_none() {
            anyhow::bail!("influx.lookback_secs {} is out of range", influx.lookback_secs);
        }
        Ok(InfluxSettings {
            url: influx.url.clone(),
            token: influx.token.clone(),
            org: influx.org.clone(),
            bucket: influx.bucket.clone(),
            measurement: influx.measurement.clone(),
            field: influx.field.clone(),
            lookback_secs: influx.lookback_secs,
            tolerance_secs: influx.tolerance_secs,
            timeout_secs: self.http_timeout_secs,
        })
    }

    pub fn sensor_url(&self) -> Result<&str> {
        if self.sensor.url.trim().is_empty() {
            anyhow::bail!("sensor.url is not configured");
        }
        Ok(&self.sensor.url)
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| anyhow::anyhow!("'{s}' is not a time of day: {e}"))
}
