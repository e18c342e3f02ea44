use crate::config::BaromonConfig;
use crate::cycle::Watcher;
use crate::error::CycleError;
use baromon_alert::DecisionEngine;
use baromon_common::clock::SystemClock;
use baromon_notify::channels::line::LINE_API_BASE;
use baromon_notify::manager::NotificationManager;
use baromon_notify::plugin::ChannelRegistry;
use baromon_notify::NotificationChannel;
use baromon_source::influx::InfluxHistorySource;
use baromon_source::sensor::SensorApiSource;
use baromon_storage::MemoryStore;
use std::path::Path;
use std::time::Duration;
use tracing;

/// Opens the notification memory database under `config.data_dir`.
pub fn open_store(config: &BaromonConfig) -> Result<MemoryStore, CycleError> {
    let store = MemoryStore::new(
        Path::new(&config.data_dir),
        Duration::from_secs(config.lock_timeout_secs),
    )?;
    Ok(store)
}

/// Builds every configured notification channel.
///
/// The `[notify.line]` section (or the LINE environment variables) and
/// each `[[notify.channels]]` entry each contribute one channel.
pub fn build_channels(
    config: &BaromonConfig,
    registry: &ChannelRegistry,
) -> Result<Vec<Box<dyn NotificationChannel>>, CycleError> {
    let mut channels = Vec::new();

    if let Some(line) = &config.notify.line {
        let line_config = serde_json::json!({
            "access_token": line.access_token,
            "user_ids": line.user_ids,
            "api_base": line.api_base.as_deref().unwrap_or(LINE_API_BASE),
            "timeout_secs": config.http_timeout_secs,
        });
        let channel = registry
            .create_channel("line", &line_config)
            .map_err(|e| CycleError::Config(e.to_string()))?;
        channels.push(channel);
    }

    for section in &config.notify.channels {
        let channel_config = with_default_timeout(&section.config, config.http_timeout_secs);
        let channel = registry
            .create_channel(&section.channel_type, &channel_config)
            .map_err(|e| {
                CycleError::Config(format!("channel '{}': {e}", section.channel_type))
            })?;
        if let Some(plugin) = registry.get_plugin(&section.channel_type) {
            tracing::debug!(
                channel = %section.channel_type,
                config = %plugin.redact_config(&channel_config),
                "Notification channel configured"
            );
        }
        channels.push(channel);
    }

    if channels.is_empty() {
        return Err(CycleError::Config(
            "no notification channel configured (set LINE_CHANNEL_ACCESS_TOKEN and LINE_USER_IDS)"
                .to_string(),
        ));
    }
    Ok(channels)
}

/// Channels without their own `timeout_secs` share the HTTP timeout.
fn with_default_timeout(config: &serde_json::Value, timeout_secs: u64) -> serde_json::Value {
    let mut config = config.clone();
    if let Some(map) = config.as_object_mut() {
        map.entry("timeout_secs")
            .or_insert_with(|| serde_json::Value::from(timeout_secs));
    }
    config
}

/// Wires the production [`Watcher`]: InfluxDB for the historical reading,
/// the sensor API for the current one, SQLite for memory, wall clock time.
pub fn build_watcher(config: &BaromonConfig) -> Result<Watcher, CycleError> {
    let policy = config.alert_policy()?;
    let historical = InfluxHistorySource::new(config.influx_settings()?)
        .map_err(|e| CycleError::Config(e.to_string()))?;
    let current = SensorApiSource::new(config.sensor_url()?, config.http_timeout_secs)
        .map_err(|e| CycleError::Config(e.to_string()))?;
    let channels = build_channels(config, &ChannelRegistry::default())?;
    let store = open_store(config)?;

    tracing::info!(
        db = %store.db_path().display(),
        channels = channels.len(),
        threshold_hpa = policy.drop_threshold_hpa,
        "Watcher ready"
    );

    Ok(Watcher {
        engine: DecisionEngine::new(policy),
        historical: Box::new(historical),
        current: Box::new(current),
        store,
        notifier: NotificationManager::new(channels),
        clock: Box::new(SystemClock),
        message_template: config.notify.message_template.clone(),
    })
}
