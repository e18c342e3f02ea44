use crate::error::{NotifyError, Result};
use crate::NotificationChannel;
use tracing;

/// Per-channel outcome of one delivery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    /// `(channel type, error message)`
    pub failed: Vec<(String, String)>,
}

pub struct NotificationManager {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationManager {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// Sends `message` to every channel.
    ///
    /// Succeeds when at least one channel accepted the message; partial
    /// failures are logged and listed in the report.
    pub async fn notify(&self, message: &str) -> Result<DeliveryReport> {
        if self.channels.is_empty() {
            return Err(NotifyError::DeliveryFailed(
                "no notification channels configured".to_string(),
            ));
        }

        let mut report = DeliveryReport::default();
        for channel in &self.channels {
            match channel.send(message).await {
                Ok(()) => {
                    tracing::info!(channel = channel.channel_type(), "Notification delivered");
                    report.delivered.push(channel.channel_type().to_string());
                }
                Err(e) => {
                    tracing::error!(
                        channel = channel.channel_type(),
                        error = %e,
                        "Failed to send notification"
                    );
                    report
                        .failed
                        .push((channel.channel_type().to_string(), e.to_string()));
                }
            }
        }

        if report.delivered.is_empty() {
            let summary = report
                .failed
                .iter()
                .map(|(channel, err)| format!("{channel}: {err}"))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(NotifyError::DeliveryFailed(summary));
        }
        Ok(report)
    }
}
