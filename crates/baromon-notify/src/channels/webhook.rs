use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::utils::{build_client, default_timeout_secs, truncate_string, MAX_BODY_LENGTH};
use crate::NotificationChannel;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing;

const MAX_ATTEMPTS: u32 = 3;

/// Generic JSON webhook (Slack/Discord-style incoming hooks, home servers).
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    body_template: Option<String>,
}

impl WebhookChannel {
    pub fn new(url: &str, body_template: Option<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            url: url.to_string(),
            body_template,
        })
    }

    /// `{{message}}` in a custom template is replaced by the JSON-escaped
    /// message without surrounding quotes.
    pub fn render_body(&self, message: &str) -> String {
        match &self.body_template {
            Some(template) => {
                let escaped = Value::String(message.to_string()).to_string();
                // Serialized strings always carry one leading and one trailing quote.
                let inner = &escaped[1..escaped.len() - 1];
                template.replace("{{message}}", inner)
            }
            None => serde_json::json!({ "text": message }).to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, message: &str) -> Result<()> {
        let body = self.render_body(message);
        let mut last_err = None;

        for attempt in 0..MAX_ATTEMPTS {
            match self
                .client
                .post(self.url.as_str())
                .header("Content-Type", "application/json")
                .body(body.clone())
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    let resp_body = match resp.text().await {
                        Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
                        Err(e) => format!("[Failed to read response body: {e}]"),
                    };
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = %status,
                        "Webhook returned non-success status, retrying"
                    );
                    last_err = Some(NotifyError::ApiError {
                        service: "webhook".to_string(),
                        status: status.as_u16(),
                        body: resp_body,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Webhook send failed, retrying"
                    );
                    last_err = Some(e.into());
                }
            }
            if attempt + 1 < MAX_ATTEMPTS {
                tokio::time::sleep(std::time::Duration::from_millis(100 * 2u64.pow(attempt))).await;
            }
        }

        tracing::error!(url = %self.url, "Webhook failed after {MAX_ATTEMPTS} attempts");
        Err(last_err
            .unwrap_or_else(|| NotifyError::DeliveryFailed("webhook made no attempts".to_string())))
    }

    fn channel_type(&self) -> &str {
        "webhook"
    }
}

// Plugin

#[derive(Deserialize)]
struct WebhookConfig {
    url: String,
    body_template: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

pub struct WebhookPlugin;

impl WebhookPlugin {
    fn parse(config: &Value) -> Result<WebhookConfig> {
        let cfg: WebhookConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("Invalid webhook config: {e}")))?;
        if !(cfg.url.starts_with("http://") || cfg.url.starts_with("https://")) {
            return Err(NotifyError::InvalidConfig(format!(
                "webhook url must be http(s): {}",
                cfg.url
            )));
        }
        Ok(cfg)
    }
}

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        Self::parse(config).map(|_| ())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg = Self::parse(config)?;
        Ok(Box::new(WebhookChannel::new(&cfg.url, cfg.body_template, cfg.timeout_secs)?))
    }
}
