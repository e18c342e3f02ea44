use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::utils::{build_client, default_timeout_secs, mask_secret, truncate_string, MAX_BODY_LENGTH};
use crate::NotificationChannel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing;

pub const LINE_API_BASE: &str = "https://api.line.me";

/// LINE Messaging API push channel. One push request per user ID.
pub struct LineChannel {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
    user_ids: Vec<String>,
}

impl LineChannel {
    /// Blank user IDs are dropped and the rest trimmed.
    pub fn new(
        api_base: &str,
        access_token: &str,
        user_ids: &[String],
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            user_ids: clean_user_ids(user_ids),
        })
    }

    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    async fn push(&self, user_id: &str, message: &str) -> Result<()> {
        let payload = serde_json::json!({
            "to": user_id,
            "messages": [{ "type": "text", "text": message }],
        });

        let resp = self
            .client
            .post(format!("{}/v2/bot/message/push", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
            Err(e) => format!("[Failed to read response body: {e}]"),
        };
        tracing::info!(user_id, status = status.as_u16(), body = %body, "LINE push sent");

        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::ApiError {
                service: "line".to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn clean_user_ids(user_ids: &[String]) -> Vec<String> {
    user_ids
        .iter()
        .map(|uid| uid.trim())
        .filter(|uid| !uid.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl NotificationChannel for LineChannel {
    async fn send(&self, message: &str) -> Result<()> {
        let mut last_err = None;
        let mut failed = 0usize;

        // Every recipient gets an attempt even if an earlier one failed.
        for uid in &self.user_ids {
            if let Err(e) = self.push(uid, message).await {
                tracing::error!(user_id = %uid, error = %e, "LINE push failed");
                failed += 1;
                last_err = Some(e);
            }
        }

        match last_err {
            None => Ok(()),
            Some(e) if failed == 1 => Err(e),
            Some(e) => Err(NotifyError::DeliveryFailed(format!(
                "{failed} of {} LINE recipients failed, last error: {e}",
                self.user_ids.len()
            ))),
        }
    }

    fn channel_type(&self) -> &str {
        "line"
    }
}

// Plugin

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    pub access_token: String,
    pub user_ids: Vec<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    LINE_API_BASE.to_string()
}

pub struct LinePlugin;

impl LinePlugin {
    fn parse(config: &Value) -> Result<LineConfig> {
        let cfg: LineConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("Invalid line config: {e}")))?;
        if cfg.access_token.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("line access_token is empty".to_string()));
        }
        if clean_user_ids(&cfg.user_ids).is_empty() {
            return Err(NotifyError::InvalidConfig("line user_ids has no recipients".to_string()));
        }
        Ok(cfg)
    }
}

impl ChannelPlugin for LinePlugin {
    fn name(&self) -> &str {
        "line"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        Self::parse(config).map(|_| ())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg = Self::parse(config)?;
        Ok(Box::new(LineChannel::new(
            &cfg.api_base,
            &cfg.access_token,
            &cfg.user_ids,
            cfg.timeout_secs,
        )?))
    }

    fn redact_config(&self, config: &Value) -> Value {
        let mut redacted = config.clone();
        if let Some(token) = redacted.get_mut("access_token") {
            if let Some(s) = token.as_str() {
                *token = Value::String(mask_secret(s));
            }
        }
        redacted
    }
}
