//! Discord webhook delivery for shoutout messages.

use async_trait::async_trait;
use serde_json::json;
use shoutout_core::ObservedStream;
use shoutout_engine::{NotifyError, ShoutoutNotifier};
use tracing::debug;

/// Sends shoutout messages to a Discord webhook.
pub struct DiscordNotifier {
    http: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

/// Format a live stream as a shoutout message.
pub fn format_shoutout(stream: &ObservedStream) -> String {
    let mut msg = format!("🔴 **{}** is live!", stream.channel_name);
    if let Some(title) = &stream.title {
        msg.push_str(&format!("\n{title}"));
    }
    msg.push_str(&format!(
        "\nhttps://twitch.tv/{}",
        stream.channel_name.to_lowercase()
    ));
    msg
}

#[async_trait]
impl ShoutoutNotifier for DiscordNotifier {
    async fn send_shoutout(&self, stream: &ObservedStream) -> Result<(), NotifyError> {
        let body = json!({ "content": format_shoutout(stream) });

        let response = self
            .http
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook returned status {status}"
            )));
        }

        debug!(channel = %stream.channel_name, "shoutout delivered");
        Ok(())
    }
}
