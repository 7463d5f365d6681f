//! Wrappers for the Helix endpoints the bot consumes.

use crate::client::{ApiClient, ApiResponse, RequestOptions};
use crate::error::ApiError;
use crate::pagination::Paginator;
use compact_str::CompactString;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Lease requested for every hub subscription.
pub const WEBHOOK_LEASE_SECONDS: u64 = 86400;

/// A game/category as returned by `/games`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Game {
    pub id: CompactString,
    pub name: String,
}

/// A user as returned by `/users`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: CompactString,
    pub login: String,
    #[serde(default)]
    pub display_name: String,
}

/// A stream tag from the `/tags/streams` catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamTag {
    pub tag_id: String,
    /// Locale code -> localized tag name, e.g. `"en-us" -> "Speedrun"`.
    #[serde(default)]
    pub localization_names: HashMap<String, String>,
}

impl StreamTag {
    /// Case-insensitive match against any localized name.
    pub fn is_named(&self, name: &str) -> bool {
        self.localization_names
            .values()
            .any(|localized| localized.eq_ignore_ascii_case(name))
    }
}

/// Endpoint-level client: lookups plus webhook hub calls.
pub struct HelixClient {
    client: ApiClient,
    callback_base: String,
}

impl HelixClient {
    pub fn new(client: ApiClient, callback_base: impl Into<String>) -> Self {
        Self {
            client,
            callback_base: callback_base.into(),
        }
    }

    /// The underlying request client, for the paginator and stream query.
    pub fn api(&self) -> &ApiClient {
        &self.client
    }

    /// Look up games by exact name.
    pub async fn games_by_name(&self, names: &[String]) -> Result<Vec<Game>, ApiError> {
        let params: Vec<(String, String)> = names
            .iter()
            .map(|name| ("name".to_string(), name.clone()))
            .collect();
        let response = self.client.get("games", &params).await?;
        decode_data("games", response)
    }

    /// Look up users by login name.
    pub async fn users_by_login(&self, logins: &[String]) -> Result<Vec<User>, ApiError> {
        let params: Vec<(String, String)> = logins
            .iter()
            .map(|login| ("login".to_string(), login.clone()))
            .collect();
        let response = self.client.get("users", &params).await?;
        decode_data("users", response)
    }

    /// Fetch the full paginated tag catalog.
    pub async fn stream_tags(&self) -> Result<Vec<StreamTag>, ApiError> {
        let raw = Paginator::new(&self.client)
            .fetch_all(
                "tags/streams",
                &[("first".to_string(), "100".to_string())],
            )
            .await?;
        let mut tags = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value(value) {
                Ok(tag) => tags.push(tag),
                Err(error) => warn!(%error, "skipping malformed tag entry"),
            }
        }
        Ok(tags)
    }

    /// List the currently active webhook subscriptions.
    pub async fn active_subscriptions(&self) -> Result<Vec<Value>, ApiError> {
        Paginator::new(&self.client)
            .fetch_all("webhooks/subscriptions", &[])
            .await
    }

    /// Subscribe to stream-change notifications for a channel. Returns
    /// whether the hub accepted the request. Repeated subscribes renew the
    /// lease upstream, so calling this on every live observation is fine.
    pub async fn subscribe_stream_changes(&self, channel_id: &str) -> Result<bool, ApiError> {
        self.hub_request(channel_id, "subscribe").await
    }

    /// Drop the stream-change subscription for a channel.
    pub async fn unsubscribe_stream_changes(&self, channel_id: &str) -> Result<bool, ApiError> {
        self.hub_request(channel_id, "unsubscribe").await
    }

    async fn hub_request(&self, channel_id: &str, mode: &str) -> Result<bool, ApiError> {
        let params = vec![
            (
                "hub.callback".to_string(),
                format!(
                    "{}/streams/{}",
                    self.callback_base.trim_end_matches('/'),
                    channel_id
                ),
            ),
            ("hub.mode".to_string(), mode.to_string()),
            (
                "hub.topic".to_string(),
                format!("https://api.twitch.tv/helix/streams?user_id={channel_id}"),
            ),
            (
                "hub.lease_seconds".to_string(),
                WEBHOOK_LEASE_SECONDS.to_string(),
            ),
        ];
        let response = self
            .client
            .request(Method::POST, "webhooks/hub", &params, RequestOptions::default())
            .await?;

        // The hub acknowledges queued requests with 202 Accepted.
        match response {
            ApiResponse::Status(202) => Ok(true),
            ApiResponse::Status(code) => {
                warn!(channel_id, code, mode, "hub request rejected");
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

fn decode_data<T: DeserializeOwned>(
    endpoint: &str,
    response: ApiResponse,
) -> Result<Vec<T>, ApiError> {
    match response {
        ApiResponse::Json(body) => {
            let Some(data) = body.get("data").cloned() else {
                return Ok(Vec::new());
            };
            Ok(serde_json::from_value(data)?)
        }
        other => {
            warn!(endpoint, status = other.status(), "lookup returned non-200");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_name_match_is_case_insensitive() {
        let tag = StreamTag {
            tag_id: "6ea6bca4".to_string(),
            localization_names: HashMap::from([
                ("en-us".to_string(), "Speedrun".to_string()),
                ("de-de".to_string(), "Speedrun".to_string()),
            ]),
        };
        assert!(tag.is_named("speedrun"));
        assert!(!tag.is_named("casual"));
    }
}
