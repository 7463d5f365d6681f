//! App access token acquisition and caching.

use crate::error::ApiError;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Default OAuth2 client-credentials endpoint.
pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Holds the single process-wide app access token.
///
/// The token carries no local expiry; it is invalidated reactively when a
/// request comes back 401. Refreshing is intentionally not mutually
/// exclusive: two callers that both observe a missing token may both run the
/// exchange. The exchange is idempotent and the last writer wins, so the
/// race is tolerated rather than guarded.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<String>>,
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: TWITCH_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: RwLock::new(None),
        }
    }

    /// Point the exchange at a different token endpoint (tests, proxies).
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Return the cached token, or perform the client-credentials exchange
    /// and cache the result. A failed exchange propagates; it is a fatal
    /// configuration or connectivity problem, not something to retry here.
    pub async fn ensure_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }

        // The lock is not held across the exchange, so a concurrent caller
        // is never queued behind a slow refresh (documented race).
        let response = self
            .http
            .post(&self.token_url)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ApiError::TokenExchange(status.as_u16()));
        }

        let body: TokenResponse = response.json().await?;
        debug!("acquired fresh app access token");
        *self.token.write().await = Some(body.access_token.clone());
        Ok(body.access_token)
    }

    /// Drop the cached token. The next `ensure_token` call re-exchanges.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }
}
