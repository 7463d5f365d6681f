//! Authenticated Helix request plumbing.

use crate::auth::TokenManager;
use crate::error::ApiError;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Default Helix API base.
pub const TWITCH_API_BASE: &str = "https://api.twitch.tv/helix";

/// How a 200 response body should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    Json,
    Text,
}

/// Per-request knobs. The defaults cover every normal call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub decode: DecodeMode,
    /// Extra headers appended after the standard auth/client headers.
    pub headers: Vec<(String, String)>,
    /// Remaining re-auth retries. One 401 is recovered automatically; the
    /// second is fatal.
    pub retries: u8,
    /// Skip the bearer header (the token endpoint itself).
    pub auth_exempt: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            decode: DecodeMode::Json,
            headers: Vec::new(),
            retries: 1,
            auth_exempt: false,
        }
    }
}

/// Outcome of a request. Non-200 statuses are values, not errors, so callers
/// can decide what a 404 or 202 means for them.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    Json(Value),
    Text(String),
    Status(u16),
}

impl ApiResponse {
    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The bare status code for non-200 outcomes.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiResponse::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Authenticated API client over one shared `TokenManager`.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    tokens: Arc<TokenManager>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            client_id: client_id.into(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<ApiResponse, ApiError> {
        self.request(Method::GET, endpoint, params, RequestOptions::default())
            .await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<ApiResponse, ApiError> {
        self.request(Method::POST, endpoint, params, RequestOptions::default())
            .await
    }

    /// Issue one logical request. On 401 the cached token is invalidated and
    /// the request re-issued with a fresh token, at most `options.retries`
    /// times; the loop is bounded, never recursive.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let mut retries = options.retries;

        loop {
            let mut request = self.http.request(method.clone(), &url);

            // GET-like requests carry params in the query string (repeated
            // keys allowed); everything else sends them as a JSON body.
            if method == Method::GET || method == Method::DELETE {
                request = request.query(params);
            } else {
                let body: serde_json::Map<String, Value> = params
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                    .collect();
                request = request.json(&Value::Object(body));
            }

            request = request.header("Client-ID", &self.client_id);
            if !options.auth_exempt {
                let token = self.tokens.ensure_token().await?;
                request = request.bearer_auth(token);
            }
            for (name, value) in &options.headers {
                request = request.header(name, value);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !options.auth_exempt {
                self.tokens.invalidate().await;
                if retries == 0 {
                    error!(endpoint, "authentication rejected twice; giving up");
                    return Err(ApiError::AuthExhausted);
                }
                retries -= 1;
                debug!(endpoint, remaining = retries, "token rejected; re-authenticating");
                continue;
            }

            // Diagnostic only; backpressure is the upstream's business.
            if let Some(remaining) = response
                .headers()
                .get("ratelimit-remaining")
                .and_then(|value| value.to_str().ok())
            {
                debug!(endpoint, remaining, "rate-limit quota");
            }

            if status != StatusCode::OK {
                return Ok(ApiResponse::Status(status.as_u16()));
            }

            return match options.decode {
                DecodeMode::Json => Ok(ApiResponse::Json(response.json().await?)),
                DecodeMode::Text => Ok(ApiResponse::Text(response.text().await?)),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_carry_one_retry() {
        let options = RequestOptions::default();
        assert_eq!(options.retries, 1);
        assert!(!options.auth_exempt);
        assert_eq!(options.decode, DecodeMode::Json);
    }

    #[test]
    fn response_accessors() {
        let json = ApiResponse::Json(serde_json::json!({"data": []}));
        assert!(json.status().is_none());

        let status = ApiResponse::Status(404);
        assert_eq!(status.status(), Some(404));
        assert!(status.into_json().is_none());
    }
}
