//! Cursor-following pagination over Helix list endpoints.

use crate::client::{ApiClient, ApiResponse};
use crate::error::ApiError;
use serde_json::Value;
use tracing::warn;

/// Page size requested from the stream listing endpoint.
pub const STREAM_PAGE_SIZE: usize = 100;

/// One decoded page: the data array plus the continuation cursor, if any.
#[derive(Debug, Default)]
pub struct Page {
    pub data: Vec<Value>,
    pub cursor: Option<String>,
}

/// Pull `data` and `pagination.cursor` out of a list response body. An empty
/// cursor string counts as no cursor.
pub fn parse_page(body: &Value) -> Page {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let cursor = body
        .pointer("/pagination/cursor")
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_owned);
    Page { data, cursor }
}

/// Eagerly accumulates all pages of a list endpoint. Finite and
/// non-restartable; each page's request depends on the previous page's
/// cursor, so fetching is strictly sequential.
pub struct Paginator<'a> {
    client: &'a ApiClient,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Fetch every page: repeat with `after=<cursor>` while the response has
    /// both a non-empty data page and a cursor.
    pub async fn fetch_all(
        &self,
        endpoint: &str,
        base_params: &[(String, String)],
    ) -> Result<Vec<Value>, ApiError> {
        self.fetch_until(endpoint, base_params, None).await
    }

    /// Stream listing: `first=100` per page, with the extra stop rule that a
    /// short page ends the walk even when a cursor is present. Short pages
    /// are taken as end-of-results; the upstream has been seen handing out
    /// cursors past the last page.
    pub async fn fetch_streams(&self, game_ids: &[String]) -> Result<Vec<Value>, ApiError> {
        let mut params: Vec<(String, String)> = game_ids
            .iter()
            .map(|id| ("game_id".to_string(), id.clone()))
            .collect();
        params.push(("first".to_string(), STREAM_PAGE_SIZE.to_string()));
        self.fetch_until("streams", &params, Some(STREAM_PAGE_SIZE))
            .await
    }

    async fn fetch_until(
        &self,
        endpoint: &str,
        base_params: &[(String, String)],
        short_page: Option<usize>,
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = base_params.to_vec();
            if let Some(after) = &cursor {
                params.push(("after".to_string(), after.clone()));
            }

            let response = self.client.get(endpoint, &params).await?;
            let body = match response {
                ApiResponse::Json(body) => body,
                other => {
                    warn!(
                        endpoint,
                        status = other.status(),
                        "pagination stopped on non-200 response"
                    );
                    break;
                }
            };

            let page = parse_page(&body);
            let page_len = page.data.len();
            items.extend(page.data);

            if page_len == 0 || page.cursor.is_none() {
                break;
            }
            if short_page.is_some_and(|size| page_len < size) {
                break;
            }
            cursor = page.cursor;
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parse_page_extracts_data_and_cursor() {
        let body = json!({
            "data": [{"id": "1"}, {"id": "2"}],
            "pagination": {"cursor": "abc"}
        });
        let page = parse_page(&body);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn parse_page_treats_empty_cursor_as_missing() {
        let body = json!({"data": [], "pagination": {"cursor": ""}});
        let page = parse_page(&body);
        assert!(page.data.is_empty());
        assert_eq!(page.cursor, None);
    }

    #[test]
    fn parse_page_tolerates_missing_sections() {
        let page = parse_page(&json!({}));
        assert!(page.data.is_empty());
        assert_eq!(page.cursor, None);
    }
}
