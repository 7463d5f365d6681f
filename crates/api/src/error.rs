//! Error types for platform API operations.

use thiserror::Error;

/// Errors surfaced by the API layer.
///
/// Non-200 responses are deliberately not errors: `ApiClient` hands them
/// back as `ApiResponse::Status` and callers decide their significance.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client-credentials exchange itself failed. Configuration or
    /// connectivity problem; not retried.
    #[error("token exchange failed with status {0}")]
    TokenExchange(u16),

    /// A request was rejected with 401 after the retry budget was spent.
    /// Unrecoverable without operator intervention; the binary exits on it.
    #[error("authentication rejected after retry; credentials need operator attention")]
    AuthExhausted,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// True if the process cannot make progress and should shut down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::AuthExhausted)
    }
}
