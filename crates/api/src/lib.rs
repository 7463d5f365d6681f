//! Authenticated Twitch Helix API access.
//!
//! This crate provides the outbound half of the bot's platform integration:
//!
//! - `auth` - app access token acquisition and caching
//! - `client` - authenticated requests with a single-retry-after-reauth loop
//! - `pagination` - cursor-following accumulation over list endpoints
//! - `query` - metadata-driven stream discovery with dedup
//! - `helix` - endpoint wrappers (games, users, tags, webhook hub)

pub mod auth;
pub mod client;
pub mod error;
pub mod helix;
pub mod pagination;
pub mod query;

pub use auth::TokenManager;
pub use client::{ApiClient, ApiResponse, DecodeMode, RequestOptions};
pub use error::ApiError;
pub use helix::{Game, HelixClient, StreamTag, User};
pub use pagination::{Paginator, STREAM_PAGE_SIZE};
pub use query::StreamQuery;
