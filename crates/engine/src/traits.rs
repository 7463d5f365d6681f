//! Collaborator interfaces the reconciler drives.
//!
//! The record store, the notification channel, and the webhook subscriber
//! are external to the engine; it only sees these traits.

use async_trait::async_trait;
use shoutout_core::{ObservedStream, StreamRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("subscription request failed: {0}")]
    Request(String),
}

/// One row per tracked channel, keyed by channel id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, channel_id: &str) -> Result<Option<StreamRecord>, StoreError>;
    async fn get_all(&self) -> Result<Vec<StreamRecord>, StoreError>;
    /// Records currently persisted as live.
    async fn get_live(&self) -> Result<Vec<StreamRecord>, StoreError>;
    async fn insert(&self, record: &StreamRecord) -> Result<(), StoreError>;
    /// Update-by-key; the full record is written.
    async fn update(&self, record: &StreamRecord) -> Result<(), StoreError>;
}

/// Outbound shoutout delivery. Failures are caught and logged by the
/// reconciler, never propagated as fatal.
#[async_trait]
pub trait ShoutoutNotifier: Send + Sync {
    async fn send_shoutout(&self, stream: &ObservedStream) -> Result<(), NotifyError>;
}

/// Stream-change webhook subscription. Subscribing is treated as an
/// idempotent lease renewal upstream.
#[async_trait]
pub trait ChangeSubscriber: Send + Sync {
    async fn subscribe(&self, channel_id: &str) -> Result<(), SubscribeError>;
}
