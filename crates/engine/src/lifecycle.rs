//! Stream lifecycle reconciliation.
//!
//! One reconciliation call per polling cycle per observed channel, plus an
//! offline sweep for channels that dropped out of the observation set.
//! States: Unknown -> NewLive -> Tracked-Live <-> Tracked-Offline.

use crate::policy::{self, Suppression};
use crate::traits::{ChangeSubscriber, RecordStore, ShoutoutNotifier, StoreError};
use chrono::Utc;
use dashmap::DashMap;
use shoutout_core::{FilterCriteria, ObservedStream, RecordPatch, StreamRecord, Thresholds};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Outcome of one reconciliation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// First-ever observation of the channel.
    NewChannel { alerted: bool },
    /// Previously-known channel observed live. `suppressed` carries the
    /// first matching suppression rule, if any; `alerted == false` with no
    /// suppression means the notifier failed and was swallowed.
    Live {
        alerted: bool,
        suppressed: Option<Suppression>,
    },
}

/// Drives state transitions and their side effects: alert, subscribe,
/// persist. Channels reconcile independently and may run concurrently; a
/// per-channel mutex serializes each channel's read-modify-write against
/// itself at the store boundary.
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn ShoutoutNotifier>,
    subscriber: Arc<dyn ChangeSubscriber>,
    criteria: FilterCriteria,
    thresholds: Thresholds,
    channel_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn ShoutoutNotifier>,
        subscriber: Arc<dyn ChangeSubscriber>,
        criteria: FilterCriteria,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            store,
            notifier,
            subscriber,
            criteria,
            thresholds,
            channel_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, channel_id: &str) -> Arc<Mutex<()>> {
        self.channel_locks
            .entry(channel_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Reconcile one observed stream against its persisted record.
    pub async fn reconcile(&self, stream: &ObservedStream) -> Result<Outcome, StoreError> {
        let lock = self.lock_for(stream.channel_id.as_str());
        let _guard = lock.lock().await;

        match self.store.get(stream.channel_id.as_str()).await? {
            None => self.first_observation(stream).await,
            Some(record) => self.gone_live(stream, record).await,
        }
    }

    /// Unknown -> NewLive: alert (subject to blacklist), subscribe, persist
    /// as live.
    async fn first_observation(&self, stream: &ObservedStream) -> Result<Outcome, StoreError> {
        let now = Utc::now();
        let alerted = if policy::is_blacklisted(&self.criteria, stream) {
            debug!(channel = %stream.channel_id, "shoutout suppressed: blacklisted");
            false
        } else {
            self.try_shoutout(stream).await
        };

        self.resubscribe(stream.channel_id.as_str()).await;

        let record = StreamRecord::first_observation(stream, alerted.then_some(now));
        self.store.insert(&record).await?;
        info!(channel = %stream.channel_name, alerted, "tracking new channel");
        Ok(Outcome::NewChannel { alerted })
    }

    /// Tracked(any) -> Tracked-Live: apply the suppression rules in order,
    /// then alert if due. Live state and metadata persist regardless of the
    /// alert outcome.
    async fn gone_live(
        &self,
        stream: &ObservedStream,
        mut record: StreamRecord,
    ) -> Result<Outcome, StoreError> {
        let now = Utc::now();

        let mut suppressed =
            policy::suppress_gone_live(&self.criteria, &self.thresholds, &record, now);
        if suppressed.is_none() && policy::is_blacklisted(&self.criteria, stream) {
            suppressed = Some(Suppression::Blacklisted);
        }

        let alerted = match suppressed {
            None => self.try_shoutout(stream).await,
            Some(reason) => {
                debug!(channel = %stream.channel_id, ?reason, "shoutout suppressed");
                false
            }
        };

        self.resubscribe(stream.channel_id.as_str()).await;

        let mut patch = RecordPatch::went_live(stream);
        if alerted {
            patch = patch.with_shoutout(now);
        }
        record.apply(&patch);
        self.store.update(&record).await?;

        Ok(Outcome::Live { alerted, suppressed })
    }

    /// Tracked-Live -> Tracked-Offline for one channel.
    pub async fn mark_offline(&self, channel_id: &str) -> Result<(), StoreError> {
        let lock = self.lock_for(channel_id);
        let _guard = lock.lock().await;

        let Some(mut record) = self.store.get(channel_id).await? else {
            return Ok(());
        };
        if !record.is_live {
            return Ok(());
        }

        record.apply(&RecordPatch::went_offline(Utc::now()));
        self.store.update(&record).await?;
        info!(channel = %record.channel_name, "channel went offline");
        Ok(())
    }

    /// Mark every channel persisted as live but absent from `observed_ids`
    /// as offline. Returns the channel ids swept.
    pub async fn sweep_offline(
        &self,
        observed_ids: &HashSet<String>,
    ) -> Result<Vec<String>, StoreError> {
        let live = self.store.get_live().await?;
        let mut swept = Vec::new();
        for record in live {
            if !observed_ids.contains(record.channel_id.as_str()) {
                self.mark_offline(record.channel_id.as_str()).await?;
                swept.push(record.channel_id.to_string());
            }
        }
        Ok(swept)
    }

    async fn try_shoutout(&self, stream: &ObservedStream) -> bool {
        match self.notifier.send_shoutout(stream).await {
            Ok(()) => {
                info!(channel = %stream.channel_name, "shoutout sent");
                true
            }
            Err(error) => {
                // Delivery failures never block state persistence.
                error!(channel = %stream.channel_id, %error, "shoutout delivery failed");
                false
            }
        }
    }

    async fn resubscribe(&self, channel_id: &str) {
        // Fires on every live observation; the hub treats repeats as lease
        // renewals.
        if let Err(error) = self.subscriber.subscribe(channel_id).await {
            error!(channel_id, %error, "change subscription failed");
        }
    }
}
