//! Observed streams, persisted channel records, and the patch type that
//! lifecycle transitions apply to records.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// The platform's current-truth view of a live channel, as returned by the
/// stream listing endpoint. Produced once per polling cycle and consumed by
/// the lifecycle engine; never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedStream {
    /// Channel id (`user_id` on the wire). Unique key for everything.
    #[serde(rename = "user_id")]
    pub channel_id: CompactString,
    /// Display name (`user_name` on the wire).
    #[serde(rename = "user_name")]
    pub channel_name: CompactString,
    /// Stream title. Channels occasionally have none recorded.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub game_id: Option<CompactString>,
    /// Tag ids attached to the stream. Absent for untagged streams.
    #[serde(default)]
    pub tag_ids: Option<Vec<String>>,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// One persisted row per tracked channel.
///
/// Invariant: `is_live == true` implies `offline_since == None`;
/// `is_live == false` implies `offline_since` is set, or `None` only if the
/// channel has never been observed live. Records are never deleted by the
/// core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub channel_id: CompactString,
    pub channel_name: CompactString,
    pub is_live: bool,
    /// When the last successful shoutout for this channel went out.
    pub last_shoutout_at: Option<DateTime<Utc>>,
    /// When the channel was last seen going offline.
    pub offline_since: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub game_id: Option<CompactString>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

impl StreamRecord {
    /// Build the record for a channel's first-ever observation. The channel
    /// is live by definition; `shouted_at` is set when the initial shoutout
    /// succeeded.
    pub fn first_observation(stream: &ObservedStream, shouted_at: Option<DateTime<Utc>>) -> Self {
        Self {
            channel_id: stream.channel_id.clone(),
            channel_name: stream.channel_name.clone(),
            is_live: true,
            last_shoutout_at: shouted_at,
            offline_since: None,
            title: stream.title.clone(),
            game_id: stream.game_id.clone(),
            tag_ids: stream.tag_ids.clone().unwrap_or_default(),
        }
    }

    /// Apply a patch, field by field. Fields the patch leaves as `None` keep
    /// their current value.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(name) = &patch.channel_name {
            self.channel_name = name.clone();
        }
        if let Some(is_live) = patch.is_live {
            self.is_live = is_live;
        }
        if let Some(offline_since) = patch.offline_since {
            self.offline_since = offline_since;
        }
        if let Some(at) = patch.last_shoutout_at {
            self.last_shoutout_at = Some(at);
        }
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(game_id) = &patch.game_id {
            self.game_id = game_id.clone();
        }
        if let Some(tag_ids) = &patch.tag_ids {
            self.tag_ids = tag_ids.clone();
        }
    }
}

/// Explicit, typed patch listing exactly the fields a lifecycle transition
/// may mutate. Nullable record fields use a nested `Option`: the outer level
/// is "touch this field at all", the inner level is the new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub channel_name: Option<CompactString>,
    pub is_live: Option<bool>,
    pub offline_since: Option<Option<DateTime<Utc>>>,
    /// Only ever moves forward; a patch cannot clear a recorded shoutout.
    pub last_shoutout_at: Option<DateTime<Utc>>,
    pub title: Option<Option<String>>,
    pub game_id: Option<Option<CompactString>>,
    pub tag_ids: Option<Vec<String>>,
}

impl RecordPatch {
    /// Patch for a channel observed live: mark live, clear `offline_since`,
    /// refresh last-seen metadata.
    pub fn went_live(stream: &ObservedStream) -> Self {
        Self {
            channel_name: Some(stream.channel_name.clone()),
            is_live: Some(true),
            offline_since: Some(None),
            last_shoutout_at: None,
            title: Some(stream.title.clone()),
            game_id: Some(stream.game_id.clone()),
            tag_ids: Some(stream.tag_ids.clone().unwrap_or_default()),
        }
    }

    /// Patch for a channel that disappeared from the observation set.
    pub fn went_offline(at: DateTime<Utc>) -> Self {
        Self {
            is_live: Some(false),
            offline_since: Some(Some(at)),
            ..Self::default()
        }
    }

    /// Record a successful shoutout at `at`.
    pub fn with_shoutout(mut self, at: DateTime<Utc>) -> Self {
        self.last_shoutout_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn observed(id: &str) -> ObservedStream {
        ObservedStream {
            channel_id: id.into(),
            channel_name: "SomeStreamer".into(),
            title: Some("Speedrunning all night".to_string()),
            game_id: Some("33214".into()),
            tag_ids: Some(vec!["tag-a".to_string()]),
            viewer_count: 42,
            started_at: None,
        }
    }

    #[test]
    fn first_observation_is_live_without_offline_since() {
        let record = StreamRecord::first_observation(&observed("123"), None);
        assert!(record.is_live);
        assert_eq!(record.offline_since, None);
        assert_eq!(record.last_shoutout_at, None);
        assert_eq!(record.tag_ids, vec!["tag-a".to_string()]);
    }

    #[test]
    fn went_live_patch_clears_offline_since() {
        let stream = observed("123");
        let mut record = StreamRecord::first_observation(&stream, None);
        record.apply(&RecordPatch::went_offline(Utc::now()));
        assert!(!record.is_live);
        assert!(record.offline_since.is_some());

        record.apply(&RecordPatch::went_live(&stream));
        assert!(record.is_live);
        assert_eq!(record.offline_since, None);
    }

    #[test]
    fn patch_leaves_untouched_fields_alone() {
        let stream = observed("123");
        let shouted = Utc::now();
        let mut record = StreamRecord::first_observation(&stream, Some(shouted));

        record.apply(&RecordPatch::went_offline(Utc::now()));
        assert_eq!(record.last_shoutout_at, Some(shouted));
        assert_eq!(record.title, stream.title);
    }

    #[test]
    fn with_shoutout_sets_timestamp() {
        let stream = observed("123");
        let at = Utc::now();
        let mut record = StreamRecord::first_observation(&stream, None);
        record.apply(&RecordPatch::went_live(&stream).with_shoutout(at));
        assert_eq!(record.last_shoutout_at, Some(at));
    }

    #[test]
    fn observed_stream_deserializes_from_listing_payload() {
        let json = serde_json::json!({
            "id": "9001",
            "user_id": "123",
            "user_login": "somestreamer",
            "user_name": "SomeStreamer",
            "game_id": "33214",
            "type": "live",
            "title": "Speedrunning all night",
            "viewer_count": 42,
            "started_at": "2021-03-10T15:04:21Z",
            "tag_ids": ["6ea6bca4-4712-4ab9-a906-e3336a9d8039"]
        });
        let stream: ObservedStream = serde_json::from_value(json).unwrap();
        assert_eq!(stream.channel_id, "123");
        assert_eq!(stream.channel_name, "SomeStreamer");
        assert_eq!(stream.viewer_count, 42);
        assert!(stream.started_at.is_some());
    }

    #[test]
    fn observed_stream_tolerates_missing_title_and_tags() {
        let json = serde_json::json!({
            "user_id": "123",
            "user_name": "SomeStreamer"
        });
        let stream: ObservedStream = serde_json::from_value(json).unwrap();
        assert_eq!(stream.title, None);
        assert_eq!(stream.tag_ids, None);
        assert_eq!(stream.viewer_count, 0);
    }
}
