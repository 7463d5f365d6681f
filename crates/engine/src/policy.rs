//! Alert suppression policy: blacklist, whitelist, and time windows.
//!
//! All checks are free functions over explicit criteria; nothing here holds
//! state or touches I/O.

use chrono::{DateTime, Utc};
use shoutout_core::{FilterCriteria, ObservedStream, StreamRecord, Thresholds};
use tracing::warn;

/// Why a shoutout was not sent. Not an error: a deliberate policy outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Title keyword, tag, or channel id is blacklisted.
    Blacklisted,
    /// The channel came back online within the reconnect window.
    ReconnectBlip,
    /// A shoutout already went out within the repeat window.
    RecentShoutout,
}

/// True if any blacklist dimension matches: blacklisted channel id, a
/// blacklisted keyword in the title (case-insensitive substring), or a tag
/// intersection with the blacklisted tag ids.
pub fn is_blacklisted(criteria: &FilterCriteria, stream: &ObservedStream) -> bool {
    if criteria
        .blacklist
        .user_ids
        .iter()
        .any(|id| id == stream.channel_id.as_str())
    {
        return true;
    }
    if let Some(title) = &stream.title {
        let title = title.to_lowercase();
        if criteria
            .blacklist
            .keywords
            .iter()
            .any(|keyword| title.contains(&keyword.to_lowercase()))
        {
            return true;
        }
    }
    if let Some(tags) = &stream.tag_ids {
        if tags.iter().any(|tag| {
            criteria
                .blacklist
                .tag_ids
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(tag))
        }) {
            return true;
        }
    }
    false
}

/// Whitelisted channels bypass the repeat-shoutout window only.
pub fn is_whitelisted(criteria: &FilterCriteria, channel_id: &str) -> bool {
    criteria.whitelist.user_ids.iter().any(|id| id == channel_id)
}

/// Whole minutes elapsed between two instants. A negative delta (clock skew
/// or a corrupted timestamp) fails open: logged as anomalous and treated as
/// "the window has passed".
fn elapsed_minutes(channel_id: &str, earlier: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    let minutes = (now - earlier).num_minutes();
    if minutes < 0 {
        warn!(channel_id, minutes, "negative elapsed time; treating alert as due");
        return None;
    }
    Some(minutes)
}

/// Evaluate the goneLive suppression rules in order; only the first matching
/// rule applies. `None` means a shoutout is due, still subject to the
/// blacklist (which the caller checks for both the new-channel and the
/// gone-live paths).
pub fn suppress_gone_live(
    criteria: &FilterCriteria,
    thresholds: &Thresholds,
    record: &StreamRecord,
    now: DateTime<Utc>,
) -> Option<Suppression> {
    // Rule 1: back within the reconnect window means the offline period was
    // a connectivity blip, not a fresh go-live.
    if let Some(offline_since) = record.offline_since {
        if let Some(minutes) = elapsed_minutes(record.channel_id.as_str(), offline_since, now) {
            if minutes < thresholds.reconnect_minutes {
                return Some(Suppression::ReconnectBlip);
            }
        }
    }

    // Rule 2: repeat-shoutout window, bypassed for whitelisted channels.
    if !is_whitelisted(criteria, record.channel_id.as_str()) {
        if let Some(last) = record.last_shoutout_at {
            if let Some(minutes) = elapsed_minutes(record.channel_id.as_str(), last, now) {
                if minutes / 60 < thresholds.shoutout_hours {
                    return Some(Suppression::RecentShoutout);
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shoutout_core::{Blacklist, Whitelist};

    fn stream(id: &str, title: &str, tags: Vec<&str>) -> ObservedStream {
        ObservedStream {
            channel_id: id.into(),
            channel_name: id.into(),
            title: Some(title.to_string()),
            game_id: None,
            tag_ids: Some(tags.into_iter().map(str::to_string).collect()),
            viewer_count: 0,
            started_at: None,
        }
    }

    fn record(id: &str) -> StreamRecord {
        StreamRecord {
            channel_id: id.into(),
            channel_name: id.into(),
            is_live: false,
            last_shoutout_at: None,
            offline_since: None,
            title: None,
            game_id: None,
            tag_ids: Vec::new(),
        }
    }

    fn criteria_with_blacklist(blacklist: Blacklist) -> FilterCriteria {
        FilterCriteria {
            blacklist,
            ..FilterCriteria::default()
        }
    }

    #[test]
    fn blacklist_matches_title_keyword_case_insensitively() {
        let criteria = criteria_with_blacklist(Blacklist {
            keywords: vec!["GIVEAWAY".to_string()],
            ..Blacklist::default()
        });
        assert!(is_blacklisted(&criteria, &stream("1", "big giveaway night", vec![])));
        assert!(!is_blacklisted(&criteria, &stream("1", "chill run", vec![])));
    }

    #[test]
    fn blacklist_matches_tags_and_user_ids() {
        let criteria = criteria_with_blacklist(Blacklist {
            tag_ids: vec!["tag-x".to_string()],
            user_ids: vec!["666".to_string()],
            ..Blacklist::default()
        });
        assert!(is_blacklisted(&criteria, &stream("1", "ok", vec!["tag-x"])));
        assert!(is_blacklisted(&criteria, &stream("666", "ok", vec![])));
        assert!(!is_blacklisted(&criteria, &stream("1", "ok", vec!["tag-y"])));
    }

    #[test]
    fn reconnect_blip_suppresses_within_the_window() {
        let now = Utc::now();
        let mut rec = record("1");
        rec.offline_since = Some(now - Duration::minutes(3));

        let thresholds = Thresholds {
            reconnect_minutes: 5,
            shoutout_hours: 6,
        };
        assert_eq!(
            suppress_gone_live(&FilterCriteria::default(), &thresholds, &rec, now),
            Some(Suppression::ReconnectBlip)
        );

        rec.offline_since = Some(now - Duration::minutes(10));
        assert_eq!(
            suppress_gone_live(&FilterCriteria::default(), &thresholds, &rec, now),
            None
        );
    }

    #[test]
    fn recent_shoutout_suppresses_unless_whitelisted() {
        let now = Utc::now();
        let mut rec = record("1");
        rec.last_shoutout_at = Some(now - Duration::hours(2));

        let thresholds = Thresholds {
            reconnect_minutes: 5,
            shoutout_hours: 6,
        };
        assert_eq!(
            suppress_gone_live(&FilterCriteria::default(), &thresholds, &rec, now),
            Some(Suppression::RecentShoutout)
        );

        let whitelisted = FilterCriteria {
            whitelist: Whitelist {
                user_ids: vec!["1".to_string()],
            },
            ..FilterCriteria::default()
        };
        assert_eq!(suppress_gone_live(&whitelisted, &thresholds, &rec, now), None);
    }

    #[test]
    fn shoutout_older_than_the_window_is_due_again() {
        let now = Utc::now();
        let mut rec = record("1");
        rec.last_shoutout_at = Some(now - Duration::hours(7));

        let thresholds = Thresholds {
            reconnect_minutes: 5,
            shoutout_hours: 6,
        };
        assert_eq!(
            suppress_gone_live(&FilterCriteria::default(), &thresholds, &rec, now),
            None
        );
    }

    #[test]
    fn negative_elapsed_time_fails_open() {
        let now = Utc::now();
        let mut rec = record("1");
        // Timestamps from the future: corrupted or skewed clocks.
        rec.offline_since = Some(now + Duration::minutes(30));
        rec.last_shoutout_at = Some(now + Duration::hours(1));

        let thresholds = Thresholds {
            reconnect_minutes: 5,
            shoutout_hours: 6,
        };
        assert_eq!(
            suppress_gone_live(&FilterCriteria::default(), &thresholds, &rec, now),
            None
        );
    }

    #[test]
    fn whitelist_does_not_bypass_the_reconnect_window() {
        let now = Utc::now();
        let mut rec = record("1");
        rec.offline_since = Some(now - Duration::minutes(2));

        let whitelisted = FilterCriteria {
            whitelist: Whitelist {
                user_ids: vec!["1".to_string()],
            },
            ..FilterCriteria::default()
        };
        let thresholds = Thresholds {
            reconnect_minutes: 5,
            shoutout_hours: 6,
        };
        assert_eq!(
            suppress_gone_live(&whitelisted, &thresholds, &rec, now),
            Some(Suppression::ReconnectBlip)
        );
    }
}
