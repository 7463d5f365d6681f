//! Per-run filter criteria and suppression thresholds.
//!
//! Supplied by configuration at startup; read-only to the core.

use serde::{Deserialize, Serialize};

/// Streams matching any of these are never shouted out. Suppression applies
/// to the alert only, never to state persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blacklist {
    /// Case-insensitive substrings matched against the stream title.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

/// Channels exempt from the repeat-shoutout window. They remain subject to
/// the blacklist and the reconnect-blip window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Whitelist {
    #[serde(default)]
    pub user_ids: Vec<String>,
}

/// Immutable per-run stream selection and suppression configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Game ids whose streams are candidates.
    #[serde(default)]
    pub game_ids: Vec<String>,
    /// Tag ids a candidate stream may match on.
    #[serde(default)]
    pub tag_ids: Vec<String>,
    /// Case-insensitive substrings a candidate title may match on.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub blacklist: Blacklist,
    #[serde(default)]
    pub whitelist: Whitelist,
}

/// Time windows driving alert suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// A channel back online within this many minutes is treated as a
    /// reconnect blip, not a fresh go-live.
    pub reconnect_minutes: i64,
    /// Minimum hours between repeat shoutouts for the same channel.
    pub shoutout_hours: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            reconnect_minutes: 5,
            shoutout_hours: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn thresholds_default() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.reconnect_minutes, 5);
        assert_eq!(thresholds.shoutout_hours, 6);
    }

    #[test]
    fn criteria_deserializes_with_missing_sections() {
        let criteria: FilterCriteria =
            serde_json::from_str(r#"{"game_ids": ["33214"]}"#).unwrap();
        assert_eq!(criteria.game_ids, vec!["33214".to_string()]);
        assert!(criteria.blacklist.keywords.is_empty());
        assert!(criteria.whitelist.user_ids.is_empty());
    }
}
