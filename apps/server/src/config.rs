//! Application configuration.

use serde::{Deserialize, Serialize};
use shoutout_core::{Blacklist, FilterCriteria, Thresholds, Whitelist};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API credentials.
    pub auth: AuthSettings,
    /// Stream selection and suppression filters.
    pub filters: FilterSettings,
    /// Suppression time windows.
    pub thresholds: Thresholds,
    /// SQLite database location.
    pub database_url: String,
    /// Discord webhook for shoutout messages.
    pub discord_webhook_url: String,
    /// Public base URL the webhook hub calls back to.
    pub callback_base_url: String,
    /// Seconds between polling cycles.
    pub poll_interval_secs: u64,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auth: AuthSettings::default(),
            filters: FilterSettings::default(),
            thresholds: Thresholds::default(),
            database_url: "sqlite://shoutout.db".to_string(),
            discord_webhook_url: String::new(),
            callback_base_url: String::new(),
            poll_interval_secs: 60,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read and parse the JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Environment variables take precedence over the file, so secrets can
    /// stay out of it.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var("TWITCH_CLIENT_ID") {
            self.auth.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("TWITCH_CLIENT_SECRET") {
            self.auth.client_secret = client_secret;
        }
        if let Ok(url) = std::env::var("DISCORD_WEBHOOK_URL") {
            self.discord_webhook_url = url;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
    }
}

/// API credentials for the client-credentials flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub client_id: String,
    pub client_secret: String,
}

/// Stream filters as written in the config file. Game and tag names are
/// resolved to ids at startup and merged into the id lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Game names to resolve via the games lookup.
    pub game_names: Vec<String>,
    /// Game ids used as-is.
    pub game_ids: Vec<String>,
    /// Tag names to resolve against the tag catalog.
    pub tag_names: Vec<String>,
    /// Tag ids used as-is.
    pub tag_ids: Vec<String>,
    /// Title keywords, matched case-insensitively.
    pub keywords: Vec<String>,
    pub blacklist: Blacklist,
    /// Channel logins to resolve and add to the whitelist.
    pub whitelist_logins: Vec<String>,
    pub whitelist: Whitelist,
}

impl FilterSettings {
    /// Criteria from the id-based fields only; name resolution extends the
    /// result at startup.
    pub fn to_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            game_ids: self.game_ids.clone(),
            tag_ids: self.tag_ids.clone(),
            keywords: self.keywords.clone(),
            blacklist: self.blacklist.clone(),
            whitelist: self.whitelist.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.thresholds.reconnect_minutes, 5);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "auth": {"client_id": "abc"},
                "filters": {"game_names": ["Deep Rock Galactic"], "keywords": ["speedrun"]},
                "poll_interval_secs": 30
            }"#,
        )
        .unwrap();
        assert_eq!(config.auth.client_id, "abc");
        assert!(config.auth.client_secret.is_empty());
        assert_eq!(config.filters.game_names, vec!["Deep Rock Galactic"]);
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.thresholds.shoutout_hours, 6);
    }

    #[test]
    fn filters_convert_to_criteria() {
        let filters = FilterSettings {
            game_ids: vec!["123".to_string()],
            tag_ids: vec!["tag-a".to_string()],
            keywords: vec!["speedrun".to_string()],
            ..FilterSettings::default()
        };
        let criteria = filters.to_criteria();
        assert_eq!(criteria.game_ids, vec!["123"]);
        assert_eq!(criteria.tag_ids, vec!["tag-a"]);
        assert_eq!(criteria.keywords, vec!["speedrun"]);
    }

    #[test]
    fn config_serialization_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.poll_interval_secs, config.poll_interval_secs);
        assert_eq!(parsed.database_url, config.database_url);
    }

    #[test]
    fn load_reads_a_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"poll_interval_secs": 15}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval_secs, 15);

        assert!(AppConfig::load(dir.path().join("missing.json")).is_err());
    }
}
