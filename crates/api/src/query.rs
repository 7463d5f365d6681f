//! Metadata-driven stream discovery.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::pagination::Paginator;
use shoutout_core::{FilterCriteria, ObservedStream};
use std::collections::HashSet;
use tracing::warn;

/// Composes paginated stream fetches across the tag and keyword filter
/// dimensions and merges the results by channel id.
pub struct StreamQuery<'a> {
    client: &'a ApiClient,
}

impl<'a> StreamQuery<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Fetch the candidate list for `game_ids` once, filter it by tag
    /// membership and by keyword title match concurrently, and union the two
    /// with first-seen-wins dedup. Tag matches are concatenated first, so
    /// when a stream matches both dimensions the tag copy wins.
    pub async fn by_metadata(
        &self,
        game_ids: &[String],
        criteria: &FilterCriteria,
    ) -> Result<Vec<ObservedStream>, ApiError> {
        let raw = Paginator::new(self.client).fetch_streams(game_ids).await?;
        let candidates: Vec<ObservedStream> = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(stream) => Some(stream),
                Err(error) => {
                    warn!(%error, "skipping malformed stream entry");
                    None
                }
            })
            .collect();

        // The two filters have no ordering dependency; fan out and join
        // before deduping.
        let (tag_matches, keyword_matches) = tokio::join!(
            filter_by_tags(&candidates, &criteria.tag_ids),
            filter_by_keywords(&candidates, &criteria.keywords),
        );

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for stream in tag_matches.into_iter().chain(keyword_matches) {
            if seen.insert(stream.channel_id.clone()) {
                merged.push(stream);
            }
        }
        Ok(merged)
    }
}

async fn filter_by_tags(streams: &[ObservedStream], tag_ids: &[String]) -> Vec<ObservedStream> {
    streams
        .iter()
        .filter(|stream| matches_tags(stream, tag_ids))
        .cloned()
        .collect()
}

async fn filter_by_keywords(
    streams: &[ObservedStream],
    keywords: &[String],
) -> Vec<ObservedStream> {
    streams
        .iter()
        .filter(|stream| matches_keywords(stream, keywords))
        .cloned()
        .collect()
}

/// True if the stream carries any of the wanted tag ids. A stream with no
/// tags recorded never matches.
pub fn matches_tags(stream: &ObservedStream, tag_ids: &[String]) -> bool {
    let Some(tags) = &stream.tag_ids else {
        return false;
    };
    tags.iter()
        .any(|tag| tag_ids.iter().any(|wanted| wanted.eq_ignore_ascii_case(tag)))
}

/// True if the title contains any keyword, case-insensitively. A stream with
/// no title recorded never matches.
pub fn matches_keywords(stream: &ObservedStream, keywords: &[String]) -> bool {
    let Some(title) = &stream.title else {
        return false;
    };
    let title = title.to_lowercase();
    keywords
        .iter()
        .any(|keyword| title.contains(&keyword.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stream(id: &str, title: Option<&str>, tags: Option<Vec<&str>>) -> ObservedStream {
        ObservedStream {
            channel_id: id.into(),
            channel_name: id.into(),
            title: title.map(str::to_string),
            game_id: None,
            tag_ids: tags.map(|tags| tags.into_iter().map(str::to_string).collect()),
            viewer_count: 0,
            started_at: None,
        }
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let s = stream("1", Some("Chill SPEEDRUN Sunday"), None);
        assert!(matches_keywords(&s, &["speedrun".to_string()]));
        assert!(!matches_keywords(&s, &["casual".to_string()]));
    }

    #[test]
    fn missing_title_and_tags_never_match() {
        let s = stream("1", None, None);
        assert!(!matches_keywords(&s, &["anything".to_string()]));
        assert!(!matches_tags(&s, &["tag-a".to_string()]));
    }

    #[test]
    fn tag_match_intersects() {
        let s = stream("1", None, Some(vec!["tag-a", "tag-b"]));
        assert!(matches_tags(&s, &["tag-b".to_string()]));
        assert!(!matches_tags(&s, &["tag-c".to_string()]));
        assert_eq!(matches_tags(&s, &[]), false);
    }
}
