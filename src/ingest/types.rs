// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One configured feed inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    #[serde(default)]
    pub url: String,
    /// Display name for cards; falls back to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

impl FeedSource {
    pub fn display_name(&self) -> &str {
        self.site
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.name.as_str())
    }
}

/// Latest entry of a feed, exactly as the source reported it (not yet cleaned).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    pub link: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Fetches the newest article of one feed.
///
/// `Ok(None)` means the feed parsed but had no entries. Errors are transient: the pool
/// refresh treats them exactly like `None` for the current cycle.
#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_one(&self, feed_url: &str) -> Result<Option<RawArticle>>;
    fn name(&self) -> &'static str;
}
