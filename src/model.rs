//! model.rs: content cards and the pooled snapshot they live in.
//!
//! Field names are the persisted names; the pool file written by the refresh job and read by
//! the ranking path must round-trip through these types without loss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recommendable card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Stable identity, see [`crate::ingest::item_key`].
    #[serde(default)]
    pub item_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Normalized URL. Older snapshots call this `link`.
    #[serde(default, alias = "link", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub source: String,
    /// Ordered, de-duplicated, case-sensitive.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recommended_count: u64,
}

impl ContentItem {
    /// Append a tag unless it is blank or already present.
    pub fn push_tag(&mut self, tag: &str) {
        let t = tag.trim().trim_start_matches('#');
        if !t.is_empty() && !self.tags.iter().any(|x| x == t) {
            self.tags.push(t.to_string());
        }
    }

    /// Published time when the feed had one, else fetch time.
    pub fn best_timestamp(&self) -> Option<DateTime<Utc>> {
        self.published_at.or(self.fetched_at)
    }

    pub fn link(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

/// Counters written alongside each refreshed snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub attempted_sources: usize,
    pub successful_fetches: usize,
    #[serde(default)]
    pub duplicates_skipped: usize,
    #[serde(default)]
    pub fallback_items: usize,
    pub deduped_articles: usize,
}

/// Snapshot of the candidate pool. Replaced wholesale by refresh, filtered by cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPool {
    #[serde(default)]
    pub articles: Vec<ContentItem>,
    #[serde(default)]
    pub last_refresh: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cleanup: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pool_size: usize,
    #[serde(default = "default_min_threshold")]
    pub min_threshold: usize,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<PoolStats>,
}

fn default_min_threshold() -> usize {
    5
}

fn default_max_size() -> usize {
    20
}

impl Default for ContentPool {
    fn default() -> Self {
        Self {
            articles: Vec::new(),
            last_refresh: None,
            last_cleanup: None,
            pool_size: 0,
            min_threshold: default_min_threshold(),
            max_size: default_max_size(),
            stats: None,
        }
    }
}

impl ContentPool {
    /// Size as seen by readers: the larger of the declared size and the actual article count.
    pub fn effective_size(&self) -> usize {
        self.articles.len().max(self.pool_size)
    }

    pub fn is_empty(&self) -> bool {
        self.effective_size() == 0
    }

    pub fn is_low(&self, low_water: usize) -> bool {
        self.effective_size() < low_water.max(1)
    }

    pub fn first_in_category(&self, category: &str) -> Option<&ContentItem> {
        self.articles.iter().find(|a| a.category == category)
    }
}
