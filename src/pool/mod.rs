// src/pool/mod.rs
//! Pool lifecycle: refresh (fetch → dedup → backfill → cap) and age-based cleanup.

pub mod store;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{BrushError, BrushResult};
use crate::ingest::config::{FeedsCache, FeedsConfig};
use crate::ingest::types::ArticleSource;
use crate::ingest::{article_from_feed, normalize_url};
use crate::model::{ContentItem, ContentPool, PoolStats};

pub use store::PoolStore;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pool_refresh_runs_total", "Completed pool refreshes.");
        describe_counter!("pool_fetch_attempts_total", "Per-source fetch attempts.");
        describe_counter!(
            "pool_fetch_errors_total",
            "Per-source fetch failures and timeouts."
        );
        describe_counter!(
            "pool_dedup_total",
            "Fetched articles dropped as duplicate URLs."
        );
        describe_counter!(
            "pool_fallback_items_total",
            "Articles carried over from the previous snapshot."
        );
        describe_counter!(
            "pool_cleanup_removed_total",
            "Articles evicted by retention cleanup."
        );
        describe_gauge!("pool_size", "Articles in the current snapshot.");
    });
}

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub min: usize,
    pub max: usize,
    pub timeout: Duration,
    /// Preferred priority category; see [`FeedsConfig::priority_category`].
    pub priority_category: Option<String>,
    /// Written into the snapshot as `min_threshold`.
    pub low_water: usize,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            min: 10,
            max: 20,
            timeout: Duration::from_secs(8),
            priority_category: None,
            low_water: 5,
        }
    }
}

impl From<&AppConfig> for RefreshOptions {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            min: cfg.pool_min,
            max: cfg.pool_max,
            timeout: cfg.fetch_timeout,
            priority_category: cfg.priority_category.clone(),
            low_water: cfg.pool_low_water,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub pool_size: usize,
    pub stats: PoolStats,
    pub last_refresh: DateTime<Utc>,
    pub sample_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed: usize,
    pub remaining: usize,
}

/// Identity used for dedup: the normalized URL, or the item key for URL-less cards.
fn dedup_key(item: &ContentItem) -> String {
    match item.url.as_deref().and_then(normalize_url) {
        Some(u) => u,
        None => format!("key:{}", item.item_key),
    }
}

/// Articles fetched by one refresh pass, deduplicated and capped at `max`.
#[derive(Debug, Default)]
pub struct FetchRound {
    articles: Vec<ContentItem>,
    seen: HashSet<String>,
    stats: PoolStats,
}

/// Walk the feeds in fetch order, one entry per source.
///
/// Never fails: a source that errors or times out is counted as attempted and skipped.
pub async fn fetch_round(
    feeds: &FeedsConfig,
    source: &dyn ArticleSource,
    opts: &RefreshOptions,
    now: DateTime<Utc>,
) -> FetchRound {
    ensure_metrics_described();

    let max = opts.max.max(1);
    let priority = feeds.priority_category(opts.priority_category.as_deref());

    let mut articles: Vec<ContentItem> = Vec::with_capacity(max);
    let mut seen: HashSet<String> = HashSet::new();
    let mut stats = PoolStats::default();

    'categories: for (category, sources) in feeds.fetch_order(priority) {
        for src in sources {
            if articles.len() >= max {
                break 'categories;
            }
            if src.url.is_empty() {
                continue;
            }

            stats.attempted_sources += 1;
            counter!("pool_fetch_attempts_total").increment(1);

            let raw = match tokio::time::timeout(opts.timeout, source.fetch_one(&src.url)).await {
                Ok(Ok(Some(raw))) => raw,
                Ok(Ok(None)) => {
                    debug!(%category, feed = %src.url, "feed had no entries");
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(error = ?e, %category, feed = %src.url, source = source.name(), "fetch failed");
                    counter!("pool_fetch_errors_total").increment(1);
                    continue;
                }
                Err(_) => {
                    warn!(%category, feed = %src.url, timeout_ms = opts.timeout.as_millis() as u64, "fetch timed out");
                    counter!("pool_fetch_errors_total").increment(1);
                    continue;
                }
            };
            stats.successful_fetches += 1;

            let item = article_from_feed(category, src, raw, now);
            if !seen.insert(dedup_key(&item)) {
                stats.duplicates_skipped += 1;
                counter!("pool_dedup_total").increment(1);
                debug!(%category, url = item.link(), "duplicate url skipped");
                continue;
            }
            articles.push(item);
        }
    }

    FetchRound { articles, seen, stats }
}

/// Build the next snapshot from a fetch round, backfilling from `previous` when short.
pub fn merge_round(
    round: FetchRound,
    previous: &ContentPool,
    opts: &RefreshOptions,
    now: DateTime<Utc>,
) -> ContentPool {
    let FetchRound {
        mut articles,
        mut seen,
        mut stats,
    } = round;
    let max = opts.max.max(1);
    let min = opts.min.min(max);

    if articles.len() < min {
        for old in &previous.articles {
            if articles.len() >= min {
                break;
            }
            let mut item = old.clone();
            item.url = item.url.as_deref().and_then(normalize_url);
            if !seen.insert(dedup_key(&item)) {
                continue;
            }
            item.fetched_at.get_or_insert(now);
            articles.push(item);
            stats.fallback_items += 1;
        }
        counter!("pool_fallback_items_total").increment(stats.fallback_items as u64);
    }

    articles.truncate(max);
    stats.deduped_articles = articles.len();

    ContentPool {
        pool_size: articles.len(),
        articles,
        last_refresh: Some(now),
        last_cleanup: previous.last_cleanup,
        min_threshold: opts.low_water,
        max_size: max,
        stats: Some(stats),
    }
}

/// Drop every article whose best timestamp is missing or older than `now - days`.
pub fn cleanup_at(pool: &ContentPool, days: i64, now: DateTime<Utc>) -> (ContentPool, CleanupReport) {
    // A window reaching past the representable range keeps every dated article.
    let cutoff = chrono::Duration::try_days(days.max(0))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let before = pool.articles.len();
    let articles: Vec<ContentItem> = pool
        .articles
        .iter()
        .filter(|a| a.best_timestamp().is_some_and(|ts| ts >= cutoff))
        .cloned()
        .collect();

    let report = CleanupReport {
        removed: before - articles.len(),
        remaining: articles.len(),
    };
    let next = ContentPool {
        pool_size: articles.len(),
        articles,
        last_cleanup: Some(now),
        ..pool.clone()
    };
    (next, report)
}

/// Owns the pool jobs: one refresh and one cleanup may run at a time in this process.
pub struct PoolManager {
    store: PoolStore,
    feeds: Arc<FeedsCache>,
    source: Arc<dyn ArticleSource>,
    opts: RefreshOptions,
    refresh_lock: tokio::sync::Mutex<()>,
    cleanup_lock: tokio::sync::Mutex<()>,
}

impl PoolManager {
    pub fn new(
        store: PoolStore,
        feeds: Arc<FeedsCache>,
        source: Arc<dyn ArticleSource>,
        opts: RefreshOptions,
    ) -> Self {
        Self {
            store,
            feeds,
            source,
            opts,
            refresh_lock: tokio::sync::Mutex::new(()),
            cleanup_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &PoolStore {
        &self.store
    }

    pub fn options(&self) -> &RefreshOptions {
        &self.opts
    }

    pub fn snapshot(&self) -> ContentPool {
        self.store.load()
    }

    /// Fetch, then merge into the current snapshot and replace it atomically.
    ///
    /// Fetching runs without the store's write lock; only the merge holds it. Fails only when the feed configuration cannot be read, the snapshot cannot be written,
    /// or another refresh is already running.
    pub async fn refresh(&self) -> BrushResult<RefreshReport> {
        let _guard = self
            .refresh_lock
            .try_lock()
            .map_err(|_| BrushError::Busy("refresh"))?;

        let feeds = self.feeds.current()?;
        let now = Utc::now();
        let round = fetch_round(&feeds, self.source.as_ref(), &self.opts, now).await;

        let merged = self.store.update(|pool| {
            let next = merge_round(round, pool, &self.opts, now);
            let summary = (
                next.pool_size,
                next.stats.unwrap_or_default(),
                next.articles.first().map(|a| a.title.clone()),
            );
            *pool = next;
            Some(summary)
        })?;
        let (pool_size, stats, sample_title) = merged.unwrap_or_default();

        counter!("pool_refresh_runs_total").increment(1);
        gauge!("pool_size").set(pool_size as f64);
        info!(
            target: "pool",
            size = pool_size,
            attempted = stats.attempted_sources,
            fetched = stats.successful_fetches,
            duplicates = stats.duplicates_skipped,
            fallback = stats.fallback_items,
            "pool refreshed"
        );

        Ok(RefreshReport {
            pool_size,
            stats,
            last_refresh: now,
            sample_title,
        })
    }

    pub async fn cleanup(&self, days: i64) -> BrushResult<CleanupReport> {
        ensure_metrics_described();
        let _guard = self
            .cleanup_lock
            .try_lock()
            .map_err(|_| BrushError::Busy("cleanup"))?;

        let now = Utc::now();
        let report = self
            .store
            .update(|pool| {
                let (next, report) = cleanup_at(pool, days, now);
                *pool = next;
                Some(report)
            })?
            .unwrap_or(CleanupReport {
                removed: 0,
                remaining: 0,
            });

        counter!("pool_cleanup_removed_total").increment(report.removed as u64);
        gauge!("pool_size").set(report.remaining as f64);
        info!(target: "pool", removed = report.removed, remaining = report.remaining, days, "pool cleaned");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(key: &str, url: Option<&str>, ts: Option<DateTime<Utc>>) -> ContentItem {
        ContentItem {
            item_key: key.into(),
            title: key.into(),
            summary: String::new(),
            url: url.map(str::to_string),
            source: "s".into(),
            tags: vec![],
            category: "ai_ml".into(),
            fetched_at: ts,
            published_at: None,
            recommended_count: 0,
        }
    }

    #[test]
    fn cleanup_drops_old_and_undated() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let pool = ContentPool {
            articles: vec![
                item("fresh", Some("https://a.test/1"), Some(now - chrono::Duration::days(1))),
                item("edge", Some("https://a.test/2"), Some(now - chrono::Duration::days(7))),
                item("old", Some("https://a.test/3"), Some(now - chrono::Duration::days(8))),
                item("undated", Some("https://a.test/4"), None),
            ],
            pool_size: 4,
            ..ContentPool::default()
        };
        let (next, report) = cleanup_at(&pool, 7, now);
        assert_eq!(report, CleanupReport { removed: 2, remaining: 2 });
        let keys: Vec<&str> = next.articles.iter().map(|a| a.item_key.as_str()).collect();
        assert_eq!(keys, vec!["fresh", "edge"]);
        assert_eq!(next.articles[0], pool.articles[0]);
        assert_eq!(next.pool_size, 2);
        assert_eq!(next.last_cleanup, Some(now));
    }

    #[test]
    fn huge_retention_window_keeps_dated_articles() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let pool = ContentPool {
            articles: vec![
                item("ancient", Some("https://a.test/1"), Some(now - chrono::Duration::days(3650))),
                item("undated", Some("https://a.test/2"), None),
            ],
            pool_size: 2,
            ..ContentPool::default()
        };
        for days in [100_000_000, i64::MAX] {
            let (next, report) = cleanup_at(&pool, days, now);
            assert_eq!(report, CleanupReport { removed: 1, remaining: 1 });
            assert_eq!(next.articles[0].item_key, "ancient");
        }
        let (_, report) = cleanup_at(&ContentPool::default(), 100_000_000, Utc::now());
        assert_eq!(report, CleanupReport { removed: 0, remaining: 0 });
    }

    #[test]
    fn dedup_key_prefers_normalized_url() {
        let a = item("a", Some("https://A.test/x/"), None);
        let b = item("b", Some("https://a.test/x#frag"), None);
        let c = item("c", None, None);
        assert_eq!(dedup_key(&a), dedup_key(&b));
        assert_eq!(dedup_key(&c), "key:c");
    }
}
