// src/ingest/config.rs
//! Feed definitions: category name → ordered list of sources.
//!
//! Accepted shapes (category order is file order):
//! ```json
//! { "ai_ml": [ { "name": "Lab Blog", "url": "https://lab.test/rss", "site": "lab.test" } ] }
//! ```
//! ```toml
//! [[ai_ml]]
//! name = "Lab Blog"
//! url = "https://lab.test/rss"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FeedConfigError;
use crate::ingest::types::FeedSource;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedsConfig {
    categories: Vec<(String, Vec<FeedSource>)>,
}

impl FeedsConfig {
    pub fn new(categories: Vec<(String, Vec<FeedSource>)>) -> Self {
        Self { categories }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(c, _)| c.as_str())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|(c, _)| c == category)
    }

    pub fn sources(&self, category: &str) -> &[FeedSource] {
        self.categories
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, s)| s.as_slice())
            .unwrap_or(&[])
    }

    /// `preferred` wins when configured; otherwise the first category named `priority*`.
    pub fn priority_category(&self, preferred: Option<&str>) -> Option<&str> {
        if let Some(p) = preferred {
            if let Some((c, _)) = self.categories.iter().find(|(c, _)| c == p) {
                return Some(c.as_str());
            }
        }
        self.categories
            .iter()
            .map(|(c, _)| c.as_str())
            .find(|c| c.starts_with("priority"))
    }

    /// Priority category first, then the rest in configuration order.
    pub fn fetch_order(&self, priority: Option<&str>) -> Vec<(&str, &[FeedSource])> {
        let mut out: Vec<(&str, &[FeedSource])> = Vec::with_capacity(self.categories.len());
        if let Some(p) = priority {
            if let Some((c, s)) = self.categories.iter().find(|(c, _)| c == p) {
                out.push((c.as_str(), s.as_slice()));
            }
        }
        for (c, s) in &self.categories {
            if Some(c.as_str()) != priority {
                out.push((c.as_str(), s.as_slice()));
            }
        }
        out
    }
}

/// Load feeds from an explicit path. Supports JSON or TOML.
pub fn load_feeds_from(path: &Path) -> Result<FeedsConfig, FeedConfigError> {
    let content = fs::read_to_string(path).map_err(|source| FeedConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str(), path)
}

fn parse_feeds(s: &str, hint_ext: &str, path: &Path) -> Result<FeedsConfig, FeedConfigError> {
    let parse_err = |reason: String| FeedConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let root: Value = if hint_ext == "toml" {
        toml_to_json(s).map_err(parse_err)?
    } else {
        match serde_json::from_str::<Value>(s) {
            Ok(v) => v,
            Err(json_err) if hint_ext != "json" => {
                toml_to_json(s).map_err(|toml_err| parse_err(format!("{json_err}; {toml_err}")))?
            }
            Err(e) => return Err(parse_err(e.to_string())),
        }
    };

    let Value::Object(map) = root else {
        return Err(FeedConfigError::Shape {
            path: path.to_path_buf(),
            reason: "top level must map category names to source lists".into(),
        });
    };

    let mut categories = Vec::with_capacity(map.len());
    for (category, raw_sources) in map {
        let category = category.trim().to_string();
        if category.is_empty() {
            continue;
        }
        let Value::Array(list) = raw_sources else {
            warn!(%category, "feed category is not a list; skipped");
            continue;
        };
        let mut sources = Vec::with_capacity(list.len());
        for raw in list {
            match serde_json::from_value::<FeedSource>(raw) {
                Ok(mut src) => {
                    src.url = src.url.trim().to_string();
                    sources.push(src);
                }
                Err(e) => warn!(%category, error = %e, "invalid feed source; skipped"),
            }
        }
        categories.push((category, sources));
    }
    Ok(FeedsConfig::new(categories))
}

fn toml_to_json(s: &str) -> Result<Value, String> {
    let table: toml::Table = toml::from_str(s).map_err(|e| e.to_string())?;
    serde_json::to_value(table).map_err(|e| e.to_string())
}

/// Feed config cached by file modification time. Held by whoever serves commands;
/// `current()` re-reads the file only when its mtime changed.
#[derive(Debug)]
pub struct FeedsCache {
    path: PathBuf,
    inner: RwLock<Option<Cached>>,
}

#[derive(Debug)]
struct Cached {
    mtime: Option<SystemTime>,
    feeds: Arc<FeedsConfig>,
}

impl FeedsCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest feeds, reloading when the file changed. Read failures are fatal.
    pub fn current(&self) -> Result<Arc<FeedsConfig>, FeedConfigError> {
        let mtime = fs::metadata(&self.path).and_then(|m| m.modified()).ok();

        {
            let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(c) = guard.as_ref() {
                if mtime.is_some() && c.mtime == mtime {
                    return Ok(Arc::clone(&c.feeds));
                }
            }
        }

        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Double-check in case another caller reloaded meanwhile.
        if let Some(c) = guard.as_ref() {
            if mtime.is_some() && c.mtime == mtime {
                return Ok(Arc::clone(&c.feeds));
            }
        }
        let feeds = Arc::new(load_feeds_from(&self.path)?);
        debug!(path = %self.path.display(), categories = feeds.categories().count(), "feeds reloaded");
        *guard = Some(Cached {
            mtime,
            feeds: Arc::clone(&feeds),
        });
        Ok(feeds)
    }
}
