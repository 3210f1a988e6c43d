// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod types;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::ingest::types::{FeedSource, RawArticle};
use crate::model::ContentItem;

pub const UNTITLED: &str = "Untitled";
pub const NO_SUMMARY: &str = "No summary yet.";

/// Normalize feed text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Cut to `max` chars, marking the cut with `...`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Canonical URL form used for identity and dedup.
///
/// Lower-cases scheme and host, strips the trailing slash of the path (the root path stays
/// `/`) and drops the fragment. The query string is kept. Unparsable input is returned
/// trimmed; blank input yields `None`.
pub fn normalize_url(raw: &str) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let Ok(mut url) = Url::parse(text) else {
        return Some(text.to_string());
    };
    url.set_fragment(None);
    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }
    Some(url.to_string())
}

/// Stable identity for a card: hash of the normalized URL, or of title, source and
/// feed when there is no URL.
pub fn item_key(url: Option<&str>, title: &str, source: &str, feed_url: &str) -> String {
    let base = match url.filter(|u| !u.is_empty()) {
        Some(u) => u.to_string(),
        None => format!("{}|{}|{}", title.trim(), source.trim(), feed_url.trim()),
    };
    let digest = Sha256::digest(base.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Tags derived from a category name: `ai_ml` → `["ai", "ml"]`.
pub fn category_tags(category: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in category.split('_').map(str::trim).filter(|p| !p.is_empty()) {
        if !out.iter().any(|t| t == part) {
            out.push(part.to_string());
        }
    }
    out
}

/// Turn a freshly fetched feed entry into a pool card.
pub fn article_from_feed(
    category: &str,
    source: &FeedSource,
    raw: RawArticle,
    fetched_at: DateTime<Utc>,
) -> ContentItem {
    let title = Some(normalize_text(&raw.title))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let summary = Some(normalize_text(&raw.summary))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_SUMMARY.to_string());
    let url = normalize_url(&raw.link);
    let source_name = source.display_name().to_string();
    let key = item_key(url.as_deref(), &title, &source_name, &source.url);

    let mut item = ContentItem {
        item_key: key,
        title,
        summary,
        url,
        source: source_name,
        tags: Vec::new(),
        category: category.to_string(),
        fetched_at: Some(fetched_at),
        published_at: raw.published_at,
        recommended_count: 0,
    };
    for t in &raw.tags {
        item.push_tag(t);
    }
    if item.tags.is_empty() {
        for t in category_tags(category) {
            item.push_tag(&t);
        }
    }
    item
}
