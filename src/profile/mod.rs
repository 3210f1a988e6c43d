// src/profile/mod.rs
//! Per-user state: interest affinities, capped histories, saves, learning and onboarding.

pub mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::{push_capped, push_recent_unique, trim_front};
use crate::learning::LearningState;
use crate::model::ContentItem;
use crate::onboarding::ColdStartState;
use crate::ranking::round_dp;

pub use store::ProfileStore;

pub const READ_HISTORY_LIMIT: usize = 100;
pub const SOURCE_HISTORY_LIMIT: usize = 50;
pub const SAVED_ITEMS_LIMIT: usize = 200;

/// Interest deltas applied by user feedback.
pub mod delta {
    pub const CHOOSE: f64 = 4.0;
    pub const ONBOARDING_LIKE: f64 = 3.0;
    pub const LIKE: f64 = 2.0;
    pub const SKIP: f64 = -1.0;
    pub const SAVE: f64 = 5.0;
}

/// Compact record of a saved card; feeds the knowledge score component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    #[serde(default)]
    pub item_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, alias = "url")]
    pub link: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub interest_tags: BTreeMap<String, f64>,
    /// Item keys, most recent last, unique.
    #[serde(default)]
    pub read_history: Vec<String>,
    /// Source names, most recent last, repeats allowed.
    #[serde(default)]
    pub source_history: Vec<String>,
    #[serde(default)]
    pub saved_items: Vec<SavedItem>,
    #[serde(default)]
    pub last_item: Option<ContentItem>,
    #[serde(default)]
    pub learning: LearningState,
    #[serde(default)]
    pub cold_start: ColdStartState,
}

impl UserProfile {
    pub fn is_cold_start_active(&self) -> bool {
        self.cold_start.is_active()
    }

    pub fn record_read(&mut self, item_key: &str) {
        if !item_key.is_empty() {
            push_recent_unique(&mut self.read_history, item_key.to_string(), READ_HISTORY_LIMIT);
        }
    }

    pub fn record_source(&mut self, source: &str) {
        if !source.is_empty() {
            push_capped(&mut self.source_history, source.to_string(), SOURCE_HISTORY_LIMIT);
        }
    }

    /// Most recent `n` sources shown, oldest first.
    pub fn recent_sources(&self, n: usize) -> &[String] {
        crate::history::last_n(&self.source_history, n)
    }

    /// Save (or re-save, moving it to the end) a card.
    pub fn record_saved(&mut self, item: &ContentItem, now: DateTime<Utc>) {
        if !item.item_key.is_empty() {
            self.saved_items.retain(|s| s.item_key != item.item_key);
        }
        self.saved_items.push(SavedItem {
            item_key: item.item_key.clone(),
            title: item.title.clone(),
            source: item.source.clone(),
            link: item.link().to_string(),
            summary: item.summary.clone(),
            saved_at: Some(now),
        });
        trim_front(&mut self.saved_items, SAVED_ITEMS_LIMIT);
    }

    /// Add `delta` to each non-blank tag, rounding to 2 places.
    pub fn adjust_interests<S: AsRef<str>>(&mut self, tags: &[S], delta: f64) {
        for tag in tags.iter().map(AsRef::as_ref).filter(|t| !t.is_empty()) {
            let v = self.interest_tags.entry(tag.to_string()).or_insert(0.0);
            *v = round_dp(*v + delta, 2);
        }
    }

    pub fn last_item_tags(&self) -> Vec<String> {
        self.last_item.as_ref().map(|i| i.tags.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(key: &str) -> ContentItem {
        ContentItem {
            item_key: key.into(),
            title: format!("title {key}"),
            summary: "s".into(),
            url: None,
            source: "src".into(),
            tags: vec!["ai".into()],
            category: "ai_ml".into(),
            fetched_at: None,
            published_at: None,
            recommended_count: 0,
        }
    }

    #[test]
    fn fresh_profile_starts_in_onboarding() {
        let p = UserProfile::default();
        assert!(p.is_cold_start_active());
        assert_eq!(p.learning.phase, crate::learning::Phase::ColdStart);
    }

    #[test]
    fn read_history_is_capped_and_unique() {
        let mut p = UserProfile::default();
        for i in 0..(READ_HISTORY_LIMIT + 10) {
            p.record_read(&format!("k{i}"));
        }
        p.record_read("k50");
        p.record_read("");
        assert_eq!(p.read_history.len(), READ_HISTORY_LIMIT);
        assert_eq!(p.read_history.last().map(String::as_str), Some("k50"));
        assert_eq!(p.read_history.first().map(String::as_str), Some("k10"));
    }

    #[test]
    fn source_history_keeps_repeats() {
        let mut p = UserProfile::default();
        p.record_source("a");
        p.record_source("a");
        p.record_source("b");
        assert_eq!(p.recent_sources(2), &["a".to_string(), "b".to_string()]);
        assert_eq!(p.source_history.len(), 3);
    }

    #[test]
    fn saving_twice_keeps_one_entry() {
        let mut p = UserProfile::default();
        let now = Utc::now();
        p.record_saved(&card("a"), now);
        p.record_saved(&card("b"), now);
        p.record_saved(&card("a"), now);
        let keys: Vec<&str> = p.saved_items.iter().map(|s| s.item_key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn interest_updates_round_to_cents() {
        let mut p = UserProfile::default();
        p.adjust_interests(&["ai", "", "ml"], 0.1);
        p.adjust_interests(&["ai"], 0.2);
        assert_eq!(p.interest_tags.get("ai"), Some(&0.3));
        assert_eq!(p.interest_tags.len(), 2);
        p.adjust_interests(&["ml"], -1.0);
        assert_eq!(p.interest_tags.get("ml"), Some(&-0.9));
    }
}
