//! Per-candidate score components. Each one lands in [0,1]; missing signals map to fixed
//! neutral values instead of errors.

use std::collections::BTreeMap;

use serde::Serialize;

use super::RankWeights;
use crate::model::ContentItem;
use crate::profile::SavedItem;
use crate::ranking::weights::round_dp;

/// No tags on the candidate.
pub const NO_SIGNAL: f64 = 0.0;
/// Profile has no interest tags (or no saved items) yet.
pub const EXPLORATORY: f64 = 0.2;
/// Profile has interests, none of them on this candidate.
pub const NO_OVERLAP: f64 = 0.1;
pub const UNKNOWN_SOURCE: f64 = 0.5;
pub const REPEATED_SOURCE: f64 = 0.1;
pub const FRESH_SOURCE: f64 = 1.0;
pub const PRIORITY_POPULARITY: f64 = 1.0;
pub const DEFAULT_POPULARITY: f64 = 0.6;

/// Affinity of 5.0 saturates the interest component.
pub const INTEREST_SCALE: f64 = 5.0;
/// Only the most recent saves feed the knowledge component.
pub const KNOWLEDGE_WINDOW: usize = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub interest: f64,
    pub knowledge: f64,
    pub diversity: f64,
    pub popularity: f64,
    pub total: f64,
}

pub fn interest_component(tags: &[String], interests: &BTreeMap<String, f64>) -> f64 {
    if tags.is_empty() {
        return NO_SIGNAL;
    }
    if interests.is_empty() {
        return EXPLORATORY;
    }
    let matched: Vec<f64> = tags.iter().filter_map(|t| interests.get(t).copied()).collect();
    if matched.is_empty() {
        return NO_OVERLAP;
    }
    let avg = matched.iter().sum::<f64>() / matched.len() as f64;
    (avg / INTEREST_SCALE).clamp(0.0, 1.0)
}

pub fn knowledge_component(tags: &[String], saved: &[SavedItem]) -> f64 {
    if tags.is_empty() {
        return NO_SIGNAL;
    }
    if saved.is_empty() {
        return EXPLORATORY;
    }
    let needles: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    let mut checks = 0usize;
    let mut hits = 0usize;
    for s in crate::history::last_n(saved, KNOWLEDGE_WINDOW) {
        let haystack = format!("{} {}", s.title, s.summary).to_lowercase();
        for n in &needles {
            checks += 1;
            if haystack.contains(n.as_str()) {
                hits += 1;
            }
        }
    }
    if checks == 0 {
        return NO_SIGNAL;
    }
    (hits as f64 / checks as f64).min(1.0)
}

pub fn diversity_component(source: &str, recent_sources: &[String]) -> f64 {
    let source = source.trim();
    if source.is_empty() {
        return UNKNOWN_SOURCE;
    }
    if recent_sources.iter().any(|s| s == source) {
        REPEATED_SOURCE
    } else {
        FRESH_SOURCE
    }
}

pub fn popularity_component(category: &str, priority_category: Option<&str>) -> f64 {
    match priority_category {
        Some(p) if !category.is_empty() && category == p => PRIORITY_POPULARITY,
        _ => DEFAULT_POPULARITY,
    }
}

/// All four components plus the weighted total (rounded to 6 places).
pub fn score_item(
    item: &ContentItem,
    interests: &BTreeMap<String, f64>,
    saved: &[SavedItem],
    recent_sources: &[String],
    priority_category: Option<&str>,
    w: &RankWeights,
) -> ScoreBreakdown {
    let interest = interest_component(&item.tags, interests);
    let knowledge = knowledge_component(&item.tags, saved);
    let diversity = diversity_component(&item.source, recent_sources);
    let popularity = popularity_component(&item.category, priority_category);

    let raw = interest * w.interest
        + knowledge * w.knowledge
        + diversity * w.diversity
        + popularity * w.popularity;

    ScoreBreakdown {
        interest,
        knowledge,
        diversity,
        popularity,
        total: round_dp(raw, 6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn saved(title: &str, summary: &str) -> SavedItem {
        SavedItem {
            item_key: title.into(),
            title: title.into(),
            summary: summary.into(),
            ..SavedItem::default()
        }
    }

    #[test]
    fn interest_defaults_and_saturation() {
        let mut interests = BTreeMap::new();
        assert_eq!(interest_component(&[], &interests), 0.0);
        assert_eq!(interest_component(&tags(&["ai"]), &interests), 0.2);

        interests.insert("ai".to_string(), 5.0);
        interests.insert("ml".to_string(), 12.0);
        assert_eq!(interest_component(&tags(&["design"]), &interests), 0.1);
        assert_eq!(interest_component(&tags(&["ai"]), &interests), 1.0);
        // Non-matching tags do not dilute the average.
        assert_eq!(interest_component(&tags(&["ai", "design"]), &interests), 1.0);

        interests.insert("noise".to_string(), -3.0);
        assert_eq!(interest_component(&tags(&["noise"]), &interests), 0.0);
    }

    #[test]
    fn knowledge_counts_case_insensitive_substrings() {
        let s = vec![saved("Rust async", "tokio runtime"), saved("Gardening", "tomatoes")];
        assert_eq!(knowledge_component(&tags(&["x"]), &[]), 0.2);
        // 2 saved items x 2 tags = 4 checks; "rust" and "Tokio" hit the first item only.
        assert_eq!(knowledge_component(&tags(&["RUST", "Tokio"]), &s), 0.5);
    }

    #[test]
    fn knowledge_only_looks_at_recent_saves() {
        let mut s: Vec<SavedItem> = (0..20).map(|i| saved(&format!("old {i}"), "")).collect();
        s.insert(0, saved("rust", ""));
        assert_eq!(knowledge_component(&tags(&["rust"]), &s), 0.0);
    }

    #[test]
    fn diversity_and_popularity() {
        let recent = tags(&["hn.test"]);
        assert_eq!(diversity_component("", &recent), 0.5);
        assert_eq!(diversity_component("hn.test", &recent), 0.1);
        assert_eq!(diversity_component("lab.test", &recent), 1.0);
        assert_eq!(popularity_component("priority_hn", Some("priority_hn")), 1.0);
        assert_eq!(popularity_component("ai_ml", Some("priority_hn")), 0.6);
        assert_eq!(popularity_component("ai_ml", None), 0.6);
    }
}
