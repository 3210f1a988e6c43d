// src/onboarding/mod.rs
//! Cold-start onboarding: walk a new user through one seed card per category, collect
//! category picks, then hand over to the quick-learning phase.
//!
//! Transitions only mutate the profile and report what happened; rendering, persistence
//! and event logging belong to the caller.

pub mod catalog;

use serde::{Deserialize, Serialize};

use crate::ingest::category_tags;
use crate::ingest::config::FeedsConfig;
use crate::model::{ContentItem, ContentPool};
use crate::profile::{delta, UserProfile};

pub use catalog::{CategoryInfo, CATALOG};

/// `start` is accepted from this many selections on.
pub const MIN_SELECTIONS: usize = 2;
/// Reaching this many selections completes onboarding immediately.
pub const MAX_SELECTIONS: usize = 3;
/// Seed cards per onboarding run; also caps the seen-category history.
pub const MAX_SEED_CATEGORIES: usize = 6;

pub const UNKNOWN_CATEGORY: &str = "unknown";

/// One onboarding card standing for a category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedCard {
    pub category: String,
    pub alias: String,
    pub label: String,
    pub item: ContentItem,
    /// No pooled article existed for the category; `item` is synthetic.
    #[serde(default)]
    pub placeholder: bool,
}

impl SeedCard {
    /// Stand-in used when no category could be resolved at all.
    pub fn unknown() -> Self {
        Self {
            category: UNKNOWN_CATEGORY.to_string(),
            alias: UNKNOWN_CATEGORY.to_string(),
            label: "Uncategorized".to_string(),
            item: ContentItem {
                item_key: String::new(),
                title: "Today's pick".to_string(),
                summary: "Pick a few areas you care about and I will tune recommendations from there."
                    .to_string(),
                url: None,
                source: "brush".to_string(),
                tags: Vec::new(),
                category: UNKNOWN_CATEGORY.to_string(),
                fetched_at: None,
                published_at: None,
                recommended_count: 0,
            },
            placeholder: true,
        }
    }

    fn is_unknown(&self) -> bool {
        self.category == UNKNOWN_CATEGORY
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColdStartState {
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub seed_items: Vec<SeedCard>,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub selected_categories: Vec<String>,
    #[serde(default)]
    pub seen_categories: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ColdStartState {
    fn default() -> Self {
        Self {
            active: true,
            completed: false,
            seed_items: Vec::new(),
            current_index: 0,
            selected_categories: Vec::new(),
            seen_categories: Vec::new(),
        }
    }
}

impl ColdStartState {
    pub fn is_active(&self) -> bool {
        self.active && !self.completed
    }

    pub fn selected_count(&self) -> usize {
        self.selected_categories.len()
    }

    pub fn ready_to_start(&self) -> bool {
        self.selected_count() >= MIN_SELECTIONS
    }

    /// Seed under the cursor, or the synthetic unknown seed when there are none.
    pub fn current_seed(&self) -> SeedCard {
        if self.seed_items.is_empty() {
            return SeedCard::unknown();
        }
        self.seed_items[self.current_index % self.seed_items.len()].clone()
    }

    /// 1-based cursor position and seed count, for progress display.
    pub fn position(&self) -> (usize, usize) {
        let total = self.seed_items.len().max(1);
        (self.current_index % total + 1, total)
    }

    fn advance(&mut self) {
        let total = self.seed_items.len();
        if total > 0 {
            self.current_index = (self.current_index + 1) % total;
        }
    }

    fn mark_seen(&mut self, category: &str) {
        if !category.is_empty() && !self.seen_categories.iter().any(|c| c == category) {
            self.seen_categories.push(category.to_string());
        }
        crate::history::trim_front(&mut self.seen_categories, MAX_SEED_CATEGORIES);
    }

    /// Repair values loaded from disk: unique, non-blank, capped selections; cursor in range.
    pub fn normalize(&mut self) {
        let mut selected: Vec<String> = Vec::with_capacity(MAX_SELECTIONS);
        for c in self.selected_categories.iter().map(|c| c.trim()) {
            if !c.is_empty() && c != UNKNOWN_CATEGORY && !selected.iter().any(|s| s == c) {
                selected.push(c.to_string());
            }
        }
        selected.truncate(MAX_SELECTIONS);
        self.selected_categories = selected;
        if !self.seed_items.is_empty() {
            self.current_index %= self.seed_items.len();
        } else {
            self.current_index = 0;
        }
        if self.completed {
            self.active = false;
        }
    }

    /// Resolve user input to a category: catalog alias first, then any current seed's
    /// category or alias.
    pub fn resolve_alias(&self, input: &str) -> Option<String> {
        let needle = input.trim().to_ascii_lowercase();
        if let Some(info) = catalog::by_alias(&needle) {
            return Some(info.category.to_string());
        }
        self.seed_items
            .iter()
            .find(|s| !s.is_unknown() && (s.category.eq_ignore_ascii_case(&needle) || s.alias.eq_ignore_ascii_case(&needle)))
            .map(|s| s.category.clone())
    }
}

/// Why onboarding finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTrigger {
    ChooseLimitReached,
    ChooseMaxSelected,
    LikeMaxSelected,
    ManualStart,
}

/// Result of one onboarding transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// Category appended; onboarding continues.
    Selected { category: String, count: usize },
    AlreadySelected { category: String },
    UnknownAlias { input: String, suggestion: Option<&'static str> },
    MissingAlias,
    /// Current seed liked; `category` is `None` for the synthetic unknown seed.
    Liked { seed: SeedCard, category: Option<String>, count: usize },
    /// Skip or refresh moved past `seed`.
    Advanced { seed: SeedCard },
    NeedMore { missing: usize },
    Completed {
        selected: Vec<String>,
        trigger: CompletionTrigger,
        seed: Option<SeedCard>,
    },
}

/// Categories to seed: catalog order first (those present in the feeds), then remaining
/// feed categories in configuration order, up to [`MAX_SEED_CATEGORIES`].
pub fn pick_seed_categories(feeds: &FeedsConfig) -> Vec<String> {
    let mut out: Vec<String> = CATALOG
        .iter()
        .filter(|c| feeds.contains(c.category))
        .map(|c| c.category.to_string())
        .take(MAX_SEED_CATEGORIES)
        .collect();
    for c in feeds.categories() {
        if out.len() >= MAX_SEED_CATEGORIES {
            break;
        }
        if !out.iter().any(|x| x == c) {
            out.push(c.to_string());
        }
    }
    out
}

/// One seed per category, preferring a pooled article from that category.
pub fn build_seeds(feeds: &FeedsConfig, pool: &ContentPool) -> Vec<SeedCard> {
    pick_seed_categories(feeds)
        .into_iter()
        .map(|category| {
            let alias = catalog::alias_for(&category).to_string();
            let label = catalog::label_for(&category).to_string();
            match pool.first_in_category(&category) {
                Some(article) => SeedCard {
                    category,
                    alias,
                    label,
                    item: article.clone(),
                    placeholder: false,
                },
                None => {
                    let item = placeholder_item(feeds, &category);
                    SeedCard {
                        category,
                        alias,
                        label,
                        item,
                        placeholder: true,
                    }
                }
            }
        })
        .collect()
}

fn placeholder_item(feeds: &FeedsConfig, category: &str) -> ContentItem {
    let first = feeds.sources(category).first();
    let name = first.map(|s| s.name.as_str()).unwrap_or(category);
    ContentItem {
        item_key: String::new(),
        title: format!("Area seed: {name}"),
        summary: "Tell me whether this area interests you and I will steer recommendations accordingly."
            .to_string(),
        url: None,
        source: first
            .map(|s| s.display_name().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        tags: category_tags(category),
        category: category.to_string(),
        fetched_at: None,
        published_at: None,
        recommended_count: 0,
    }
}

/// Build seeds on first entry; no-op once seeds exist.
pub fn ensure_seeds(profile: &mut UserProfile, feeds: &FeedsConfig, pool: &ContentPool) {
    let state = &mut profile.cold_start;
    if state.seed_items.is_empty() {
        state.seed_items = build_seeds(feeds, pool);
        state.current_index = 0;
    }
}

/// Finish onboarding and open the quick-learning window. Returns the selections.
pub fn complete(profile: &mut UserProfile, quick_limit: u32) -> Vec<String> {
    let state = &mut profile.cold_start;
    state.active = false;
    state.completed = true;
    state.seed_items.clear();
    state.current_index = 0;
    profile.learning.activate_quick(quick_limit);
    profile.cold_start.selected_categories.clone()
}

fn completed(profile: &mut UserProfile, quick_limit: u32, trigger: CompletionTrigger, seed: Option<SeedCard>) -> Transition {
    let selected = complete(profile, quick_limit);
    Transition::Completed {
        selected,
        trigger,
        seed,
    }
}

/// Explicitly pick a category by alias.
pub fn choose(profile: &mut UserProfile, input: &str, quick_limit: u32) -> Transition {
    let input = input.trim().to_ascii_lowercase();
    if input.is_empty() {
        return Transition::MissingAlias;
    }
    let Some(category) = profile.cold_start.resolve_alias(&input) else {
        return Transition::UnknownAlias {
            suggestion: catalog::suggest_alias(&input),
            input,
        };
    };

    let state = &mut profile.cold_start;
    if state.selected_categories.contains(&category) {
        return Transition::AlreadySelected { category };
    }
    if state.selected_count() >= MAX_SELECTIONS {
        return completed(profile, quick_limit, CompletionTrigger::ChooseLimitReached, None);
    }

    state.selected_categories.push(category.clone());
    // Keep the cursor on the chosen card so the next like/skip acts on what the user picked.
    if let Some(idx) = state.seed_items.iter().position(|s| s.category == category) {
        state.current_index = idx;
    }
    let count = state.selected_count();
    profile.adjust_interests(&catalog::interest_tags(&category), delta::CHOOSE);

    if count >= MAX_SELECTIONS {
        return completed(profile, quick_limit, CompletionTrigger::ChooseMaxSelected, None);
    }
    Transition::Selected { category, count }
}

/// Like the seed under the cursor: select its category (if room) and boost its tags.
pub fn like(profile: &mut UserProfile, quick_limit: u32) -> Transition {
    let seed = profile.cold_start.current_seed();
    let category = (!seed.is_unknown()).then(|| seed.category.clone());

    if let Some(c) = &category {
        let state = &mut profile.cold_start;
        if !state.selected_categories.contains(c) && state.selected_count() < MAX_SELECTIONS {
            state.selected_categories.push(c.clone());
        }
        profile.adjust_interests(&catalog::interest_tags(c), delta::ONBOARDING_LIKE);
    }

    let state = &mut profile.cold_start;
    if category.is_some() {
        state.mark_seen(&seed.category);
    }
    state.advance();

    let count = state.selected_count();
    if count >= MAX_SELECTIONS {
        return completed(profile, quick_limit, CompletionTrigger::LikeMaxSelected, Some(seed));
    }
    Transition::Liked { seed, category, count }
}

/// Skip (or refresh): mark the seed seen and move on without selecting.
pub fn skip(profile: &mut UserProfile) -> Transition {
    let seed = profile.cold_start.current_seed();
    let state = &mut profile.cold_start;
    if !seed.is_unknown() {
        state.mark_seen(&seed.category);
    }
    state.advance();
    Transition::Advanced { seed }
}

/// Finish onboarding manually once the minimum is met.
pub fn start(profile: &mut UserProfile, quick_limit: u32) -> Transition {
    let count = profile.cold_start.selected_count();
    if count < MIN_SELECTIONS {
        return Transition::NeedMore {
            missing: MIN_SELECTIONS - count,
        };
    }
    completed(profile, quick_limit, CompletionTrigger::ManualStart, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::FeedSource;
    use crate::learning::Phase;

    fn feeds(cats: &[&str]) -> FeedsConfig {
        FeedsConfig::new(
            cats.iter()
                .map(|c| {
                    (
                        c.to_string(),
                        vec![FeedSource {
                            name: format!("{c} feed"),
                            url: format!("https://{c}.test/rss"),
                            site: None,
                        }],
                    )
                })
                .collect(),
        )
    }

    fn onboarding_profile() -> UserProfile {
        let mut p = UserProfile::default();
        let f = feeds(&[
            "priority_hn_popular_2025",
            "ai_ml",
            "design_product",
            "tech_programming",
            "business_startup",
            "science_general",
            "cooking_home",
        ]);
        ensure_seeds(&mut p, &f, &ContentPool::default());
        p
    }

    #[test]
    fn seeds_follow_catalog_order_then_config() {
        let f = feeds(&["cooking_home", "ai_ml", "travel", "design_product"]);
        assert_eq!(
            pick_seed_categories(&f),
            vec!["ai_ml", "design_product", "cooking_home", "travel"]
        );
        let seeds = build_seeds(&f, &ContentPool::default());
        assert!(seeds.iter().all(|s| s.placeholder));
        assert_eq!(seeds[2].alias, "cooking_home");
        assert_eq!(seeds[0].item.tags, vec!["ai", "ml"]);
    }

    #[test]
    fn seeds_prefer_pooled_articles() {
        let f = feeds(&["ai_ml"]);
        let mut pool = ContentPool::default();
        pool.articles.push(ContentItem {
            item_key: "k".into(),
            title: "Agents in practice".into(),
            summary: "s".into(),
            url: Some("https://lab.test/a".into()),
            source: "lab".into(),
            tags: vec!["ai".into()],
            category: "ai_ml".into(),
            fetched_at: None,
            published_at: None,
            recommended_count: 0,
        });
        let seeds = build_seeds(&f, &pool);
        assert!(!seeds[0].placeholder);
        assert_eq!(seeds[0].item.title, "Agents in practice");
    }

    #[test]
    fn two_choices_then_start_completes() {
        let mut p = onboarding_profile();
        assert!(matches!(choose(&mut p, "ai", 20), Transition::Selected { count: 1, .. }));
        assert!(matches!(start(&mut p, 20), Transition::NeedMore { missing: 1 }));
        assert!(matches!(choose(&mut p, "design", 20), Transition::Selected { count: 2, .. }));
        assert_eq!(p.cold_start.selected_categories, vec!["ai_ml", "design_product"]);
        assert!(p.is_cold_start_active());
        assert_eq!(p.interest_tags.get("ai"), Some(&4.0));
        assert_eq!(p.interest_tags.get("product"), Some(&4.0));
        assert_eq!(p.interest_tags.get("llm"), Some(&4.0));

        match start(&mut p, 20) {
            Transition::Completed { selected, trigger, .. } => {
                assert_eq!(selected, vec!["ai_ml", "design_product"]);
                assert_eq!(trigger, CompletionTrigger::ManualStart);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!p.is_cold_start_active());
        assert!(p.cold_start.seed_items.is_empty());
        assert_eq!(p.learning.phase, Phase::Quick);
        assert_eq!(p.learning.quick_limit, 20);
    }

    #[test]
    fn choose_moves_cursor_and_ignores_repeats() {
        let mut p = onboarding_profile();
        choose(&mut p, "design", 20);
        assert_eq!(p.cold_start.current_seed().category, "design_product");
        let before = p.interest_tags.clone();
        assert!(matches!(choose(&mut p, "DESIGN", 20), Transition::AlreadySelected { .. }));
        assert_eq!(p.interest_tags, before);
    }

    #[test]
    fn third_choice_completes_immediately() {
        let mut p = onboarding_profile();
        choose(&mut p, "ai", 20);
        choose(&mut p, "tech", 20);
        assert!(matches!(
            choose(&mut p, "science", 20),
            Transition::Completed { trigger: CompletionTrigger::ChooseMaxSelected, .. }
        ));
        assert_eq!(p.cold_start.selected_categories.len(), 3);
    }

    #[test]
    fn unknown_and_missing_alias() {
        let mut p = UserProfile::default();
        ensure_seeds(&mut p, &feeds(&["ai_ml", "cooking_home"]), &ContentPool::default());
        assert_eq!(choose(&mut p, "  ", 20), Transition::MissingAlias);
        match choose(&mut p, "desing", 20) {
            Transition::UnknownAlias { input, suggestion } => {
                assert_eq!(input, "desing");
                assert_eq!(suggestion, Some("design"));
            }
            other => panic!("unexpected {other:?}"),
        }
        // Non-catalog seed categories are selectable by name.
        assert!(matches!(choose(&mut p, "cooking_home", 20), Transition::Selected { .. }));
    }

    #[test]
    fn three_likes_complete_without_start() {
        let mut p = onboarding_profile();
        assert!(matches!(like(&mut p, 20), Transition::Liked { count: 1, .. }));
        assert!(matches!(like(&mut p, 20), Transition::Liked { count: 2, .. }));
        match like(&mut p, 20) {
            Transition::Completed { selected, trigger, seed } => {
                assert_eq!(trigger, CompletionTrigger::LikeMaxSelected);
                assert_eq!(selected, vec!["tech_programming", "ai_ml", "business_startup"]);
                assert_eq!(seed.map(|s| s.category).as_deref(), Some("business_startup"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(p.learning.phase, Phase::Quick);
        assert_eq!(p.interest_tags.get("tech"), Some(&3.0));
    }

    #[test]
    fn skip_wraps_and_caps_seen() {
        let mut p = onboarding_profile();
        let total = p.cold_start.seed_items.len();
        assert_eq!(total, MAX_SEED_CATEGORIES);
        for _ in 0..total + 1 {
            skip(&mut p);
        }
        assert_eq!(p.cold_start.current_index, 1);
        assert_eq!(p.cold_start.seen_categories.len(), MAX_SEED_CATEGORIES);
        assert!(p.cold_start.selected_categories.is_empty());
        assert!(p.is_cold_start_active());
    }

    #[test]
    fn empty_feeds_use_unknown_seed() {
        let mut p = UserProfile::default();
        ensure_seeds(&mut p, &FeedsConfig::default(), &ContentPool::default());
        assert_eq!(p.cold_start.current_seed().category, UNKNOWN_CATEGORY);
        assert!(matches!(like(&mut p, 20), Transition::Liked { category: None, count: 0, .. }));
        assert!(p.interest_tags.is_empty());
        // Explicit choice still works without seeds.
        assert!(matches!(choose(&mut p, "ai", 20), Transition::Selected { count: 1, .. }));
    }
}
