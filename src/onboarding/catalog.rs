// src/onboarding/catalog.rs
//! Known onboarding categories: short alias, display label and interest tag hints.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub category: &'static str,
    pub alias: &'static str,
    pub label: &'static str,
    pub hints: &'static [&'static str],
}

/// Preferred seed order.
pub const CATALOG: [CategoryInfo; 6] = [
    CategoryInfo {
        category: "tech_programming",
        alias: "tech",
        label: "Tech/Programming",
        hints: &["tech", "programming", "engineering", "backend"],
    },
    CategoryInfo {
        category: "ai_ml",
        alias: "ai",
        label: "AI/ML",
        hints: &["ai", "ml", "llm", "agent"],
    },
    CategoryInfo {
        category: "business_startup",
        alias: "biz",
        label: "Business/Startup",
        hints: &["business", "startup", "growth", "product"],
    },
    CategoryInfo {
        category: "design_product",
        alias: "design",
        label: "Design/Product",
        hints: &["design", "ux", "ui", "product"],
    },
    CategoryInfo {
        category: "science_general",
        alias: "science",
        label: "Science/General",
        hints: &["science", "research", "biology", "physics"],
    },
    CategoryInfo {
        category: "priority_hn_popular_2025",
        alias: "popular",
        label: "Popular picks",
        hints: &["hn", "popular", "trend", "tech"],
    },
];

pub fn by_category(category: &str) -> Option<&'static CategoryInfo> {
    CATALOG.iter().find(|c| c.category == category)
}

pub fn by_alias(alias: &str) -> Option<&'static CategoryInfo> {
    let a = alias.trim();
    CATALOG.iter().find(|c| c.alias.eq_ignore_ascii_case(a))
}

/// Catalog alias, or the category name itself for categories outside the catalog.
pub fn alias_for(category: &str) -> &str {
    by_category(category).map(|c| c.alias).unwrap_or(category)
}

pub fn label_for(category: &str) -> &str {
    by_category(category).map(|c| c.label).unwrap_or(category)
}

pub fn aliases() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|c| c.alias)
}

/// Tags boosted when a category is chosen: name parts, alias, then hints (unique, in order).
pub fn interest_tags(category: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut add = |t: &str| {
        if !t.is_empty() && !tags.iter().any(|x| x == t) {
            tags.push(t.to_string());
        }
    };
    for part in category.split('_') {
        add(part);
    }
    if let Some(info) = by_category(category) {
        add(info.alias);
        for h in info.hints {
            add(h);
        }
    }
    tags
}

/// Closest catalog alias for a mistyped one.
pub fn suggest_alias(input: &str) -> Option<&'static str> {
    let needle = input.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return None;
    }
    aliases()
        .map(|a| (a, strsim::jaro_winkler(&needle, a)))
        .filter(|(_, score)| *score >= 0.75)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(a, _)| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interest_tags_merge_parts_alias_and_hints() {
        assert_eq!(
            interest_tags("ai_ml"),
            vec!["ai", "ml", "llm", "agent"]
        );
        assert_eq!(
            interest_tags("priority_hn_popular_2025"),
            vec!["priority", "hn", "popular", "2025", "trend", "tech"]
        );
        assert_eq!(interest_tags("cooking_home"), vec!["cooking", "home"]);
    }

    #[test]
    fn alias_lookup_is_case_insensitive() {
        assert_eq!(by_alias(" AI ").map(|c| c.category), Some("ai_ml"));
        assert_eq!(alias_for("cooking_home"), "cooking_home");
        assert_eq!(label_for("design_product"), "Design/Product");
    }

    #[test]
    fn suggestions_for_typos() {
        assert_eq!(suggest_alias("desing"), Some("design"));
        assert_eq!(suggest_alias("scince"), Some("science"));
        assert_eq!(suggest_alias("zzzzzz"), None);
    }
}
