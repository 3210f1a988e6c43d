//! render.rs: chat-facing text and button layouts.

use serde::{Deserialize, Serialize};

use crate::model::ContentItem;
use crate::onboarding::{catalog, ColdStartState, SeedCard, MAX_SELECTIONS, MIN_SELECTIONS};
use crate::reader::DeepRead;
use crate::sink::SinkStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(text: &str, callback_data: &str) -> Self {
        Self {
            text: text.to_string(),
            callback_data: callback_data.to_string(),
        }
    }
}

pub type ButtonRows = Vec<Vec<Button>>;

pub fn brush_buttons() -> ButtonRows {
    vec![
        vec![
            Button::new("👍 Interested", "/brush like"),
            Button::new("👎 Pass", "/brush skip"),
        ],
        vec![
            Button::new("📖 Deep read", "/brush read"),
            Button::new("💾 Save", "/brush save"),
        ],
        vec![Button::new("🔄 New batch", "/brush refresh")],
    ]
}

/// Onboarding actions, one choose button per unselected seed, and a start button once the
/// minimum is met.
pub fn cold_start_buttons(state: &ColdStartState) -> ButtonRows {
    let mut rows = vec![
        vec![
            Button::new("👍 Into this area", "/brush like"),
            Button::new("👎 Next area", "/brush skip"),
        ],
        vec![
            Button::new("📖 Read this first", "/brush read"),
            Button::new("🔄 Other area", "/brush refresh"),
        ],
    ];

    let choices: Vec<Button> = state
        .seed_items
        .iter()
        .filter(|s| s.category != crate::onboarding::UNKNOWN_CATEGORY)
        .filter(|s| !state.selected_categories.contains(&s.category))
        .map(|s| Button::new(&s.label, &format!("/brush choose {}", s.alias)))
        .collect();
    for chunk in choices.chunks(3) {
        rows.push(chunk.to_vec());
    }

    if state.ready_to_start() {
        rows.push(vec![Button::new("✅ Start recommendations", "/brush start")]);
    }
    rows
}

pub fn card(item: &ContentItem) -> String {
    let tags = if item.tags.is_empty() {
        "#general".to_string()
    } else {
        item.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" ")
    };
    let mut msg = format!(
        "📰 Card\nTitle: {}\nSummary: {}\nTags: {}\nSource: {}",
        item.title, item.summary, tags, item.source
    );
    if !item.link().is_empty() {
        msg.push_str(&format!("\nLink: {}", item.link()));
    }
    msg
}

/// Display labels of the (at most six most recent) selections, or `none`.
pub fn selected_labels(selected: &[String]) -> String {
    let recent = crate::history::last_n(selected, 6);
    if recent.is_empty() {
        return "none".to_string();
    }
    recent
        .iter()
        .map(|c| catalog::label_for(c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn cold_start_header(state: &ColdStartState, seed: &SeedCard) -> String {
    let count = state.selected_count();
    let (index, total) = state.position();
    let hint = if count < MIN_SELECTIONS {
        format!("pick at least {MIN_SELECTIONS} areas first (tap a category button, or 👍 the current one).")
    } else if count < MAX_SELECTIONS {
        format!("minimum of {MIN_SELECTIONS} reached; tap ✅ to start, or add one more area.")
    } else {
        format!("{MAX_SELECTIONS} areas selected, switching to smart recommendations.")
    };
    format!(
        "👋 Welcome to Brush! A few cards from different areas first, so I can learn your taste.\n\
         Onboarding progress: {count}/{MIN_SELECTIONS}-{MAX_SELECTIONS} areas selected (area {index}/{total})\n\
         Current area: {} ({})\n\
         Selected: {}\n\
         Tip: {hint}\n\n",
        seed.label,
        seed.alias,
        selected_labels(&state.selected_categories),
    )
}

/// Onboarding card: header plus the seed's item.
pub fn cold_start_card(state: &ColdStartState, seed: &SeedCard) -> String {
    cold_start_header(state, seed) + &card(&seed.item)
}

pub fn with_pool_status(message: &str, pool_low: bool, pool_empty: bool) -> String {
    format!("{message}\nPOOL_LOW: {pool_low}\nPOOL_EMPTY: {pool_empty}")
}

/// Placeholder card while the pool has nothing to rank.
pub fn building_feed_card() -> ContentItem {
    ContentItem {
        item_key: String::new(),
        title: "Still building your feed".to_string(),
        summary: "The content pool is empty right now. Try again after the next refresh.".to_string(),
        url: None,
        source: "brush".to_string(),
        tags: Vec::new(),
        category: String::new(),
        fetched_at: None,
        published_at: None,
        recommended_count: 0,
    }
}

pub fn deep_read_message(item: &ContentItem, read: &DeepRead) -> String {
    let mut msg = format!("📖 Deep read\nTitle: {}\nSource: {}\n\n", item.title, item.source);
    let explain = read.explain.trim();
    if explain.is_empty() {
        msg.push_str(&format!("{}\n\n", item.summary));
    } else {
        msg.push_str(&format!("🧠 In plain words\n{explain}\n\n"));
    }
    let excerpt = read.excerpt.trim();
    if !excerpt.is_empty() {
        msg.push_str(&format!("📚 Excerpt\n{excerpt}\n\n"));
    }
    if !item.link().is_empty() {
        msg.push_str(&format!("Original: {}", item.link()));
    }
    msg.trim_end().to_string()
}

pub fn saved_message(item: &ContentItem) -> String {
    format!("✅ Saved: {}", item.title)
}

pub fn save_feedback(status: SinkStatus) -> &'static str {
    match status {
        SinkStatus::SavedNotion => "🧠 Stored to Notion (local backup kept)",
        SinkStatus::SavedLocalWithNotionError => "🗂️ Stored to the local knowledge base (Notion unavailable)",
        SinkStatus::SaveSinkError => "⚠️ Saved, but the knowledge sink failed (retry later)",
        SinkStatus::SavedLocal => "🗂️ Stored to the local knowledge base",
    }
}

pub fn alias_prompt() -> String {
    format!(
        "Pick an interest area: {}",
        catalog::aliases().collect::<Vec<_>>().join("/")
    )
}

pub fn unknown_alias(input: &str, suggestion: Option<&str>) -> String {
    let mut msg = format!(
        "Unknown interest area: {input}. Options: {}",
        catalog::aliases().collect::<Vec<_>>().join("/")
    );
    if let Some(s) = suggestion {
        msg.push_str(&format!("\nDid you mean: {s}?"));
    }
    msg
}

pub fn prefix(line: &str, message: &str) -> String {
    format!("{line}\n\n{message}")
}

pub const HELP: &str = "Unknown command, try /brush";
pub const ONBOARDING_DONE: &str = "Onboarding is finished, just use /brush for recommendations.";
pub const ALREADY_SMART: &str = "You're already in smart recommendation mode, just use /brush.";
pub const SAVE_BLOCKED: &str = "Onboarding in progress: 👍 at least 2 areas you like before saving.";
pub const NOTHING_TO_READ: &str = "No article to expand yet, try /brush";
pub const NOTHING_TO_SAVE: &str = "No article to save yet, try /brush";
pub const LIKE_ACK: &str = "✅ Preference recorded (+2)";
pub const SKIP_ACK: &str = "⏭️ Skipped (-1)";
pub const REFRESH_ACK: &str = "🔄 New batch";
pub const STABLE_NOTICE: &str = "🎯 Switched to stable recommendations.";

pub fn learning_notice(count: u32, limit: u32) -> String {
    format!("🧪 Still learning your taste... (learning {count}/{limit})")
}

pub fn completion_notice(selected: &[String]) -> String {
    format!(
        "✅ Onboarding complete, smart recommendations are on.\nSelected: {}",
        selected_labels(selected)
    )
}
