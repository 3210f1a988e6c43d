// src/profile/store.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::{SavedItem, UserProfile};
use crate::learning::{LearningState, Phase};
use crate::model::ContentItem;
use crate::onboarding::ColdStartState;
use crate::storage::{read_json, write_json_atomic, Loaded};

/// One JSON file per user.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

/// Persisted shape; `learning` / `cold_start` may be absent on records from older builds.
#[derive(Deserialize)]
struct StoredProfile {
    #[serde(default)]
    interest_tags: BTreeMap<String, f64>,
    #[serde(default)]
    read_history: Vec<String>,
    #[serde(default)]
    source_history: Vec<String>,
    #[serde(default)]
    saved_items: Vec<SavedItem>,
    #[serde(default)]
    last_item: Option<ContentItem>,
    #[serde(default)]
    learning: Option<LearningState>,
    #[serde(default)]
    cold_start: Option<ColdStartState>,
}

impl From<StoredProfile> for UserProfile {
    fn from(s: StoredProfile) -> Self {
        // Records without an onboarding block predate it: anyone with history counts as onboarded.
        let cold_start = s.cold_start.unwrap_or_else(|| {
            let onboarded = !s.read_history.is_empty() || !s.interest_tags.is_empty();
            ColdStartState {
                active: !onboarded,
                completed: onboarded,
                ..ColdStartState::default()
            }
        });
        let learning = s.learning.unwrap_or_else(|| LearningState {
            phase: if cold_start.is_active() {
                Phase::ColdStart
            } else {
                Phase::Stable
            },
            ..LearningState::default()
        });

        let mut p = UserProfile {
            interest_tags: s.interest_tags,
            read_history: s.read_history,
            source_history: s.source_history,
            saved_items: s.saved_items,
            last_item: s.last_item,
            learning,
            cold_start,
        };
        p.cold_start.normalize();
        p.learning.quick_limit = p.learning.quick_limit.max(1);
        crate::history::trim_front(&mut p.read_history, super::READ_HISTORY_LIMIT);
        crate::history::trim_front(&mut p.source_history, super::SOURCE_HISTORY_LIMIT);
        crate::history::trim_front(&mut p.saved_items, super::SAVED_ITEMS_LIMIT);
        p
    }
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_user_id(user_id)))
    }

    /// Stored profile, or a fresh default when missing or unreadable.
    pub fn load(&self, user_id: &str) -> UserProfile {
        let path = self.path_for(user_id);
        match read_json::<StoredProfile>(&path) {
            Loaded::Ok(stored) => stored.into(),
            Loaded::Missing => UserProfile::default(),
            Loaded::Corrupt(reason) => {
                warn!(user_id, path = %path.display(), %reason, "profile unreadable; starting fresh");
                UserProfile::default()
            }
        }
    }

    pub fn save(&self, user_id: &str, profile: &UserProfile) -> Result<()> {
        write_json_atomic(&self.path_for(user_id), profile)
    }
}

const MAX_STEM_CHARS: usize = 128;

/// Map an arbitrary user id to a safe file stem.
///
/// Ids that had to be rewritten or shortened get a hash of the raw id appended, so two
/// distinct ids never share a stem.
pub fn sanitize_user_id(user_id: &str) -> String {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return "anonymous".to_string();
    }
    let cleaned: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_STEM_CHARS)
        .collect();
    if cleaned == user_id {
        return cleaned;
    }
    let digest = Sha256::digest(user_id.as_bytes());
    let tag: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("{cleaned}~{tag}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sanitize_blocks_traversal() {
        let stem = sanitize_user_id("../etc/passwd");
        assert!(stem.starts_with("___etc_passwd~"));
        assert!(!stem.contains('/') && !stem.contains('.'));
        assert_eq!(sanitize_user_id("  "), "anonymous");
        assert_eq!(sanitize_user_id("tg-12345_a"), "tg-12345_a");
    }

    #[test]
    fn distinct_ids_get_distinct_files() {
        let store = ProfileStore::new("/tmp/profiles");
        let long_a = format!("{}a", "x".repeat(200));
        let long_b = format!("{}b", "x".repeat(200));
        let ids = ["alice.b", "alice_b", "alice/b", " alice_b", long_a.as_str(), long_b.as_str()];
        let paths: std::collections::HashSet<PathBuf> = ids.iter().map(|id| store.path_for(id)).collect();
        assert_eq!(paths.len(), ids.len());
        assert_eq!(store.path_for("alice_b"), PathBuf::from("/tmp/profiles/alice_b.json"));
        assert_eq!(store.path_for("alice.b"), store.path_for("alice.b"));
    }

    #[test]
    fn corrupt_profile_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        fs::write(store.path_for("u1"), r#"{"interest_tags": "oops"}"#).unwrap();
        let p = store.load("u1");
        assert_eq!(p, UserProfile::default());
    }

    #[test]
    fn legacy_profile_with_history_is_onboarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        fs::write(
            store.path_for("old"),
            r#"{"interest_tags": {"ai": 2.0}, "read_history": ["k1"]}"#,
        )
        .unwrap();
        let p = store.load("old");
        assert!(!p.is_cold_start_active());
        assert!(p.cold_start.completed);
        assert_eq!(p.learning.phase, Phase::Stable);

        fs::write(store.path_for("blank"), r#"{"read_history": []}"#).unwrap();
        let p = store.load("blank");
        assert!(p.is_cold_start_active());
        assert_eq!(p.learning.phase, Phase::ColdStart);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));
        let mut p = UserProfile::default();
        p.adjust_interests(&["ai"], 4.0);
        p.record_read("k1");
        store.save("u", &p).unwrap();
        assert_eq!(store.load("u"), p);
    }
}
