//! tracker.rs: append-only behavior event log.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::ContentItem;
use crate::storage::append_json_line;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Like,
    Skip,
    Read,
    ReadMiss,
    Save,
    SaveMiss,
    Refresh,
    ColdStartView,
    ColdStartChoose,
    ColdStartLike,
    ColdStartSkip,
    ColdStartComplete,
    ColdStartSaveBlocked,
    QuickLearnRebalance,
}

#[derive(Clone, Debug, Serialize)]
pub struct BehaviorEvent {
    pub user_id: String,
    pub action: Action,
    pub item_key: String,
    pub title: String,
    pub source: String,
    pub category: String,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl BehaviorEvent {
    pub fn new(user_id: &str, action: Action, item: Option<&ContentItem>) -> Self {
        let (item_key, title, source, category, tags) = match item {
            Some(i) => (
                i.item_key.clone(),
                i.title.clone(),
                i.source.clone(),
                i.category.clone(),
                i.tags.clone(),
            ),
            None => Default::default(),
        };
        Self {
            user_id: user_id.to_string(),
            action,
            item_key,
            title,
            source,
            category,
            tags,
            metadata: Map::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Fire-and-forget sink for behavior events. Implementations must not panic or propagate.
pub trait EventLog: Send + Sync {
    fn record(&self, event: BehaviorEvent);
}

pub struct JsonlEventLog {
    path: PathBuf,
    // Serializes appends from concurrent requests within this process.
    lock: Mutex<()>,
}

impl JsonlEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventLog for JsonlEventLog {
    fn record(&self, event: BehaviorEvent) {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = append_json_line(&self.path, &event) {
            tracing::warn!(action = ?event.action, error = %e, "behavior event dropped");
        }
    }
}

/// Discards everything.
pub struct NoopEventLog;

impl EventLog for NoopEventLog {
    fn record(&self, _event: BehaviorEvent) {}
}
