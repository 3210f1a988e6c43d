// src/sink/mod.rs
//! Knowledge sink for saved items: a local JSONL copy plus an optional remote page.

pub mod local;
pub mod notion;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ContentItem;
use crate::reader::cleaner::split_sentences;
pub use local::LocalNotes;
pub use notion::{NotionClient, NotionConfig};

const KEY_POINTS: usize = 3;

/// What gets persisted for one saved item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructuredNote {
    pub user_id: String,
    pub item_key: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub source: String,
    pub tags: Vec<String>,
    pub key_points: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

impl StructuredNote {
    pub fn from_item(user_id: &str, item: &ContentItem, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            item_key: item.item_key.clone(),
            title: item.title.clone(),
            summary: item.summary.clone(),
            link: item.link().to_string(),
            source: item.source.clone(),
            tags: item.tags.clone(),
            key_points: split_sentences(&item.summary).into_iter().take(KEY_POINTS).collect(),
            saved_at: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkStatus {
    SavedLocal,
    SavedNotion,
    SavedLocalWithNotionError,
    /// The local write failed; the remote store was not attempted.
    SaveSinkError,
}

impl SinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkStatus::SavedLocal => "saved_local",
            SinkStatus::SavedNotion => "saved_notion",
            SinkStatus::SavedLocalWithNotionError => "saved_local_with_notion_error",
            SinkStatus::SaveSinkError => "save_sink_error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SinkReport {
    pub status: SinkStatus,
    /// Stores that accepted the note, in write order.
    pub stores: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[async_trait]
pub trait NoteSink: Send + Sync {
    /// Never fails: problems are reported through [`SinkReport::status`].
    async fn persist(&self, note: &StructuredNote, remote: &NotionConfig) -> SinkReport;
}

pub struct KnowledgeSink {
    local: LocalNotes,
    notion: NotionClient,
}

impl KnowledgeSink {
    pub fn new(local: LocalNotes) -> Self {
        Self {
            local,
            notion: NotionClient::new(),
        }
    }
}

#[async_trait]
impl NoteSink for KnowledgeSink {
    async fn persist(&self, note: &StructuredNote, remote: &NotionConfig) -> SinkReport {
        if let Err(e) = self.local.append(note) {
            tracing::warn!(path = %self.local.path().display(), error = %e, "local note write failed");
            return SinkReport {
                status: SinkStatus::SaveSinkError,
                stores: Vec::new(),
                error: Some(format!("{e:#}")),
            };
        }
        let mut stores = vec!["local".to_string()];
        if !remote.is_ready() {
            return SinkReport {
                status: SinkStatus::SavedLocal,
                stores,
                error: None,
            };
        }

        match self.notion.create_page(remote, note).await {
            Ok(page_id) => {
                tracing::debug!(page_id, item_key = %note.item_key, "note pushed to notion");
                stores.push("notion".to_string());
                SinkReport {
                    status: SinkStatus::SavedNotion,
                    stores,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "notion push failed, local copy kept");
                SinkReport {
                    status: SinkStatus::SavedLocalWithNotionError,
                    stores,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }
}
