// src/sink/notion.rs
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::StructuredNote;
use crate::config::app::{env_flag, env_int};

const PAGES_URL: &str = "https://api.notion.com/v1/pages";
const NOTION_VERSION: &str = "2022-06-28";
/// Notion rejects rich-text runs longer than this.
const TEXT_LIMIT: usize = 2000;
pub const MIN_TIMEOUT_SECS: u64 = 3;

/// Remote note-store settings. Resolved from env, optionally overridden per request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            database_id: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NotionConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("BRUSH_NOTION_ENABLED"),
            api_key: std::env::var("BRUSH_NOTION_API_KEY")
                .unwrap_or_default()
                .trim()
                .to_string(),
            database_id: std::env::var("BRUSH_NOTION_DATABASE_ID")
                .unwrap_or_default()
                .trim()
                .to_string(),
            timeout_secs: env_int("BRUSH_NOTION_TIMEOUT", 10, MIN_TIMEOUT_SECS as i64) as u64,
        }
    }

    /// Enabled and carrying both credentials.
    pub fn is_ready(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty() && !self.database_id.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(MIN_TIMEOUT_SECS))
    }
}

/// Creates one database page per saved note.
pub struct NotionClient {
    client: Client,
}

impl Default for NotionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NotionClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Returns the created page id.
    pub async fn create_page(&self, cfg: &NotionConfig, note: &StructuredNote) -> Result<String> {
        let body = page_body(&cfg.database_id, note);
        let resp = self
            .client
            .post(PAGES_URL)
            .bearer_auth(cfg.api_key.trim())
            .header("Notion-Version", NOTION_VERSION)
            .timeout(cfg.timeout())
            .json(&body)
            .send()
            .await
            .context("notion post")?
            .error_for_status()
            .context("notion non-2xx")?;
        let v: serde_json::Value = resp.json().await.context("notion response body")?;
        Ok(v.get("id").and_then(|id| id.as_str()).unwrap_or_default().to_string())
    }
}

fn rich_text(s: &str) -> serde_json::Value {
    let content: String = s.chars().take(TEXT_LIMIT).collect();
    serde_json::json!([{ "type": "text", "text": { "content": content } }])
}

fn paragraph(s: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": rich_text(s) }
    })
}

fn bullet(s: &str) -> serde_json::Value {
    serde_json::json!({
        "object": "block",
        "type": "bulleted_list_item",
        "bulleted_list_item": { "rich_text": rich_text(s) }
    })
}

/// Page payload: title, URL, source and tags as properties; summary and key points as blocks.
pub fn page_body(database_id: &str, note: &StructuredNote) -> serde_json::Value {
    let tags: Vec<serde_json::Value> = note
        .tags
        .iter()
        .map(|t| serde_json::json!({ "name": t.replace(',', " ") }))
        .collect();
    let url = if note.link.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::Value::String(note.link.clone())
    };

    let mut children = vec![paragraph(&note.summary)];
    children.extend(note.key_points.iter().map(|p| bullet(p)));

    serde_json::json!({
        "parent": { "database_id": database_id.trim() },
        "properties": {
            "Name": { "title": rich_text(&note.title) },
            "URL": { "url": url },
            "Source": { "rich_text": rich_text(&note.source) },
            "Tags": { "multi_select": tags },
        },
        "children": children,
    })
}
