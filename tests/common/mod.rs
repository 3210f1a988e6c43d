// tests/common/mod.rs
//
// Shared fixtures: a temp workspace with a feeds file and pool snapshot, plus in-memory
// collaborators for the engine.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use brush_recommender::config::AppConfig;
use brush_recommender::engine::{BrushEngine, CommandContext, Reply};
use brush_recommender::ingest::{category_tags, item_key};
use brush_recommender::model::{ContentItem, ContentPool};
use brush_recommender::pool::PoolStore;
use brush_recommender::profile::UserProfile;
use brush_recommender::reader::{BodyReader, BodyText, ReaderStatus};
use brush_recommender::sink::{NoteSink, NotionConfig, SinkReport, SinkStatus, StructuredNote};
use brush_recommender::tracker::{Action, BehaviorEvent, EventLog};
use brush_recommender::Command;

/// Feed categories in the order the feeds file lists them.
pub const ALL_CATEGORIES: [&str; 6] = [
    "priority_hn_popular_2025",
    "ai_ml",
    "design_product",
    "tech_programming",
    "business_startup",
    "science_general",
];

pub fn write_feeds(path: &Path, categories: &[&str]) {
    let mut map = serde_json::Map::new();
    for c in categories {
        map.insert(
            c.to_string(),
            serde_json::json!([{ "name": format!("{c} blog"), "url": format!("https://{c}.test/rss") }]),
        );
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).unwrap();
    }
    std::fs::write(path, serde_json::Value::Object(map).to_string()).unwrap();
}

pub fn article(category: &str, n: usize) -> ContentItem {
    let url = format!("https://{category}.test/post-{n}");
    ContentItem {
        item_key: item_key(Some(&url), "", "", ""),
        title: format!("{category} post {n}"),
        summary: format!("Summary of {category} post {n}. It has two sentences."),
        url: Some(url),
        source: format!("{category} blog"),
        tags: category_tags(category),
        category: category.to_string(),
        fetched_at: Some(Utc::now()),
        published_at: None,
        recommended_count: 0,
    }
}

pub fn pool_of(items: Vec<ContentItem>) -> ContentPool {
    ContentPool {
        pool_size: items.len(),
        articles: items,
        last_refresh: Some(Utc::now()),
        ..ContentPool::default()
    }
}

/// Reader that returns a fixed body for every URL.
pub struct StubReader(pub Option<String>);

#[async_trait]
impl BodyReader for StubReader {
    async fn fetch_body(&self, url: &str, _timeout: Duration, _max_chars: usize) -> BodyText {
        match (&self.0, url.is_empty()) {
            (_, true) => BodyText {
                text: String::new(),
                status: ReaderStatus::EmptyUrl,
            },
            (Some(text), false) => BodyText {
                text: text.clone(),
                status: ReaderStatus::Ok,
            },
            (None, false) => BodyText {
                text: String::new(),
                status: ReaderStatus::Error,
            },
        }
    }
}

/// Sink that records notes and answers with a fixed status.
pub struct RecordingSink {
    pub status: SinkStatus,
    pub notes: Mutex<Vec<(StructuredNote, NotionConfig)>>,
}

impl RecordingSink {
    pub fn new(status: SinkStatus) -> Self {
        Self {
            status,
            notes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl NoteSink for RecordingSink {
    async fn persist(&self, note: &StructuredNote, remote: &NotionConfig) -> SinkReport {
        self.notes.lock().push((note.clone(), remote.clone()));
        SinkReport {
            status: self.status,
            stores: vec!["local".into()],
            error: None,
        }
    }
}

#[derive(Default)]
pub struct MemoryEvents(pub Mutex<Vec<BehaviorEvent>>);

impl MemoryEvents {
    pub fn actions(&self) -> Vec<Action> {
        self.0.lock().iter().map(|e| e.action).collect()
    }
}

impl EventLog for MemoryEvents {
    fn record(&self, event: BehaviorEvent) {
        self.0.lock().push(event);
    }
}

/// Temp directory holding feeds, pool, profiles and logs for one test.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub cfg: AppConfig,
    pub events: Arc<MemoryEvents>,
    pub sink: Arc<RecordingSink>,
}

impl Workspace {
    pub fn new(categories: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::rooted_at(dir.path().join("data"), dir.path().join("shared"));
        cfg.quick_learn_interactions = 20;
        write_feeds(&cfg.feeds_path, categories);
        Self {
            dir,
            cfg,
            events: Arc::new(MemoryEvents::default()),
            sink: Arc::new(RecordingSink::new(SinkStatus::SavedLocal)),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn pool_store(&self) -> PoolStore {
        PoolStore::new(self.cfg.pool_path.clone())
    }

    pub fn write_pool(&self, items: Vec<ContentItem>) {
        self.pool_store().replace(&pool_of(items)).unwrap();
    }

    pub fn engine_with(&self, reader: StubReader) -> BrushEngine {
        BrushEngine::from_config(self.cfg.clone())
            .unwrap()
            .with_reader(Arc::new(reader))
            .with_sink(self.sink.clone())
            .with_events(self.events.clone())
    }

    pub fn engine(&self) -> BrushEngine {
        self.engine_with(StubReader(None))
    }
}

pub async fn send(engine: &BrushEngine, user: &str, text: &str) -> Reply {
    engine
        .handle(user, Command::parse::<&str>(text, &[]), &CommandContext::default())
        .await
        .unwrap()
}

pub fn profile(engine: &BrushEngine, user: &str) -> UserProfile {
    engine.profiles().load(user)
}
