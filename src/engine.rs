// src/engine.rs
//! # Command engine
//! Dispatches parsed commands against one user's profile: onboarding transitions, the
//! recommendation step, feedback, deep reads and saves.
//!
//! Each command loads the profile, mutates it, and writes it back once. Collaborators
//! (body reader, note sink, event log) are trait objects so tests can swap them out.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::commands::Command;
use crate::config::AppConfig;
use crate::error::BrushResult;
use crate::ingest::config::{FeedsCache, FeedsConfig};
use crate::learning::ViewOutcome;
use crate::model::ContentItem;
use crate::onboarding::{self, catalog, CompletionTrigger, Transition, MIN_SELECTIONS};
use crate::pool::PoolStore;
use crate::profile::store::ProfileStore;
use crate::profile::{delta, UserProfile};
use crate::ranking::{rank, RankContext, ScoreBreakdown};
use crate::reader::{self, BodyReader, HttpBodyReader};
use crate::render::{self, ButtonRows};
use crate::sink::{KnowledgeSink, LocalNotes, NoteSink, NotionConfig, StructuredNote};
use crate::tracker::{Action, BehaviorEvent, EventLog, JsonlEventLog};

/// Source-history entries that count as "recent" for the diversity component.
pub const RECENT_SOURCE_WINDOW: usize = 5;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("commands_total", "Handled user commands by kind.");
    });
}

/// Per-request overrides supplied by the caller (chat adapter, HTTP body).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CommandContext {
    /// Replaces the env-configured remote note store for this request.
    #[serde(default)]
    pub notion: Option<NotionConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub message: String,
    #[serde(default)]
    pub buttons: ButtonRows,
}

impl Reply {
    fn new(message: impl Into<String>, buttons: ButtonRows) -> Self {
        Self {
            message: message.into(),
            buttons,
        }
    }

    fn prefixed(mut self, line: &str) -> Self {
        self.message = render::prefix(line, &self.message);
        self
    }
}

/// Outcome of one recommendation step.
#[derive(Clone, Debug)]
pub struct Recommendation {
    pub item: ContentItem,
    /// `None` for the empty-pool placeholder.
    pub score: Option<ScoreBreakdown>,
    pub pool_low: bool,
    pub pool_empty: bool,
    pub outcome: ViewOutcome,
}

pub struct BrushEngine {
    cfg: AppConfig,
    feeds: Arc<FeedsCache>,
    pool: PoolStore,
    profiles: ProfileStore,
    reader: Arc<dyn BodyReader>,
    sink: Arc<dyn NoteSink>,
    events: Arc<dyn EventLog>,
}

impl BrushEngine {
    /// Wire the default collaborators from config paths.
    pub fn from_config(cfg: AppConfig) -> Result<Self> {
        let feeds = Arc::new(FeedsCache::new(cfg.feeds_path.clone()));
        Ok(Self {
            feeds,
            pool: PoolStore::new(cfg.pool_path.clone()),
            profiles: ProfileStore::new(cfg.profiles_dir.clone()),
            reader: Arc::new(HttpBodyReader::new()?),
            sink: Arc::new(KnowledgeSink::new(LocalNotes::new(cfg.notes_path.clone()))),
            events: Arc::new(JsonlEventLog::new(cfg.events_path.clone())),
            cfg,
        })
    }

    /// Share a feeds cache with other components (pool manager, API).
    pub fn with_feeds(mut self, feeds: Arc<FeedsCache>) -> Self {
        self.feeds = feeds;
        self
    }

    pub fn with_reader(mut self, reader: Arc<dyn BodyReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn NoteSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventLog>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn feeds(&self) -> &Arc<FeedsCache> {
        &self.feeds
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub async fn handle(&self, user_id: &str, cmd: Command, ctx: &CommandContext) -> BrushResult<Reply> {
        ensure_metrics_described();
        counter!("commands_total", "command" => cmd.name()).increment(1);
        tracing::debug!(user_id, command = cmd.name(), "handling command");

        if let Command::Unknown(text) = &cmd {
            tracing::debug!(user_id, text, "unknown command");
            return Ok(Reply::new(render::HELP, Vec::new()));
        }

        let mut profile = self.profiles.load(user_id);
        let reply = match cmd {
            Command::Brush => {
                let feeds = self.feeds.current()?;
                if profile.is_cold_start_active() {
                    self.cold_start_reply(user_id, &mut profile, &feeds)
                } else {
                    self.next_reply(user_id, &mut profile, &feeds, true)
                }
            }
            Command::Choose(alias) => {
                let feeds = self.feeds.current()?;
                self.choose(user_id, &mut profile, &feeds, &alias)
            }
            Command::Start => {
                let feeds = self.feeds.current()?;
                self.start(user_id, &mut profile, &feeds)
            }
            Command::Like => {
                let feeds = self.feeds.current()?;
                self.like(user_id, &mut profile, &feeds)
            }
            Command::Skip => {
                let feeds = self.feeds.current()?;
                self.skip(user_id, &mut profile, &feeds, false)
            }
            Command::Refresh => {
                let feeds = self.feeds.current()?;
                self.skip(user_id, &mut profile, &feeds, true)
            }
            Command::Read => self.read(user_id, &profile).await,
            Command::Save => self.save(user_id, &mut profile, ctx).await,
            Command::Unknown(_) => Reply::new(render::HELP, Vec::new()),
        };

        self.profiles.save(user_id, &profile)?;
        Ok(reply)
    }

    fn log(&self, event: BehaviorEvent) {
        self.events.record(event);
    }

    fn ensure_seeds(&self, profile: &mut UserProfile, feeds: &FeedsConfig) {
        if profile.cold_start.seed_items.is_empty() {
            let pool = self.pool.load();
            onboarding::ensure_seeds(profile, feeds, &pool);
        }
    }

    fn cold_start_reply(&self, user_id: &str, profile: &mut UserProfile, feeds: &FeedsConfig) -> Reply {
        self.ensure_seeds(profile, feeds);
        let seed = profile.cold_start.current_seed();
        profile.last_item = Some(seed.item.clone());
        self.log(
            BehaviorEvent::new(user_id, Action::ColdStartView, Some(&seed.item))
                .with("mode", "cold_start")
                .with("category", seed.category.as_str()),
        );
        Reply::new(
            render::cold_start_card(&profile.cold_start, &seed),
            render::cold_start_buttons(&profile.cold_start),
        )
    }

    /// Rank the pool for this user and record the view on the profile.
    pub fn recommend(&self, user_id: &str, profile: &mut UserProfile, feeds: &FeedsConfig) -> Recommendation {
        let pool = self.pool.load();
        let pool_empty = pool.is_empty();
        let pool_low = pool.is_low(self.cfg.pool_low_water);
        let weights = profile.learning.weights(self.cfg.quick_learn_diversity);

        let (item, score) = if pool.articles.is_empty() {
            (render::building_feed_card(), None)
        } else {
            let seen: HashSet<&str> = profile.read_history.iter().map(String::as_str).collect();
            let mut candidates: Vec<ContentItem> = pool
                .articles
                .iter()
                .filter(|a| !seen.contains(a.item_key.as_str()))
                .cloned()
                .collect();
            if candidates.is_empty() {
                candidates = pool.articles.clone();
            }
            let recent = profile.recent_sources(RECENT_SOURCE_WINDOW).to_vec();
            let ctx = RankContext {
                recent_sources: &recent,
                weights,
                priority_category: feeds.priority_category(self.cfg.priority_category.as_deref()),
            };
            match rank(candidates, profile, &ctx).into_iter().next() {
                Some(top) => (top.item, Some(top.score)),
                None => (render::building_feed_card(), None),
            }
        };

        profile.last_item = Some(item.clone());
        profile.record_read(&item.item_key);
        profile.record_source(&item.source);

        let outcome = profile.learning.record_view(&mut profile.interest_tags);
        if outcome.rebalanced() {
            self.log(
                BehaviorEvent::new(user_id, Action::QuickLearnRebalance, Some(&item))
                    .with("interaction_count", profile.learning.interaction_count),
            );
        }

        if !item.item_key.is_empty() {
            if let Err(e) = self.pool.record_recommendation(&item.item_key) {
                tracing::warn!(item_key = %item.item_key, error = %e, "recommended_count not updated");
            }
        }

        self.log(
            BehaviorEvent::new(user_id, Action::View, Some(&item))
                .with("learning_phase", json!(profile.learning.phase))
                .with("learning_interaction_count", profile.learning.interaction_count)
                .with("recommend_weights", json!(weights))
                .with("score", json!(score)),
        );

        Recommendation {
            item,
            score,
            pool_low,
            pool_empty,
            outcome,
        }
    }

    fn next_reply(
        &self,
        user_id: &str,
        profile: &mut UserProfile,
        feeds: &FeedsConfig,
        include_pool_status: bool,
    ) -> Reply {
        let rec = self.recommend(user_id, profile, feeds);
        let mut message = render::card(&rec.item);
        match rec.outcome {
            ViewOutcome::Learning { count, limit, .. } => {
                message = render::prefix(&render::learning_notice(count, limit), &message);
            }
            ViewOutcome::Graduated { .. } => {
                message = render::prefix(render::STABLE_NOTICE, &message);
            }
            ViewOutcome::Idle => {}
        }
        if include_pool_status {
            message = render::with_pool_status(&message, rec.pool_low, rec.pool_empty);
        }
        Reply::new(message, render::brush_buttons())
    }

    fn completion_reply(
        &self,
        user_id: &str,
        profile: &mut UserProfile,
        feeds: &FeedsConfig,
        selected: Vec<String>,
        trigger: CompletionTrigger,
        item: Option<ContentItem>,
    ) -> Reply {
        let item = item.or_else(|| profile.last_item.clone());
        self.log(
            BehaviorEvent::new(user_id, Action::ColdStartComplete, item.as_ref())
                .with("selected_categories", json!(selected))
                .with("trigger", json!(trigger)),
        );
        tracing::info!(user_id, ?trigger, selected = ?selected, "onboarding completed");
        self.next_reply(user_id, profile, feeds, false)
            .prefixed(&render::completion_notice(&selected))
    }

    fn choose(&self, user_id: &str, profile: &mut UserProfile, feeds: &FeedsConfig, alias: &str) -> Reply {
        if !profile.is_cold_start_active() {
            return Reply::new(render::ONBOARDING_DONE, render::brush_buttons());
        }
        self.ensure_seeds(profile, feeds);
        let limit = self.cfg.quick_learn_interactions;
        let choose_event = |profile: &UserProfile, category: &str| {
            BehaviorEvent::new(user_id, Action::ColdStartChoose, profile.last_item.as_ref())
                .with("alias", alias)
                .with("category", category)
        };

        match onboarding::choose(profile, alias, limit) {
            Transition::MissingAlias => {
                Reply::new(render::alias_prompt(), render::cold_start_buttons(&profile.cold_start))
            }
            Transition::UnknownAlias { input, suggestion } => Reply::new(
                render::unknown_alias(&input, suggestion),
                render::cold_start_buttons(&profile.cold_start),
            ),
            Transition::AlreadySelected { category } => self
                .cold_start_reply(user_id, profile, feeds)
                .prefixed(&format!("✅ Area “{}” is already selected.", catalog::label_for(&category))),
            Transition::Selected { category, count } => {
                self.log(
                    choose_event(&*profile, category.as_str())
                        .with("selected_categories", json!(profile.cold_start.selected_categories)),
                );
                let label = catalog::label_for(&category).to_string();
                let line = if count >= MIN_SELECTIONS {
                    format!("✅ Selected: {label}. Minimum of {MIN_SELECTIONS} reached, tap ✅ to start.")
                } else {
                    format!("✅ Selected: {label}, pick at least {} more.", MIN_SELECTIONS - count)
                };
                self.cold_start_reply(user_id, profile, feeds).prefixed(&line)
            }
            Transition::Completed { selected, trigger, seed } => {
                if trigger == CompletionTrigger::ChooseMaxSelected {
                    if let Some(category) = selected.last() {
                        self.log(
                            choose_event(&*profile, category.as_str()).with("selected_categories", json!(selected)),
                        );
                    }
                }
                self.completion_reply(user_id, profile, feeds, selected, trigger, seed.map(|s| s.item))
            }
            other => {
                tracing::debug!(?other, "unexpected choose transition");
                self.cold_start_reply(user_id, profile, feeds)
            }
        }
    }

    fn start(&self, user_id: &str, profile: &mut UserProfile, feeds: &FeedsConfig) -> Reply {
        if !profile.is_cold_start_active() {
            return Reply::new(render::ALREADY_SMART, render::brush_buttons());
        }
        match onboarding::start(profile, self.cfg.quick_learn_interactions) {
            Transition::NeedMore { missing } => self
                .cold_start_reply(user_id, profile, feeds)
                .prefixed(&format!(
                    "Still need {missing} more area(s), finish picking before recommendations start."
                )),
            Transition::Completed { selected, trigger, seed } => {
                self.completion_reply(user_id, profile, feeds, selected, trigger, seed.map(|s| s.item))
            }
            other => {
                tracing::debug!(?other, "unexpected start transition");
                self.cold_start_reply(user_id, profile, feeds)
            }
        }
    }

    fn like(&self, user_id: &str, profile: &mut UserProfile, feeds: &FeedsConfig) -> Reply {
        if !profile.is_cold_start_active() {
            let tags = profile.last_item_tags();
            profile.adjust_interests(&tags, delta::LIKE);
            self.log(BehaviorEvent::new(user_id, Action::Like, profile.last_item.as_ref()));
            return self
                .next_reply(user_id, profile, feeds, false)
                .prefixed(render::LIKE_ACK);
        }

        self.ensure_seeds(profile, feeds);
        match onboarding::like(profile, self.cfg.quick_learn_interactions) {
            Transition::Liked {
                seed,
                category: Some(_),
                count,
            } => {
                self.log(
                    BehaviorEvent::new(user_id, Action::ColdStartLike, Some(&seed.item))
                        .with("selected_categories", json!(profile.cold_start.selected_categories)),
                );
                let line = if count >= MIN_SELECTIONS {
                    "✅ Area preference recorded (+3), you can tap ✅ to start now."
                } else {
                    "✅ Area preference recorded (+3)"
                };
                self.cold_start_reply(user_id, profile, feeds).prefixed(line)
            }
            Transition::Liked { seed, category: None, .. } => {
                self.log(
                    BehaviorEvent::new(user_id, Action::ColdStartSkip, Some(&seed.item)).with("action", "like"),
                );
                self.cold_start_reply(user_id, profile, feeds)
                    .prefixed("⏭️ Moved to the next area")
            }
            Transition::Completed { selected, trigger, seed } => {
                let item = seed.map(|s| s.item);
                self.log(
                    BehaviorEvent::new(user_id, Action::ColdStartLike, item.as_ref())
                        .with("selected_categories", json!(selected)),
                );
                self.completion_reply(user_id, profile, feeds, selected, trigger, item)
            }
            other => {
                tracing::debug!(?other, "unexpected like transition");
                self.cold_start_reply(user_id, profile, feeds)
            }
        }
    }

    /// `skip` and `refresh`: advance onboarding, or give feedback and move on.
    fn skip(&self, user_id: &str, profile: &mut UserProfile, feeds: &FeedsConfig, refresh: bool) -> Reply {
        if profile.is_cold_start_active() {
            self.ensure_seeds(profile, feeds);
            let Transition::Advanced { seed } = onboarding::skip(profile) else {
                return self.cold_start_reply(user_id, profile, feeds);
            };
            self.log(
                BehaviorEvent::new(user_id, Action::ColdStartSkip, Some(&seed.item))
                    .with("action", if refresh { "refresh" } else { "skip" }),
            );
            return self
                .cold_start_reply(user_id, profile, feeds)
                .prefixed("⏭️ Moved to the next area");
        }

        if refresh {
            self.log(BehaviorEvent::new(user_id, Action::Refresh, profile.last_item.as_ref()));
            return self
                .next_reply(user_id, profile, feeds, false)
                .prefixed(render::REFRESH_ACK);
        }
        let tags = profile.last_item_tags();
        profile.adjust_interests(&tags, delta::SKIP);
        self.log(BehaviorEvent::new(user_id, Action::Skip, profile.last_item.as_ref()));
        self.next_reply(user_id, profile, feeds, false)
            .prefixed(render::SKIP_ACK)
    }

    fn action_buttons(profile: &UserProfile) -> ButtonRows {
        if profile.is_cold_start_active() {
            render::cold_start_buttons(&profile.cold_start)
        } else {
            render::brush_buttons()
        }
    }

    async fn read(&self, user_id: &str, profile: &UserProfile) -> Reply {
        let buttons = Self::action_buttons(profile);
        let Some(item) = profile.last_item.as_ref() else {
            self.log(BehaviorEvent::new(user_id, Action::ReadMiss, None).with("reason", "no_last_item"));
            return Reply::new(render::NOTHING_TO_READ, buttons);
        };
        let deep = reader::deep_read(self.reader.as_ref(), item, self.cfg.deep_read_timeout).await;
        self.log(
            BehaviorEvent::new(user_id, Action::Read, Some(item)).with("deep_read_status", deep.status.as_str()),
        );
        Reply::new(render::deep_read_message(item, &deep), buttons)
    }

    async fn save(&self, user_id: &str, profile: &mut UserProfile, ctx: &CommandContext) -> Reply {
        if profile.is_cold_start_active() {
            self.log(
                BehaviorEvent::new(user_id, Action::ColdStartSaveBlocked, None)
                    .with("reason", "cold_start_not_completed"),
            );
            return Reply::new(render::SAVE_BLOCKED, render::cold_start_buttons(&profile.cold_start));
        }
        let Some(item) = profile.last_item.clone() else {
            self.log(BehaviorEvent::new(user_id, Action::SaveMiss, None).with("reason", "no_last_item"));
            return Reply::new(render::NOTHING_TO_SAVE, render::brush_buttons());
        };

        let now = Utc::now();
        profile.record_saved(&item, now);
        profile.adjust_interests(&item.tags, delta::SAVE);

        let note = StructuredNote::from_item(user_id, &item, now);
        let remote = ctx.notion.as_ref().unwrap_or(&self.cfg.notion);
        let report = self.sink.persist(&note, remote).await;
        self.log(
            BehaviorEvent::new(user_id, Action::Save, Some(&item))
                .with("sink_status", report.status.as_str())
                .with("sink_stores", json!(report.stores)),
        );

        let message = format!(
            "{}\n{}",
            render::saved_message(&item),
            render::save_feedback(report.status)
        );
        Reply::new(message, render::brush_buttons())
    }
}
