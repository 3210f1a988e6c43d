//! Brush recommender: HTTP entrypoint.
//! Boots the Axum service on Shuttle: command surface, pool jobs, optional scheduler and
//! Prometheus exposition.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use brush_recommender::api::{self, AppState};
use brush_recommender::config::app::env_flag;
use brush_recommender::config::AppConfig;
use brush_recommender::engine::BrushEngine;
use brush_recommender::ingest::config::FeedsCache;
use brush_recommender::ingest::providers::RssArticleSource;
use brush_recommender::ingest::scheduler::{spawn_pool_jobs, PoolSchedulerCfg};
use brush_recommender::metrics::Metrics;
use brush_recommender::pool::{PoolManager, PoolStore, RefreshOptions};
use brush_recommender::telemetry;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = AppConfig::from_env();

    // A broken feed file is fatal at boot; later edits are picked up by mtime.
    let feeds = Arc::new(FeedsCache::new(cfg.feeds_path.clone()));
    let loaded = feeds.current().context("loading feed config")?;
    tracing::info!(
        path = %cfg.feeds_path.display(),
        categories = loaded.categories().count(),
        "feeds loaded"
    );

    let source = Arc::new(RssArticleSource::new(cfg.fetch_timeout)?);
    let pool = Arc::new(PoolManager::new(
        PoolStore::new(cfg.pool_path.clone()),
        Arc::clone(&feeds),
        source,
        RefreshOptions::from(&cfg),
    ));
    let engine = Arc::new(BrushEngine::from_config(cfg.clone())?.with_feeds(feeds));

    if env_flag("BRUSH_POOL_SCHEDULER") {
        let _jobs = spawn_pool_jobs(
            Arc::clone(&pool),
            PoolSchedulerCfg {
                refresh_interval_secs: cfg.refresh_interval_secs,
                cleanup_interval_secs: cfg.cleanup_interval_secs,
                retention_days: cfg.retention_days,
            },
        );
        tracing::info!(
            refresh_secs = cfg.refresh_interval_secs,
            cleanup_secs = cfg.cleanup_interval_secs,
            "pool scheduler started"
        );
    }

    let mut router = api::create_router(AppState { engine, pool });
    if env_flag("BRUSH_METRICS") {
        let metrics = Metrics::init(&cfg)?;
        router = router.merge(metrics.router());
    }

    Ok(router.into())
}
