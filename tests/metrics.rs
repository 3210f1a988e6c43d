// tests/metrics.rs
//
// Prometheus exposition after a few commands and a pool refresh. One test per binary:
// the recorder is process-global.
mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use brush_recommender::api::AppState;
use brush_recommender::create_router;
use brush_recommender::ingest::types::{ArticleSource, RawArticle};
use brush_recommender::metrics::Metrics;
use brush_recommender::pool::{PoolManager, PoolStore, RefreshOptions};
use common::{send, Workspace};

struct OneEntry;

#[async_trait]
impl ArticleSource for OneEntry {
    async fn fetch_one(&self, feed_url: &str) -> Result<Option<RawArticle>> {
        Ok(Some(RawArticle {
            title: "Entry".into(),
            link: format!("{feed_url}/entry"),
            ..RawArticle::default()
        }))
    }

    fn name(&self) -> &'static str {
        "one"
    }
}

#[tokio::test]
async fn exposition_lists_pool_and_command_series() {
    let ws = Workspace::new(&["ai_ml", "design_product"]);
    let metrics = Metrics::init(&ws.cfg).unwrap();

    let engine = Arc::new(ws.engine());
    let pool = Arc::new(PoolManager::new(
        PoolStore::new(ws.cfg.pool_path.clone()),
        engine.feeds().clone(),
        Arc::new(OneEntry),
        RefreshOptions::from(&ws.cfg),
    ));
    pool.refresh().await.unwrap();

    send(&engine, "m", "/brush choose ai").await;
    send(&engine, "m", "/brush choose design").await;
    send(&engine, "m", "/brush start").await;

    let app = create_router(AppState { engine, pool }).merge(metrics.router());
    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    for needle in [
        "pool_max_size 20",
        "pool_low_water 5",
        "pool_refresh_runs_total 1",
        "pool_fetch_attempts_total 2",
        "commands_total{command=\"choose\"} 2",
        "commands_total{command=\"start\"} 1",
        "rank_duration_ms",
    ] {
        assert!(text.contains(needle), "metrics exposition missing '{needle}'\n{text}");
    }
}
