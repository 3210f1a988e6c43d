// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use tokio::task::JoinHandle;

use crate::error::BrushError;
use crate::pool::PoolManager;

#[derive(Clone, Copy, Debug)]
pub struct PoolSchedulerCfg {
    pub refresh_interval_secs: u64,
    pub cleanup_interval_secs: u64,
    pub retention_days: i64,
}

/// Spawn refresh and cleanup on independent intervals. Both tick immediately on start.
///
/// A tick that finds its job already running is skipped; config errors are logged and the
/// loop keeps going so a fixed feeds file is picked up on the next tick.
pub fn spawn_pool_jobs(
    manager: Arc<PoolManager>,
    cfg: PoolSchedulerCfg,
) -> (JoinHandle<()>, JoinHandle<()>) {
    let refresh_mgr = Arc::clone(&manager);
    let refresh = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.refresh_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            match refresh_mgr.refresh().await {
                Ok(report) => {
                    gauge!("pool_last_refresh_ts").set(report.last_refresh.timestamp() as f64);
                }
                Err(BrushError::Busy(job)) => tracing::debug!(job, "tick skipped"),
                Err(e) => tracing::error!(error = %e, "scheduled refresh failed"),
            }
        }
    });

    let cleanup = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.cleanup_interval_secs.max(1)));
        loop {
            ticker.tick().await;
            match manager.cleanup(cfg.retention_days).await {
                Ok(_) => {}
                Err(BrushError::Busy(job)) => tracing::debug!(job, "tick skipped"),
                Err(e) => tracing::error!(error = %e, "scheduled cleanup failed"),
            }
        }
    });

    (refresh, cleanup)
}
