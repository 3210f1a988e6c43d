use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::AppConfig;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and publish the static pool limits.
    pub fn init(cfg: &AppConfig) -> Result<Self> {
        // Default buckets; histograms render as summaries.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_gauge!("pool_max_size", "Configured upper bound of the pool.");
        describe_gauge!("pool_low_water", "Pool size below which reads report POOL_LOW.");
        describe_histogram!("rank_duration_ms", "Time to score and sort one candidate set.");
        describe_histogram!("ingest_parse_ms", "Feed document parse time.");
        gauge!("pool_max_size").set(cfg.pool_max as f64);
        gauge!("pool_low_water").set(cfg.pool_low_water as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
