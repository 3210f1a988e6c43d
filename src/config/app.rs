// src/config/app.rs
use std::{env, path::PathBuf, time::Duration};

use crate::sink::notion::NotionConfig;

/// Every runtime tunable, resolved once from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub feeds_path: PathBuf,
    pub pool_path: PathBuf,
    pub profiles_dir: PathBuf,
    pub events_path: PathBuf,
    pub notes_path: PathBuf,

    /// Refresh backfills from the previous snapshot below this size.
    pub pool_min: usize,
    pub pool_max: usize,
    /// Read-side threshold for the "pool is low" signal.
    pub pool_low_water: usize,
    pub fetch_timeout: Duration,
    pub deep_read_timeout: Duration,
    pub retention_days: i64,
    pub priority_category: Option<String>,

    pub quick_learn_interactions: u32,
    pub quick_learn_diversity: f64,

    pub refresh_interval_secs: u64,
    pub cleanup_interval_secs: u64,

    pub notion: NotionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::rooted_at(PathBuf::from("data"), PathBuf::from("shared"))
    }
}

impl AppConfig {
    /// Defaults with every file placed under `data_dir` (pool under `shared_dir`).
    pub fn rooted_at(data_dir: PathBuf, shared_dir: PathBuf) -> Self {
        Self {
            feeds_path: data_dir.join("feeds.json"),
            pool_path: shared_dir.join("content_pool.json"),
            profiles_dir: data_dir.join("profiles"),
            events_path: data_dir.join("behavior_events.jsonl"),
            notes_path: data_dir.join("saved_notes.jsonl"),
            data_dir,
            pool_min: 10,
            pool_max: 20,
            pool_low_water: 5,
            fetch_timeout: Duration::from_secs(8),
            deep_read_timeout: Duration::from_secs(6),
            retention_days: 7,
            priority_category: None,
            quick_learn_interactions: 20,
            quick_learn_diversity: 0.4,
            refresh_interval_secs: 30 * 60,
            cleanup_interval_secs: 24 * 3600,
            notion: NotionConfig::default(),
        }
    }

    /// Resolve from env vars, falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let data_dir = env_path("BRUSH_DATA_DIR").unwrap_or_else(|| PathBuf::from("data"));
        let shared_dir = env_path("BRUSH_SHARED_DIR").unwrap_or_else(|| PathBuf::from("shared"));
        let mut cfg = Self::rooted_at(data_dir, shared_dir);

        if let Some(p) = env_path("BRUSH_FEEDS_PATH") {
            cfg.feeds_path = p;
        }
        if let Some(p) = env_path("BRUSH_POOL_PATH") {
            cfg.pool_path = p;
        }
        if let Some(p) = env_path("BRUSH_PROFILES_DIR") {
            cfg.profiles_dir = p;
        }

        cfg.pool_min = env_int("BRUSH_POOL_MIN", cfg.pool_min as i64, 1) as usize;
        cfg.pool_max = env_int("BRUSH_POOL_MAX", cfg.pool_max as i64, 1) as usize;
        if cfg.pool_min > cfg.pool_max {
            cfg.pool_min = cfg.pool_max;
        }
        cfg.pool_low_water = env_int("BRUSH_POOL_LOW_WATER", cfg.pool_low_water as i64, 1) as usize;
        cfg.fetch_timeout = Duration::from_secs(env_int("BRUSH_FETCH_TIMEOUT_SEC", 8, 1) as u64);
        cfg.deep_read_timeout =
            Duration::from_secs(env_int("BRUSH_DEEP_READ_TIMEOUT_SEC", 6, 1) as u64);
        cfg.retention_days = env_int("BRUSH_POOL_RETENTION_DAYS", cfg.retention_days, 1);
        cfg.priority_category = env::var("BRUSH_PRIORITY_CATEGORY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        cfg.quick_learn_interactions = env_int(
            "BRUSH_QUICK_LEARN_INTERACTIONS",
            cfg.quick_learn_interactions as i64,
            1,
        ) as u32;
        cfg.quick_learn_diversity = env_float(
            "BRUSH_QUICK_LEARN_DIVERSITY_WEIGHT",
            cfg.quick_learn_diversity,
            0.0,
            1.0,
        );

        cfg.refresh_interval_secs =
            env_int("BRUSH_REFRESH_INTERVAL_SEC", cfg.refresh_interval_secs as i64, 60) as u64;
        cfg.cleanup_interval_secs =
            env_int("BRUSH_CLEANUP_INTERVAL_SEC", cfg.cleanup_interval_secs as i64, 60) as u64;

        cfg.notion = NotionConfig::from_env();
        cfg
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Integer env var; values below `min` clamp to `min`, garbage falls back to `default`.
pub fn env_int(name: &str, default: i64, min: i64) -> i64 {
    match env::var(name).ok().and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(v) => v.max(min),
        None => default,
    }
}

/// Float env var clamped into `[min, max]`, garbage falls back to `default`.
pub fn env_float(name: &str, default: f64, min: f64, max: f64) -> f64 {
    match env::var(name).ok().and_then(|s| s.trim().parse::<f64>().ok()) {
        Some(v) if v.is_finite() => v.clamp(min, max),
        _ => default,
    }
}

pub fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

pub fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn env_values_clamp_and_fall_back() {
        env::set_var("BRUSH_TEST_INT", "0");
        assert_eq!(env_int("BRUSH_TEST_INT", 20, 1), 1);
        env::set_var("BRUSH_TEST_INT", "abc");
        assert_eq!(env_int("BRUSH_TEST_INT", 20, 1), 20);
        env::remove_var("BRUSH_TEST_INT");

        env::set_var("BRUSH_TEST_FLOAT", "1.7");
        assert!((env_float("BRUSH_TEST_FLOAT", 0.4, 0.0, 1.0) - 1.0).abs() < 1e-9);
        env::set_var("BRUSH_TEST_FLOAT", "NaN");
        assert!((env_float("BRUSH_TEST_FLOAT", 0.4, 0.0, 1.0) - 0.4).abs() < 1e-9);
        env::remove_var("BRUSH_TEST_FLOAT");
    }

    #[serial_test::serial]
    #[test]
    fn from_env_reads_overrides() {
        env::set_var("BRUSH_POOL_MIN", "30");
        env::set_var("BRUSH_POOL_MAX", "12");
        env::set_var("BRUSH_PRIORITY_CATEGORY", " priority_hn ");
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.pool_max, 12);
        assert_eq!(cfg.pool_min, 12);
        assert_eq!(cfg.priority_category.as_deref(), Some("priority_hn"));
        env::remove_var("BRUSH_POOL_MIN");
        env::remove_var("BRUSH_POOL_MAX");
        env::remove_var("BRUSH_PRIORITY_CATEGORY");
    }

    #[test]
    fn truthy_strings() {
        assert!(is_truthy(" Yes "));
        assert!(is_truthy("1"));
        assert!(!is_truthy("off"));
    }
}
