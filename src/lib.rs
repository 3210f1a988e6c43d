// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod learning;
pub mod metrics;
pub mod model;
pub mod render;
pub mod storage;
pub mod telemetry;
pub mod tracker;

// Content pool: feeds, fetching, lifecycle jobs
pub mod ingest;
pub mod pool;

// Per-user state and ranking
pub mod onboarding;
pub mod profile;
pub mod ranking;

// Deep read and saved-note persistence
pub mod reader;
pub mod sink;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::commands::Command;
pub use crate::engine::{BrushEngine, CommandContext, Reply};
pub use crate::error::{BrushError, BrushResult, FeedConfigError};
