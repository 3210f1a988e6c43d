//! Error types surfaced at the crate boundary.
//!
//! Only configuration problems are fatal. Fetch failures, pool shortages, sink failures and
//! corrupt profiles are recovered where they happen and never reach this type.

use std::path::PathBuf;

/// The feed configuration could not be read or does not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum FeedConfigError {
    #[error("reading feed config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing feed config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("feed config {path} has an unexpected shape: {reason}")]
    Shape { path: PathBuf, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum BrushError {
    #[error(transparent)]
    Config(#[from] FeedConfigError),
    /// Another refresh (or cleanup) is already running in this process.
    #[error("pool {0} already running")]
    Busy(&'static str),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type BrushResult<T> = Result<T, BrushError>;
