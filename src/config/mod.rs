//! Runtime configuration. Feed definitions live in [`crate::ingest::config`].

pub mod app;

pub use app::AppConfig;
