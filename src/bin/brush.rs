//! brush: local command runner and pool maintenance tool.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use brush_recommender::commands::Command;
use brush_recommender::config::AppConfig;
use brush_recommender::engine::{BrushEngine, CommandContext, Reply};
use brush_recommender::ingest::config::FeedsCache;
use brush_recommender::ingest::providers::RssArticleSource;
use brush_recommender::pool::{PoolManager, PoolStore, RefreshOptions};
use brush_recommender::telemetry;

#[derive(Parser)]
#[command(name = "brush")]
#[command(about = "Short-card recommender: run commands and maintain the content pool")]
struct Cli {
    /// Data directory (profiles, events, saved notes, default feeds file)
    #[arg(long, env = "BRUSH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Feed configuration file (JSON or TOML)
    #[arg(long, env = "BRUSH_FEEDS_PATH")]
    feeds: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run one chat command for a user, e.g. `brush command alice /brush choose ai`
    Command {
        user: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Content pool jobs
    Pool {
        #[command(subcommand)]
        cmd: PoolCmd,
    },
}

#[derive(Subcommand)]
enum PoolCmd {
    /// Fetch all sources and replace the snapshot
    Refresh,
    /// Drop items older than the retention window
    Cleanup {
        #[arg(long)]
        days: Option<i64>,
    },
    /// Print the current snapshot summary
    Show,
}

fn print_reply(reply: &Reply) {
    println!("{}", reply.message);
    if !reply.buttons.is_empty() {
        let rows: Vec<String> = reply
            .buttons
            .iter()
            .map(|row| row.iter().map(|b| format!("[{}]", b.text)).collect::<Vec<_>>().join(" "))
            .collect();
        println!("Buttons: {}", rows.join(" | "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    let cli = Cli::parse();

    let mut cfg = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        let defaults = AppConfig::rooted_at(dir.clone(), dir.join("shared"));
        cfg.profiles_dir = defaults.profiles_dir;
        cfg.events_path = defaults.events_path;
        cfg.notes_path = defaults.notes_path;
        if cli.feeds.is_none() {
            cfg.feeds_path = defaults.feeds_path;
        }
        cfg.data_dir = dir;
    }
    if let Some(path) = cli.feeds {
        cfg.feeds_path = path;
    }
    let feeds = Arc::new(FeedsCache::new(cfg.feeds_path.clone()));

    match cli.cmd {
        Cmd::Command { user, text } => {
            let text = if text.is_empty() { "/brush".to_string() } else { text.join(" ") };
            let engine = BrushEngine::from_config(cfg)?.with_feeds(feeds);
            let reply = engine
                .handle(&user, Command::parse::<&str>(&text, &[]), &CommandContext::default())
                .await?;
            print_reply(&reply);
        }
        Cmd::Pool { cmd } => {
            let manager = PoolManager::new(
                PoolStore::new(cfg.pool_path.clone()),
                feeds,
                Arc::new(RssArticleSource::new(cfg.fetch_timeout)?),
                RefreshOptions::from(&cfg),
            );
            match cmd {
                PoolCmd::Refresh => {
                    let report = manager.refresh().await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                PoolCmd::Cleanup { days } => {
                    let report = manager.cleanup(days.unwrap_or(cfg.retention_days).max(1)).await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                PoolCmd::Show => {
                    let pool = manager.snapshot();
                    println!(
                        "size={} min_threshold={} max={} last_refresh={} last_cleanup={}",
                        pool.effective_size(),
                        pool.min_threshold,
                        pool.max_size,
                        pool.last_refresh.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into()),
                        pool.last_cleanup.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into()),
                    );
                    for a in &pool.articles {
                        println!("- [{}] {} ({})", a.category, a.title, a.source);
                    }
                }
            }
        }
    }
    Ok(())
}
