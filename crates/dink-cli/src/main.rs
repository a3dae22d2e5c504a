//! Dink CLI
//!
//! Records matches, manages profiles and venues in the local cache,
//! generates and applies profile claim codes, and triggers sync passes
//! against the remote store.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};

use dink_core::tracing_init::init_tracing;
use dink_sync::model::AuthSession;
use dink_sync::remote::HttpRemoteStore;
use dink_sync::SyncContext;

mod match_cmd;
mod profile_cmd;
mod sync_cmd;
mod venue_cmd;

#[derive(Parser, Debug)]
#[command(name = "dink")]
#[command(version, about = "Dink - local-first pickleball match recorder")]
struct Cli {
    /// Database file path
    #[arg(long, env = "DINK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Remote store base URL (e.g. "<https://api.dink.app>")
    #[arg(long, env = "DINK_REMOTE_URL")]
    remote_url: Option<String>,

    /// Authenticated backend account id
    #[arg(long, env = "DINK_USER_ID")]
    user_id: Option<String>,

    /// Bearer token for remote store calls
    #[arg(long, env = "DINK_ACCESS_TOKEN")]
    access_token: Option<String>,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long, default_value = "info", env = "DINK_LOG_LEVEL")]
    log_level: String,

    /// Emit structured JSON log lines
    #[arg(long, env = "DINK_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage profiles and the device's active profile
    Profile {
        #[command(subcommand)]
        cmd: profile_cmd::ProfileCmd,
    },
    /// Manage venues
    Venue {
        #[command(subcommand)]
        cmd: venue_cmd::VenueCmd,
    },
    /// Record and verify matches
    Match {
        #[command(subcommand)]
        cmd: match_cmd::MatchCmd,
    },
    /// Fire a sync trigger against the remote store
    Sync,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&format!("dink={}", cli.log_level), cli.log_json);

    let config = dink_core::config::load_config()?;

    let db_path = cli
        .db_path
        .clone()
        .or_else(|| config.storage.database_path.clone())
        .or_else(dink_core::config::default_database_path)
        .context("no database path available; pass --db-path")?;
    tracing::debug!(path = %db_path.display(), "Resolved database path");

    let remote_url = cli.remote_url.clone().or_else(|| config.remote.base_url.clone());
    // A client is always wired so the context is uniform; commands that
    // actually reach the remote check remote_url first.
    let remote = HttpRemoteStore::new(
        remote_url.as_deref().unwrap_or("http://localhost"),
        cli.access_token.as_deref(),
        Duration::from_secs(config.remote.timeout_secs),
    )
    .map_err(|e| anyhow::anyhow!("failed to build remote client: {e}"))?;

    #[allow(clippy::cast_possible_wrap)]
    let ctx = SyncContext::open(
        &db_path,
        remote,
        (config.sync.sync_throttle_secs * 1000) as i64,
        (config.sync.activity_throttle_secs * 1000) as i64,
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to open local store: {e}"))?;

    let session = cli.user_id.as_ref().map(|user_id| AuthSession {
        user_id: user_id.clone(),
        access_token: cli.access_token.clone(),
    });

    match cli.command {
        Command::Profile { cmd } => profile_cmd::run(&ctx, cmd, session.as_ref()).await,
        Command::Venue { cmd } => venue_cmd::run(&ctx, cmd).await,
        Command::Match { cmd } => match_cmd::run(&ctx, cmd).await,
        Command::Sync => {
            if remote_url.is_none() {
                bail!("no remote store configured; set --remote-url or remote.base_url");
            }
            sync_cmd::run(&ctx, session.as_ref()).await
        }
    }
}
