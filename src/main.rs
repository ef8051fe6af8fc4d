//! # BIP Explorer CLI (`bipx`)
//!
//! The `bipx` binary fronts the same pipeline the HTTP API uses: cache
//! initialization, one-shot refresh, document inspection, categorization
//! debugging, and the API server itself.
//!
//! ## Usage
//!
//! ```bash
//! bipx --config ./config/bipx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bipx init` | Create the cache directory or SQLite database |
//! | `bipx refresh` | Fetch, parse, categorize, and persist the collection |
//! | `bipx get <number>` | Print one document's metadata |
//! | `bipx stats` | Print aggregate statistics over the cache |
//! | `bipx categorize <number>` | Show topic tags for a number |
//! | `bipx serve` | Start the JSON HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use bip_explorer::categorize::{categorize, categorize_by_keywords};
use bip_explorer::config::{self, Config};
use bip_explorer::refresh::run_refresh;
use bip_explorer::server::run_server;
use bip_explorer::source::GithubSource;
use bip_explorer::stats::compute_stats;
use bip_explorer::store::{init_store, open_store, BipStore, SystemClock};

/// BIP Explorer — fetch, parse, categorize, and serve Bitcoin Improvement
/// Proposals.
#[derive(Parser)]
#[command(
    name = "bipx",
    about = "BIP Explorer — fetch, parse, categorize, and serve Bitcoin Improvement Proposals",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bipx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the cache backend.
    ///
    /// Creates the cache directory (file backend) or the SQLite database
    /// and schema (database backend). Idempotent.
    Init,

    /// Fetch the full collection from upstream and persist it.
    ///
    /// Runs the whole pipeline once: list files, fetch content, parse
    /// metadata, categorize, and replace the cached collection.
    Refresh,

    /// Print one document's metadata.
    Get {
        /// Document number.
        number: u32,
    },

    /// Print aggregate statistics over the cached collection.
    Stats,

    /// Show topic tags for a document number.
    ///
    /// By default prints the curated-table tags (the ones the API
    /// serves). With `--keywords` the cached document is also run through
    /// the keyword rule engine for comparison.
    Categorize {
        /// Document number.
        number: u32,

        /// Also run the keyword rule engine against the cached document.
        #[arg(long)]
        keywords: bool,
    },

    /// Start the JSON HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind`, spawns the
    /// background refresher and the explanation sweep, and serves until
    /// terminated.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The plain categorize path is pure and needs no configuration.
    if let Commands::Categorize {
        number,
        keywords: false,
    } = &cli.command
    {
        println!("BIP {}: {}", number, categorize(*number).join(", "));
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            init_store(&cfg).await?;
            println!("Cache initialized successfully.");
        }
        Commands::Refresh => {
            run_refresh_command(&cfg).await?;
        }
        Commands::Get { number } => {
            run_get(&cfg, number).await?;
        }
        Commands::Stats => {
            run_stats(&cfg).await?;
        }
        Commands::Categorize { number, .. } => {
            run_categorize_keywords(&cfg, number).await?;
        }
        Commands::Serve => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bip_explorer=info")),
                )
                .init();
            run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_refresh_command(cfg: &Config) -> anyhow::Result<()> {
    let store = open_store(cfg, Arc::new(SystemClock)).await?;
    let source = GithubSource::new(&cfg.upstream)?;

    let outcome = run_refresh(&source, store.as_ref()).await?;

    println!("refresh {}/{}", cfg.upstream.owner, cfg.upstream.repo);
    println!("  fetched: {} files", outcome.fetched);
    println!("  parsed:  {} documents", outcome.parsed);
    if outcome.skipped > 0 {
        println!("  skipped: {} (no document number)", outcome.skipped);
    }
    println!("ok");
    Ok(())
}

async fn run_get(cfg: &Config, number: u32) -> anyhow::Result<()> {
    let store = open_store(cfg, Arc::new(SystemClock)).await?;

    let Some(bip) = store.get(number).await? else {
        anyhow::bail!("BIP {} is not in the cache; run `bipx refresh` first", number);
    };

    println!("BIP {}: {}", bip.number, bip.title);
    println!("  Authors:    {}", bip.authors.join(", "));
    println!("  Status:     {}", bip.status);
    println!("  Type:       {}", bip.kind);
    if !bip.created.is_empty() {
        println!("  Created:    {}", bip.created);
    }
    if let Some(layer) = &bip.layer {
        println!("  Layer:      {}", layer);
    }
    println!("  Categories: {}", bip.categories.join(", "));
    if !bip.replaces.is_empty() {
        println!("  Replaces:   {:?}", bip.replaces);
    }
    if !bip.replaced_by.is_empty() {
        println!("  Replaced by: {:?}", bip.replaced_by);
    }
    if !bip.abstract_text.is_empty() {
        println!();
        println!("{}", bip.abstract_text);
    }
    if let Some(explanation) = &bip.explanation {
        println!();
        println!("In plain terms: {}", explanation);
    }
    Ok(())
}

async fn run_stats(cfg: &Config) -> anyhow::Result<()> {
    let store = open_store(cfg, Arc::new(SystemClock)).await?;
    let bips = store.get_all().await?;
    let stats = compute_stats(&bips);

    println!("BIP Explorer — Cache Stats");
    println!("==========================");
    println!();
    println!("  Documents:       {}", stats.total_bips);
    println!("  Final:           {}", stats.final_bips);
    println!("  Active:          {}", stats.active_bips);
    println!("  Draft:           {}", stats.draft_bips);
    println!();
    println!("  Standards Track: {}", stats.standards_track);
    println!("  Informational:   {}", stats.informational);
    println!("  Process:         {}", stats.process);
    println!();
    println!("  Contributors:    {}", stats.contributors);

    let last = match store.cache_age().await? {
        Some(ts) => format_ts_relative(ts),
        None => "never".to_string(),
    };
    println!("  Last refresh:    {}", last);
    println!();
    Ok(())
}

async fn run_categorize_keywords(cfg: &Config, number: u32) -> anyhow::Result<()> {
    println!("BIP {} (curated): {}", number, categorize(number).join(", "));

    let store = open_store(cfg, Arc::new(SystemClock)).await?;
    match store.get(number).await? {
        Some(bip) => {
            println!(
                "BIP {} (keywords): {}",
                number,
                categorize_by_keywords(&bip).join(", ")
            );
        }
        None => {
            println!(
                "BIP {} is not in the cache; run `bipx refresh` to compare keyword tags.",
                number
            );
        }
    }
    Ok(())
}

/// Format an epoch-millisecond timestamp as a relative time string
/// (e.g. "3 hours ago").
fn format_ts_relative(ts_ms: i64) -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let delta = (now - ts_ms) / 1000;

    if delta < 0 {
        return format_ts_iso(ts_ms);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts_ms)
    }
}

fn format_ts_iso(ts_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}
