//! aura-sync - Listening History Synchronizer entry point
//!
//! Subcommands:
//! - `import` folds a device-export CSV into the deduplicated catalog
//! - `compact` repairs historical duplicate catalog rows
//! - `sync` reconciles pending entries into the remote playlist
//! - `stats` prints catalog counts

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aura_common::config::{ensure_root_folder, resolve_root_folder, TomlConfig};
use aura_sync::catalog::{CatalogStore, Compactor, MergeEngine, SongKey};
use aura_sync::import::read_history_csv;
use aura_sync::reconciler::{PlaylistConfig, PlaylistReconciler};
use aura_sync::resolver::{CandidateResolver, ResolutionCache, ThrottleConfig};
use aura_sync::video::{VideoApi, YouTubeClient};

/// Command-line arguments for aura-sync
#[derive(Parser, Debug)]
#[command(name = "aura-sync")]
#[command(about = "Listening-history playlist synchronizer")]
#[command(version)]
struct Cli {
    /// Data root folder (overrides AURA_ROOT and the config file)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a device-export CSV into the catalog
    Import {
        /// Path to the export file
        csv: PathBuf,
    },
    /// Collapse duplicate (title, artist) entries to the most recent
    Compact,
    /// Synchronize pending catalog entries into the remote playlist
    Sync {
        /// Existing playlist id (skips the lookup by name)
        #[arg(long)]
        playlist_id: Option<String>,
        /// Bearer access token (overrides the config file)
        #[arg(long, env = "AURA_YT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Print catalog counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aura_sync=info,aura_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = TomlConfig::load().context("Failed to load config file")?;
    let root = resolve_root_folder(cli.root_folder.as_deref(), &config);
    let db_path = ensure_root_folder(&root).context("Failed to initialize root folder")?;

    info!("Root folder: {}", root.display());

    let db = aura_common::db::init_database(&db_path).await?;
    let store = CatalogStore::new(db);

    match cli.command {
        Command::Import { csv } => {
            let records = read_history_csv(&csv)?;
            let outcome = MergeEngine::new(store).merge(records).await?;
            println!(
                "Imported {} rows ({} unique): {} new, {} updated, {} unchanged",
                outcome.scanned,
                outcome.unique_in_batch,
                outcome.inserted,
                outcome.updated,
                outcome.unchanged
            );
        }

        Command::Compact => {
            let outcome = Compactor::new(store).compact().await?;
            println!(
                "Compacted catalog: {} -> {} entries ({} duplicates removed)",
                outcome.original_count, outcome.new_count, outcome.removed_count
            );
        }

        Command::Sync { playlist_id, token } => {
            let token = token
                .or_else(|| config.youtube_access_token.clone())
                .context(
                    "No access token: pass --token or set youtube_access_token in config.toml",
                )?;

            let songs: Vec<SongKey> = store
                .all()
                .await?
                .into_iter()
                .map(|entry| SongKey::new(entry.title, entry.artist))
                .collect();
            if songs.is_empty() {
                bail!("Catalog is empty; run `aura-sync import` first");
            }

            let api: Arc<dyn VideoApi> = Arc::new(YouTubeClient::new(token)?);
            let cache = Arc::new(ResolutionCache::new());
            let resolver =
                CandidateResolver::new(api.clone(), cache, throttle_config(&config));
            let reconciler = PlaylistReconciler::new(
                store,
                api,
                resolver,
                playlist_config(&config),
            );

            // Ctrl+C stops outbound calls after the one in flight;
            // insertions already performed stay committed
            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, stopping after the current call");
                    signal_cancel.cancel();
                }
            });

            let outcome = reconciler
                .reconcile(&songs, playlist_id.as_deref(), &cancel)
                .await?;

            println!(
                "Synchronized {} of {} requested songs ({} already added, {} not in catalog)",
                outcome.added_count,
                outcome.requested_count,
                outcome.already_added_count,
                outcome.not_found_count
            );
            println!("Playlist: {}", outcome.playlist_url);
        }

        Command::Stats => {
            let total = store.count().await?;
            let pending = store.count_pending().await?;
            println!("{total} catalog entries, {pending} pending playlist sync");
        }
    }

    Ok(())
}

/// Throttle settings with config-file overrides applied
fn throttle_config(config: &TomlConfig) -> ThrottleConfig {
    let mut throttle = ThrottleConfig::default();
    if let Some(overrides) = &config.throttle {
        if let Some(v) = overrides.base_delay_ms {
            throttle.base_delay_ms = v;
        }
        if let Some(v) = overrides.large_batch_delay_ms {
            throttle.large_batch_delay_ms = v;
        }
        if let Some(v) = overrides.large_batch_threshold {
            throttle.large_batch_threshold = v;
        }
    }
    throttle
}

/// Playlist settings with config-file overrides applied
fn playlist_config(config: &TomlConfig) -> PlaylistConfig {
    let mut playlist = PlaylistConfig::default();
    if let Some(overrides) = &config.playlist {
        if let Some(title) = &overrides.title {
            playlist.title = title.clone();
        }
        if let Some(description) = &overrides.description {
            playlist.description = description.clone();
        }
    }
    playlist
}
