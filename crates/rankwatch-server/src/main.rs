//! rankwatch server binary.
//!
//! Reads `rankwatch.toml` (or the path given with `--config`), opens an
//! in-process SQLite store, and either serves the JSON API over HTTP or
//! ingests a batch of scraper observations.
//!
//! ```text
//! rankwatch serve
//! rankwatch --config /etc/rankwatch.toml ingest scrape-2024-06-10.json
//! ```

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::{Parser, Subcommand};
use rankwatch_store_sqlite::SqliteStore;
use rankwatch_tracking::{ScrapeRecord, Tracker};
use settings::ServerConfig;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Place ranking and review tracker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rankwatch.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,
  /// Record every observation in a JSON array of scrape records.
  Ingest {
    /// File produced by the scraper.
    file: PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  let store_path = cfg.store_path();
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let tracker = Tracker::new(Arc::new(store), cfg.policy());

  match cli.command {
    Command::Serve => serve(&cfg, tracker).await,
    Command::Ingest { file } => ingest(&file, &tracker).await,
  }
}

async fn serve(cfg: &ServerConfig, tracker: Tracker<SqliteStore>) -> anyhow::Result<()> {
  let app = Router::new().nest("/api", rankwatch_api::api_router(tracker));
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Records are processed independently; one bad record does not stop the
/// batch, but any failure makes the command exit non-zero.
async fn ingest(file: &Path, tracker: &Tracker<SqliteStore>) -> anyhow::Result<()> {
  let raw = tokio::fs::read_to_string(file)
    .await
    .with_context(|| format!("failed to read {file:?}"))?;
  let records: Vec<ScrapeRecord> = serde_json::from_str(&raw)
    .with_context(|| format!("failed to parse scrape records in {file:?}"))?;

  let mut failed = 0usize;
  for (index, record) in records.iter().enumerate() {
    if let Err(e) = tracker.ingest(record.target, record.metrics.clone()).await {
      failed += 1;
      tracing::warn!(index, target = ?record.target, error = %e, "skipped observation");
    }
  }

  tracing::info!(
    total = records.len(),
    recorded = records.len() - failed,
    failed,
    "ingest finished"
  );
  anyhow::ensure!(failed == 0, "{failed} of {} observations failed", records.len());
  Ok(())
}
