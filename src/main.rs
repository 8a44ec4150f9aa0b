mod bencode;
mod cache;
mod config;
mod context;
mod error;
mod feed;
mod identity;
mod refresh;
mod server;
mod snapshot;
mod tracker;
mod upstream;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Settings};
use crate::context::Context;
use crate::refresh::Refresher;

const DEFAULT_LOG_FILTER: &str = "feedmirror=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "feedmirror")]
#[command(about = "Mirror an RSS feed with tracker-patched torrent files")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./feedmirror.yaml, then $XDG_CONFIG_HOME/feedmirror/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// URL of the upstream RSS feed
  #[arg(long = "rss", env = "REMOTE_RSS")]
  remote_rss: Option<String>,

  /// Tracker id to substitute into announce URLs
  #[arg(long = "tracker", env = "TRACKER_ID")]
  tracker_id: Option<String>,

  /// `uid` session cookie
  #[arg(long = "uid", env = "COOKIE_UID")]
  cookie_uid: Option<String>,

  /// `usess` session cookie
  #[arg(long = "usess", env = "COOKIE_USESS", hide_env_values = true)]
  cookie_usess: Option<String>,

  /// Qualities to ignore, comma separated (e.g. "SD,MP4")
  #[arg(long = "ignore-quality", env = "IGNORE_QUALITY", value_delimiter = ',')]
  ignore_quality: Option<Vec<String>>,

  /// Port for the HTTP server [default: 80]
  #[arg(long, env = "PORT")]
  port: Option<u16>,

  /// Public base URL for republished links (e.g. http://your_domain.com:8080)
  #[arg(long = "base-url", env = "BASE_URL")]
  base_url: Option<String>,

  /// Cache directory [default: cache]
  #[arg(long = "cache-dir", env = "CACHE_DIR")]
  cache_dir: Option<PathBuf>,

  /// Torrent downloads in flight per refresh [default: 4]
  #[arg(long, env = "FETCH_CONCURRENCY")]
  concurrency: Option<usize>,

  /// Write logs to this file instead of stderr
  #[arg(long = "log-file", env = "LOG_FILE")]
  log_file: Option<PathBuf>,
}

impl Args {
  fn settings(&self) -> Settings {
    Settings {
      remote_rss: self.remote_rss.clone(),
      tracker_id: self.tracker_id.clone(),
      cookie_uid: self.cookie_uid.clone(),
      cookie_usess: self.cookie_usess.clone(),
      ignore_quality: self.ignore_quality.clone(),
      port: self.port,
      base_url: self.base_url.clone(),
      cache_dir: self.cache_dir.clone(),
      concurrency: self.concurrency,
    }
  }
}

/// Install the global subscriber. Keep the returned guard alive to flush file logs.
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

  match log_file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
      let name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;

      let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
      Ok(None)
    }
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging(args.log_file.as_deref())?;

  // Load configuration
  let config = Config::load(args.config.as_deref(), args.settings())?;

  let ctx = Arc::new(Context::new(config).await?);

  let refresher = Arc::new(Refresher::new(Arc::clone(&ctx)));
  let refresh_task = tokio::spawn(refresher.run());

  let addr = SocketAddr::from(([0, 0, 0, 0], ctx.config.port));
  let listener = TcpListener::bind(addr)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", addr, e))?;
  info!(%addr, feed = %format!("{}/rss", ctx.config.base_url), "server started");

  axum::serve(listener, server::router(Arc::clone(&ctx)))
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  refresh_task.abort();
  Ok(())
}
