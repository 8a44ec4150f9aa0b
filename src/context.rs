//! Service context, built once at startup and shared by the refresh task and
//! the HTTP handlers.

use color_eyre::{eyre::eyre, Result};

use crate::cache::{ItemCache, Layout};
use crate::config::Config;
use crate::snapshot::SnapshotStore;
use crate::tracker::TrackerRewriter;
use crate::upstream::UpstreamClient;

pub struct Context {
  pub config: Config,
  pub layout: Layout,
  pub client: UpstreamClient,
  pub cache: ItemCache,
  pub snapshot: SnapshotStore,
}

impl Context {
  pub async fn new(config: Config) -> Result<Self> {
    let layout = Layout::new(&config.cache_dir);
    layout.ensure_dirs().map_err(|e| {
      eyre!(
        "Failed to create cache directory {}: {}",
        layout.root().display(),
        e
      )
    })?;

    let client = UpstreamClient::new(&config.credentials)?;
    let cache = ItemCache::new(
      layout.clone(),
      client.clone(),
      TrackerRewriter::new(&config.tracker_id),
    );

    let snapshot_path = layout.published_feed_path();
    let snapshot = SnapshotStore::load(snapshot_path.clone())
      .await
      .map_err(|e| eyre!("Failed to load {}: {}", snapshot_path.display(), e))?;

    Ok(Self {
      config,
      layout,
      client,
      cache,
      snapshot,
    })
  }
}
