//! Fetch-patch-persist cache of torrent files, keyed by item identity.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::fs;
use tracing::{debug, info};

use super::paths::Layout;
use super::store;
use crate::error::CacheError;
use crate::identity::Identity;
use crate::tracker::{looks_like_torrent, TrackerRewriter};
use crate::upstream::UpstreamClient;

/// Where a cached file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Already on disk, nothing fetched
  Existing,
  /// Downloaded and patched by this call
  Fetched,
}

/// A patched torrent present on disk.
#[derive(Debug, Clone)]
pub struct CachedFile {
  pub path: PathBuf,
  pub source: CacheSource,
}

/// Cache of patched torrent files.
///
/// A file's existence is the only record that an identity is cached: files are
/// written once and never modified or removed afterwards. Work on one identity
/// is serialized, so concurrent callers never fetch the same torrent twice.
pub struct ItemCache {
  layout: Layout,
  client: UpstreamClient,
  rewriter: TrackerRewriter,
  in_flight: Mutex<HashMap<Identity, Arc<tokio::sync::Mutex<()>>>>,
}

impl ItemCache {
  pub fn new(layout: Layout, client: UpstreamClient, rewriter: TrackerRewriter) -> Self {
    Self {
      layout,
      client,
      rewriter,
      in_flight: Mutex::new(HashMap::new()),
    }
  }

  /// Make sure the patched torrent for `identity` is on disk, downloading it
  /// from `source_link` if it is not. Nothing is written on failure.
  pub async fn ensure(
    &self,
    identity: &Identity,
    source_link: &str,
  ) -> Result<CachedFile, CacheError> {
    let lock = self.lock_for(identity);
    let result = {
      let _guard = lock.lock().await;
      self.ensure_locked(identity, source_link).await
    };
    drop(lock);
    self.release(identity);
    result
  }

  async fn ensure_locked(
    &self,
    identity: &Identity,
    source_link: &str,
  ) -> Result<CachedFile, CacheError> {
    let path = self.layout.torrent_path(identity);
    let storage_error = |source| CacheError::Storage {
      path: path.clone(),
      source,
    };

    if fs::try_exists(&path).await.map_err(storage_error)? {
      debug!(%identity, "torrent already cached");
      return Ok(CachedFile {
        path,
        source: CacheSource::Existing,
      });
    }

    info!(%identity, link = source_link, "downloading torrent");
    let payload = self.client.get_bytes(source_link).await?;

    if !looks_like_torrent(&payload) {
      return Err(CacheError::Format {
        identity: identity.to_string(),
      });
    }

    let patched = self
      .rewriter
      .rewrite_torrent(&payload)
      .map_err(|source| CacheError::Patch {
        identity: identity.to_string(),
        source,
      })?;

    store::write_atomic(&path, &patched)
      .await
      .map_err(storage_error)?;

    Ok(CachedFile {
      path,
      source: CacheSource::Fetched,
    })
  }

  fn lock_for(&self, identity: &Identity) -> Arc<tokio::sync::Mutex<()>> {
    let mut in_flight = self
      .in_flight
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(in_flight.entry(identity.clone()).or_default())
  }

  /// Forget the lock for `identity` once nobody else holds or waits on it.
  fn release(&self, identity: &Identity) {
    let mut in_flight = self
      .in_flight
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    if in_flight
      .get(identity)
      .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
      in_flight.remove(identity);
    }
  }
}
