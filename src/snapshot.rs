//! The published feed: the only feed document ever served.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::cache::store;

/// A published feed document.
#[derive(Debug)]
pub struct Snapshot {
  pub body: Bytes,
  pub published_at: DateTime<Utc>,
}

/// Holds the current snapshot in memory and mirrors it to disk.
///
/// Replacement happens under the write lock, so a reader sees either the old
/// snapshot or the new one in full.
pub struct SnapshotStore {
  path: PathBuf,
  current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
  /// Open the store, picking up a snapshot persisted by an earlier run.
  pub async fn load(path: PathBuf) -> std::io::Result<Self> {
    let current = match store::read_if_exists(&path).await? {
      Some(body) => {
        let published_at = tokio::fs::metadata(&path)
          .await?
          .modified()
          .map(DateTime::<Utc>::from)
          .unwrap_or_else(|_| Utc::now());
        Some(Arc::new(Snapshot {
          body: Bytes::from(body),
          published_at,
        }))
      }
      None => None,
    };

    Ok(Self {
      path,
      current: RwLock::new(current),
    })
  }

  pub async fn current(&self) -> Option<Arc<Snapshot>> {
    self.current.read().await.clone()
  }

  /// Persist `body` and make it the current snapshot. On error the previous
  /// snapshot stays in place, both in memory and on disk.
  pub async fn publish(&self, body: Vec<u8>) -> std::io::Result<Arc<Snapshot>> {
    let mut current = self.current.write().await;
    store::write_atomic(&self.path, &body).await?;

    let snapshot = Arc::new(Snapshot {
      body: Bytes::from(body),
      published_at: Utc::now(),
    });
    *current = Some(Arc::clone(&snapshot));
    Ok(snapshot)
  }

  pub fn path(&self) -> &PathBuf {
    &self.path
  }
}
