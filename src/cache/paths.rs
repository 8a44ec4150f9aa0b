// On-disk layout of the cache directory:
//
//   <root>/rss_original.xml          last feed fetched from upstream
//   <root>/rss.xml                   last published feed
//   <root>/torrents/<id>.torrent     patched torrent files

use std::path::{Path, PathBuf};

use crate::identity::Identity;

#[derive(Debug, Clone)]
pub struct Layout {
  root: PathBuf,
}

impl Layout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Path to the raw upstream feed snapshot.
  pub fn original_feed_path(&self) -> PathBuf {
    self.root.join("rss_original.xml")
  }

  /// Path to the published feed snapshot.
  pub fn published_feed_path(&self) -> PathBuf {
    self.root.join("rss.xml")
  }

  pub fn torrents_dir(&self) -> PathBuf {
    self.root.join("torrents")
  }

  /// Path to the cached torrent for an identity.
  pub fn torrent_path(&self, identity: &Identity) -> PathBuf {
    self.torrents_dir().join(identity.file_name())
  }

  /// Path for a file name requested over HTTP. Only `<identity>.torrent`
  /// names map to a path.
  pub fn served_torrent_path(&self, name: &str) -> Option<PathBuf> {
    let identity = name.strip_suffix(".torrent").and_then(Identity::parse)?;
    Some(self.torrent_path(&identity))
  }

  /// Create the cache and torrent directories.
  pub fn ensure_dirs(&self) -> std::io::Result<()> {
    std::fs::create_dir_all(self.torrents_dir())
  }
}
