// Atomic file writes for cache entries and feed snapshots.
// Readers either see the previous file or the complete new one, never a partial write.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Write `data` to `path` via a temporary sibling file and a rename.
pub async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).await?;
  }

  let temp_path = temp_path_for(path);
  let result = async {
    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    fs::rename(&temp_path, path).await
  }
  .await;

  if result.is_err() {
    let _ = fs::remove_file(&temp_path).await;
  }
  result
}

/// Read a file, mapping "not found" to `None`.
pub async fn read_if_exists(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
  match fs::read(path).await {
    Ok(data) => Ok(Some(data)),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e),
  }
}

fn temp_path_for(path: &Path) -> PathBuf {
  let mut name = path.file_name().unwrap_or_default().to_os_string();
  name.push(".tmp");
  path.with_file_name(name)
}
